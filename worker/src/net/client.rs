use std::{
    collections::HashMap,
    io,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use comms::{
    OnoReceiver, OnoSender,
    msg::{Msg, NodeId, Request},
};
use futures::future;
use log::{debug, warn};
use parking_lot::Mutex;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    sync::mpsc,
};

use crate::{
    error::WorkerErr,
    transport::{Callback, Transport},
};

/// Callbacks waiting for their response on one link.
#[derive(Default)]
struct Pending {
    closed: bool,
    callbacks: HashMap<u64, Callback>,
}

impl Pending {
    /// Marks the link as closed and fails every waiting callback.
    fn close(pending: &Mutex<Pending>) {
        let callbacks = {
            let mut pending = pending.lock();
            pending.closed = true;
            std::mem::take(&mut pending.callbacks)
        };

        for (_, callback) in callbacks {
            callback(Err(WorkerErr::Disconnected));
        }
    }
}

/// One connection to a server node.
struct Link {
    outbox: mpsc::UnboundedSender<Request>,
    pending: Arc<Mutex<Pending>>,
}

/// A `Transport` over framed tokio streams, one connection per server node.
///
/// Every link runs a writer task draining the outbox and a reader task completing the pending
/// callbacks by request id, so callers never block on the network.
pub struct RpcClient {
    node_id: NodeId,
    links: Vec<Link>,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Connects to every server, `addrs` indexed by server node id.
    ///
    /// # Arguments
    /// * `node_id` - This worker's id.
    /// * `addrs` - The server addresses.
    ///
    /// # Returns
    /// A connected client or the first connection failure.
    pub async fn connect(node_id: NodeId, addrs: &[SocketAddr]) -> io::Result<Self> {
        let streams = future::try_join_all(addrs.iter().map(TcpStream::connect)).await?;

        let channels = streams.into_iter().map(|stream| {
            let (rx, tx) = stream.into_split();
            comms::channel(rx, tx)
        });

        Ok(Self::from_channels(node_id, channels))
    }

    /// Builds a client over already established channels, spawning their tasks.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Arguments
    /// * `node_id` - This worker's id.
    /// * `channels` - One channel per server, indexed by server node id.
    pub fn from_channels<R, W, I>(node_id: NodeId, channels: I) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
        I: IntoIterator<Item = (OnoReceiver<R>, OnoSender<W>)>,
    {
        let links = channels
            .into_iter()
            .enumerate()
            .map(|(server, (rx, tx))| {
                let (outbox, inbox) = mpsc::unbounded_channel();
                let pending = Arc::new(Mutex::new(Pending::default()));

                tokio::spawn(write_loop(server, tx, inbox, Arc::clone(&pending)));
                tokio::spawn(read_loop(server, rx, Arc::clone(&pending)));

                Link { outbox, pending }
            })
            .collect();

        Self {
            node_id,
            links,
            next_id: AtomicU64::new(1),
        }
    }
}

impl Transport for RpcClient {
    fn node_id(&self) -> NodeId {
        self.node_id
    }

    fn servers(&self) -> usize {
        self.links.len()
    }

    fn send(&self, mut req: Request, dest: NodeId, callback: Callback) {
        let Some(link) = self.links.get(dest as usize) else {
            callback(Err(WorkerErr::UnknownNode(dest)));
            return;
        };

        req.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        req.sender = self.node_id;

        {
            let mut pending = link.pending.lock();
            if pending.closed {
                drop(pending);
                callback(Err(WorkerErr::Disconnected));
                return;
            }

            pending.callbacks.insert(req.id, callback);
        }

        if let Err(mpsc::error::SendError(req)) = link.outbox.send(req) {
            let callback = link.pending.lock().callbacks.remove(&req.id);
            if let Some(callback) = callback {
                callback(Err(WorkerErr::Disconnected));
            }
        }
    }
}

async fn write_loop<W>(
    server: usize,
    mut tx: OnoSender<W>,
    mut inbox: mpsc::UnboundedReceiver<Request>,
    pending: Arc<Mutex<Pending>>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(req) = inbox.recv().await {
        if let Err(e) = tx.send(&Msg::Request(req)).await {
            warn!(server = server; "sending request failed: {e}");
            Pending::close(&pending);
            return;
        }
    }

    // Every sender handle is gone, let the server see a clean end of stream.
    if let Err(e) = tx.shutdown().await {
        debug!(server = server; "shutdown failed: {e}");
    }
}

async fn read_loop<R>(server: usize, mut rx: OnoReceiver<R>, pending: Arc<Mutex<Pending>>)
where
    R: AsyncRead + Unpin,
{
    let mut rx_buf = Vec::new();

    loop {
        let (id, outcome) = match rx.recv_into(&mut rx_buf).await {
            Ok(Msg::Response(rsp)) => (rsp.id, Ok(rsp)),
            Ok(Msg::Err { id, reason }) => (id, Err(WorkerErr::Remote(reason.into_owned()))),
            Ok(Msg::Request(req)) => {
                warn!(server = server; "unexpected request from server: {req:?}");
                continue;
            }
            Err(e) => {
                if comms::is_disconnect(&e) {
                    debug!(server = server; "server closed the connection");
                } else {
                    warn!(server = server; "receiving failed: {e}");
                }

                Pending::close(&pending);
                return;
            }
        };

        let callback = pending.lock().callbacks.remove(&id);
        match callback {
            Some(callback) => callback(outcome),
            None => warn!(server = server; "response to unknown request {id}"),
        }
    }
}
