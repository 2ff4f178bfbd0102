use std::{sync::Arc, thread, time::Duration};

use comms::{
    Container,
    msg::{ACK_SENTINEL, COORDINATOR, MessageClass, Request},
};
use log::{info, warn};

use crate::{
    error::{Result, WorkerErr},
    sync::Rendezvous,
    transport::Transport,
};

/// Where a worker stands in the termination handshake.
#[derive(Debug, Clone)]
pub enum HandshakeState {
    Idle,
    /// The finish request is out, the coordinator's ack hasn't arrived yet.
    AwaitingAck(Arc<Rendezvous<()>>),
    Done,
}

/// Runs the worker side of the termination handshake with the coordinator.
///
/// The handshake is `Idle -> AwaitingAck -> Done` and happens at most once per worker.
pub struct Terminator<T: Transport> {
    transport: Arc<T>,
    state: HandshakeState,
    grace: Duration,
    timeout: Option<Duration>,
}

impl<T: Transport> Terminator<T> {
    /// Creates a new `Terminator`.
    ///
    /// # Arguments
    /// * `transport` - The transport the finish request is sent through.
    /// * `grace` - Delay before the finish request is sent, lets in-flight pushes drain.
    /// * `timeout` - Bounds the wait for the ack, waits forever when `None`.
    pub fn new(transport: Arc<T>, grace: Duration, timeout: Option<Duration>) -> Self {
        Self {
            transport,
            state: HandshakeState::Idle,
            grace,
            timeout,
        }
    }

    pub fn state(&self) -> &HandshakeState {
        &self.state
    }

    /// Tells the coordinator this worker finished and blocks until it acknowledges.
    ///
    /// After a `HandshakeTimeout` the request stays outstanding, calling `finish` again resumes
    /// the wait without sending a second request. If the transport reports a failure instead of
    /// an ack the handshake goes back to `Idle` and may be retried.
    ///
    /// # Returns
    /// `AlreadyFinished` if the handshake was completed before.
    pub fn finish(&mut self) -> Result<()> {
        let rendezvous = match &self.state {
            HandshakeState::Done => return Err(WorkerErr::AlreadyFinished),
            HandshakeState::AwaitingAck(rendezvous) => Arc::clone(rendezvous),
            HandshakeState::Idle => {
                let rendezvous = self.send_finish();
                self.state = HandshakeState::AwaitingAck(Arc::clone(&rendezvous));
                rendezvous
            }
        };

        let outcome = match self.timeout {
            Some(timeout) => rendezvous
                .wait_for(timeout)
                .ok_or(WorkerErr::HandshakeTimeout(timeout))?,
            None => rendezvous.wait(),
        };

        match outcome {
            Ok(()) => {
                self.state = HandshakeState::Done;

                let node_id = self.transport.node_id();
                info!(worker = node_id; "finish acknowledged by the coordinator");
                warn!("==============================");
                warn!(worker = node_id; "Worker terminate normally");
                warn!("==============================");
                Ok(())
            }
            Err(e) => {
                self.state = HandshakeState::Idle;
                Err(e)
            }
        }
    }

    fn send_finish(&self) -> Arc<Rendezvous<()>> {
        if !self.grace.is_zero() {
            thread::sleep(self.grace);
        }

        let node_id = self.transport.node_id();
        info!(worker = node_id; "sending finish to the coordinator");

        let mut payload = Container::new();
        payload.push(&ACK_SENTINEL);
        let req = Request::new(MessageClass::WorkerFinishWork, node_id, payload);

        let rendezvous = Arc::new(Rendezvous::new());
        let completion = Arc::clone(&rendezvous);

        self.transport.send(
            req,
            COORDINATOR,
            Box::new(move |rsp| completion.complete(rsp.map(drop))),
        );

        rendezvous
    }
}
