use std::{
    marker::PhantomData,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use comms::{
    Field,
    msg::{ACK_SENTINEL, Request, Response},
};
use log::debug;

use super::{Handler, HandlerErr, Result};
use crate::{
    access::PushStrategy,
    checkpoint::{CheckpointSink, should_checkpoint},
    storage::Key,
};

/// Applies `WorkerPushRequest`s and triggers the periodic checkpoints.
pub struct PushHandler<K, S> {
    access: S,
    counter: Arc<AtomicU64>,
    checkpoint: Option<Arc<dyn CheckpointSink>>,
    _key: PhantomData<fn() -> K>,
}

impl<K, S> PushHandler<K, S> {
    /// Creates a new `PushHandler`.
    ///
    /// # Arguments
    /// * `access` - The read-modify-write side of the access strategy.
    /// * `counter` - The push counter, shared with whoever reports it.
    /// * `checkpoint` - Where triggered checkpoints go, `None` never checkpoints.
    pub fn new(
        access: S,
        counter: Arc<AtomicU64>,
        checkpoint: Option<Arc<dyn CheckpointSink>>,
    ) -> Self {
        Self {
            access,
            counter,
            checkpoint,
            _key: PhantomData,
        }
    }
}

impl<K, S> Handler for PushHandler<K, S>
where
    K: Key,
    S: PushStrategy<K>,
    S::Grad: Field,
{
    fn handle(&self, mut req: Request) -> Result<Response> {
        let items = req.payload.read_pairs::<K, S::Grad>()?;

        for (index, (_, grad)) in items.iter().enumerate() {
            self.access
                .check_grad(grad)
                .map_err(|source| HandlerErr::SizeMismatch { index, source })?;
        }

        for (key, grad) in &items {
            self.access.apply_push_value(key, grad);
        }

        let counter = self.counter.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(sender = req.sender, items = items.len(), counter = counter; "push applied");

        if let Some(sink) = &self.checkpoint {
            if should_checkpoint(counter, sink.period()) {
                sink.checkpoint(counter);
            }
        }

        let mut rsp = req.response();
        rsp.payload.push(&ACK_SENTINEL);
        Ok(rsp)
    }
}
