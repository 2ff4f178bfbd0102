use std::{collections::HashSet, sync::Arc};

use comms::msg::{NodeId, Request, Response};
use log::{debug, info};
use tokio::sync::watch;

use super::{Handler, Result};

/// Counts the distinct workers that completed the termination handshake.
pub struct FinishTracker {
    expected: usize,
    finished: watch::Sender<HashSet<NodeId>>,
}

impl FinishTracker {
    /// Creates a new `FinishTracker` waiting for `expected` workers.
    pub fn new(expected: usize) -> Self {
        let (finished, _) = watch::channel(HashSet::new());
        Self { expected, finished }
    }

    /// Records `worker` as finished.
    ///
    /// # Returns
    /// `false` if `worker` had already finished.
    pub fn finish(&self, worker: NodeId) -> bool {
        self.finished.send_if_modified(|set| set.insert(worker))
    }

    /// The amount of distinct workers that finished so far.
    pub fn finished(&self) -> usize {
        self.finished.borrow().len()
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Resolves once every expected worker has finished.
    pub async fn wait_all(&self) {
        let mut rx = self.finished.subscribe();
        // The sender lives in `self`, the wait can't fail.
        let _ = rx.wait_for(|set| set.len() >= self.expected).await;
    }
}

/// Acknowledges `WorkerFinishWork` requests on the coordinator.
pub struct FinishHandler {
    tracker: Arc<FinishTracker>,
}

impl FinishHandler {
    pub fn new(tracker: Arc<FinishTracker>) -> Self {
        Self { tracker }
    }
}

impl Handler for FinishHandler {
    fn handle(&self, mut req: Request) -> Result<Response> {
        req.payload.read_sentinel()?;

        if self.tracker.finish(req.sender) {
            info!(
                worker = req.sender,
                finished = self.tracker.finished(),
                expected = self.tracker.expected();
                "worker finished"
            );
        } else {
            debug!(worker = req.sender; "repeated finish request");
        }

        Ok(req.response())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use comms::{
        Container,
        msg::{ACK_SENTINEL, MessageClass},
    };

    use super::*;
    use crate::service::HandlerErr;

    fn finish_req(sender: NodeId, marker: i32) -> Request {
        let mut payload = Container::new();
        payload.push(&marker);
        Request::new(MessageClass::WorkerFinishWork, sender, payload)
    }

    #[test]
    fn test_finish_is_idempotent_per_worker() {
        let tracker = Arc::new(FinishTracker::new(2));
        let handler = FinishHandler::new(Arc::clone(&tracker));

        let rsp = handler.handle(finish_req(4, ACK_SENTINEL)).unwrap();
        assert!(rsp.payload.is_empty());

        handler.handle(finish_req(4, ACK_SENTINEL)).unwrap();
        assert_eq!(tracker.finished(), 1);
    }

    #[test]
    fn test_wrong_marker_is_rejected() {
        let tracker = Arc::new(FinishTracker::new(1));
        let handler = FinishHandler::new(Arc::clone(&tracker));

        let err = handler.handle(finish_req(1, 4321)).unwrap_err();
        assert!(matches!(err, HandlerErr::Decode(_)));
        assert_eq!(tracker.finished(), 0);
    }

    #[tokio::test]
    async fn test_wait_all_resolves_on_last_worker() {
        let tracker = Arc::new(FinishTracker::new(2));

        let waiter = tokio::spawn({
            let tracker = Arc::clone(&tracker);
            async move { tracker.wait_all().await }
        });

        tracker.finish(1);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        tracker.finish(2);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
