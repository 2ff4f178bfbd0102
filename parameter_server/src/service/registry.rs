use std::collections::HashMap;

use comms::msg::{MessageClass, Request, Response};
use log::debug;

use super::{HandlerErr, Result};

/// Serves every request of one message class.
///
/// Handlers run synchronously and may be called concurrently from several connections.
pub trait Handler: Send + Sync {
    fn handle(&self, req: Request) -> Result<Response>;
}

impl<F> Handler for F
where
    F: Fn(Request) -> Result<Response> + Send + Sync,
{
    fn handle(&self, req: Request) -> Result<Response> {
        self(req)
    }
}

/// Maps message classes to their handlers, built once before serving.
#[derive(Default)]
pub struct Registry {
    handlers: HashMap<MessageClass, Box<dyn Handler>>,
}

impl Registry {
    /// Creates a new empty `Registry`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to `class`, replacing any previous binding.
    pub fn add<H: Handler + 'static>(&mut self, class: MessageClass, handler: H) -> &mut Self {
        debug!(class:? = class; "registered handler");
        self.handlers.insert(class, Box::new(handler));
        self
    }

    /// Whether a handler is bound to `class`.
    pub fn serves(&self, class: MessageClass) -> bool {
        self.handlers.contains_key(&class)
    }

    /// Routes `req` to the handler of its class.
    pub fn dispatch(&self, req: Request) -> Result<Response> {
        match self.handlers.get(&req.class) {
            Some(handler) => handler.handle(req),
            None => Err(HandlerErr::Unregistered(req.class)),
        }
    }
}

#[cfg(test)]
mod tests {
    use comms::Container;

    use super::*;

    #[test]
    fn test_dispatch_by_class() {
        let mut registry = Registry::new();
        registry.add(MessageClass::WorkerPullRequest, |req: Request| -> Result<Response> {
            let mut rsp = req.response();
            rsp.payload.push(&req.sender);
            Ok(rsp)
        });

        let mut req = Request::new(MessageClass::WorkerPullRequest, 5, Container::new());
        req.id = 11;

        let mut rsp = registry.dispatch(req).unwrap();
        assert_eq!(rsp.id, 11);
        assert_eq!(rsp.payload.read::<u32>().unwrap(), 5);
    }

    #[test]
    fn test_unregistered_class() {
        let registry = Registry::new();
        let req = Request::new(MessageClass::WorkerFinishWork, 1, Container::new());

        assert!(matches!(
            registry.dispatch(req),
            Err(HandlerErr::Unregistered(MessageClass::WorkerFinishWork))
        ));
        assert!(!registry.serves(MessageClass::WorkerFinishWork));
    }
}
