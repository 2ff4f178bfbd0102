use std::sync::Arc;

use comms::{
    Container, Field,
    msg::{MessageClass, NodeId, Request, Response},
};
use log::debug;

use crate::{
    error::{Result, WorkerErr},
    sync::Rendezvous,
    transport::Transport,
};

/// Blocking pull and push calls over a `Transport`, keys spread over the servers.
///
/// Key `k` lives on server `k % servers`. A batch is split into one request per server, every
/// request is sent before any response is awaited.
pub struct ParamClient<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> ParamClient<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// The server owning `key`.
    pub fn server_of(&self, key: u64) -> NodeId {
        (key % self.transport.servers().max(1) as u64) as NodeId
    }

    /// Fetches the current value of every key in `keys`.
    ///
    /// # Returns
    /// The values in the order of `keys`.
    pub fn pull<V: Field + Default>(&self, keys: &[u64]) -> Result<Vec<V>> {
        let groups = self.group(keys.iter().copied().enumerate());

        let calls = self.call_all(MessageClass::WorkerPullRequest, &groups, |payload, _| {
            payload.push(&V::default());
        });

        let mut values: Vec<Option<V>> = keys.iter().map(|_| None).collect();

        for ((_, items), call) in groups.iter().zip(calls) {
            let mut rsp = call.wait()?;
            let pairs = rsp.payload.read_pairs::<u64, V>()?;

            if pairs.len() != items.len() {
                return Err(WorkerErr::Remote(format!(
                    "pull answered {} of {} keys",
                    pairs.len(),
                    items.len()
                )));
            }

            for (&(idx, key), (got, value)) in items.iter().zip(pairs) {
                if got != key {
                    return Err(WorkerErr::Remote(format!(
                        "pull answered key {got} where {key} was requested"
                    )));
                }
                values[idx] = Some(value);
            }
        }

        Ok(values.into_iter().flatten().collect())
    }

    /// Applies every `(key, grad)` of `items` on the servers.
    pub fn push<G: Field>(&self, items: &[(u64, G)]) -> Result<()> {
        let groups = self.group(items.iter().map(|(key, _)| *key).enumerate());

        let calls = self.call_all(MessageClass::WorkerPushRequest, &groups, |payload, idx| {
            payload.push(&items[idx].1);
        });

        for call in calls {
            call.wait()?.payload.read_sentinel()?;
        }

        Ok(())
    }

    /// Splits `(position, key)` pairs by owning server, keeping their relative order.
    fn group(&self, keys: impl Iterator<Item = (usize, u64)>) -> Vec<(NodeId, Vec<(usize, u64)>)> {
        let mut groups: Vec<(NodeId, Vec<(usize, u64)>)> = Vec::new();

        for (idx, key) in keys {
            let server = self.server_of(key);
            match groups.iter_mut().find(|(s, _)| *s == server) {
                Some((_, items)) => items.push((idx, key)),
                None => groups.push((server, vec![(idx, key)])),
            }
        }

        groups
    }

    /// Sends one request per group, `value` appends the field that follows each key.
    fn call_all<F>(
        &self,
        class: MessageClass,
        groups: &[(NodeId, Vec<(usize, u64)>)],
        mut value: F,
    ) -> Vec<Arc<Rendezvous<Response>>>
    where
        F: FnMut(&mut Container, usize),
    {
        groups
            .iter()
            .map(|(server, items)| {
                let mut payload = Container::new();
                for &(idx, key) in items {
                    payload.push(&key);
                    value(&mut payload, idx);
                }

                debug!(server = *server, keys = items.len(), class:? = class; "sending batch");

                let req = Request::new(class, self.transport.node_id(), payload);
                let rendezvous = Arc::new(Rendezvous::new());
                let completion = Arc::clone(&rendezvous);

                self.transport.send(
                    req,
                    *server,
                    Box::new(move |rsp| completion.complete(rsp)),
                );

                rendezvous
            })
            .collect()
    }
}
