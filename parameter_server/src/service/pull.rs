use std::marker::PhantomData;

use comms::{
    Field,
    msg::{Request, Response},
};

use super::{Handler, Result};
use crate::{access::PullStrategy, storage::Key};

/// Answers `WorkerPullRequest`s with the authoritative value of every requested key.
pub struct PullHandler<K, S> {
    access: S,
    _key: PhantomData<fn() -> K>,
}

impl<K, S> PullHandler<K, S> {
    /// Creates a new `PullHandler`.
    ///
    /// # Arguments
    /// * `access` - The read side of the access strategy.
    pub fn new(access: S) -> Self {
        Self {
            access,
            _key: PhantomData,
        }
    }
}

impl<K, S> Handler for PullHandler<K, S>
where
    K: Key,
    S: PullStrategy<K>,
    S::Value: Field,
{
    fn handle(&self, mut req: Request) -> Result<Response> {
        // The whole batch is decoded before the table is touched, the values are placeholders.
        let pairs = req.payload.read_pairs::<K, S::Value>()?;
        let mut rsp = req.response();

        for (key, _) in pairs {
            let value = self.access.get_pull_value(&key);
            rsp.payload.push(&key).push(&value);
        }

        Ok(rsp)
    }
}
