use std::collections::HashMap;

use parking_lot::RwLock;

use super::{Key, Record};

/// One partition of the parameter table.
///
/// Every access to a key goes through the shard's lock, which is what makes a read-modify-write
/// of a single key atomic with respect to any other access of the same key.
#[derive(Debug)]
pub struct ParameterShard<K, P> {
    params: RwLock<HashMap<K, P>>,
}

impl<K: Key, P> ParameterShard<K, P> {
    /// Creates a new empty `ParameterShard`.
    pub fn new() -> Self {
        Self {
            params: RwLock::new(HashMap::new()),
        }
    }

    /// Reads the parameter stored for `key`, materializing `init()` first if it's missing.
    ///
    /// # Arguments
    /// * `key` - The parameter's key.
    /// * `init` - Produces the default parameter for an unseen key.
    /// * `read` - Projects the stored parameter into the returned value.
    pub fn get_or_init<R, I, F>(&self, key: &K, init: I, read: F) -> R
    where
        I: FnOnce() -> P,
        F: FnOnce(&P) -> R,
    {
        if let Some(param) = self.params.read().get(key) {
            return read(param);
        }

        let mut params = self.params.write();
        let param = params.entry(key.clone()).or_insert_with(init);
        read(param)
    }

    /// Applies `f` to the parameter stored for `key` under the write lock.
    ///
    /// # Arguments
    /// * `key` - The parameter's key.
    /// * `init` - Produces the default parameter for an unseen key.
    /// * `f` - The read-modify-write operation.
    pub fn update<R, I, F>(&self, key: &K, init: I, f: F) -> R
    where
        I: FnOnce() -> P,
        F: FnOnce(&mut P) -> R,
    {
        let mut params = self.params.write();

        match params.get_mut(key) {
            Some(param) => f(param),
            None => f(params.entry(key.clone()).or_insert_with(init)),
        }
    }

    /// Overwrites the parameter stored for `key`.
    pub fn insert(&self, key: K, param: P) {
        self.params.write().insert(key, param);
    }

    /// Returns a copy of the parameter stored for `key`, without materializing it.
    pub fn get(&self, key: &K) -> Option<P>
    where
        P: Clone,
    {
        self.params.read().get(key).cloned()
    }

    /// The amount of keys held by this shard.
    pub fn len(&self) -> usize {
        self.params.read().len()
    }

    /// Renders every `key<TAB>param` line of this shard into `out`, keys in ascending order.
    ///
    /// The shard is only read locked while rendering.
    pub fn export(&self, out: &mut String)
    where
        P: Record,
    {
        let params = self.params.read();

        let mut entries: Vec<_> = params.iter().collect();
        entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

        for (key, param) in entries {
            key.write_record(out);
            out.push('\t');
            param.write_record(out);
            out.push('\n');
        }
    }
}

impl<K: Key, P> Default for ParameterShard<K, P> {
    fn default() -> Self {
        Self::new()
    }
}
