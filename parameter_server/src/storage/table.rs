use std::{
    hash::{DefaultHasher, Hasher},
    num::NonZeroUsize,
};

use rayon::prelude::*;

use super::{Key, ParameterShard, Record};

/// The authoritative key to parameter mapping of a server, partitioned in shards.
///
/// Keys are placed by a deterministic hash so that every process agrees on a key's shard and
/// only operations on the same shard contend for the same lock.
#[derive(Debug)]
pub struct ParameterTable<K, P> {
    shards: Box<[ParameterShard<K, P>]>,
}

impl<K: Key, P> ParameterTable<K, P> {
    /// Creates a new empty `ParameterTable`.
    ///
    /// # Arguments
    /// * `shards` - The amount of partitions of the key space.
    ///
    /// # Returns
    /// A new `ParameterTable` instance.
    pub fn new(shards: NonZeroUsize) -> Self {
        Self {
            shards: (0..shards.get()).map(|_| ParameterShard::new()).collect(),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// The index of the shard owning `key`.
    pub fn shard_of(&self, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    fn shard(&self, key: &K) -> &ParameterShard<K, P> {
        &self.shards[self.shard_of(key)]
    }

    /// Reads the parameter of `key`, materializing `init()` if it was never seen.
    pub fn get_or_init<R, I, F>(&self, key: &K, init: I, read: F) -> R
    where
        I: FnOnce() -> P,
        F: FnOnce(&P) -> R,
    {
        self.shard(key).get_or_init(key, init, read)
    }

    /// Atomically applies `f` to the parameter of `key`, materializing `init()` if needed.
    pub fn update<R, I, F>(&self, key: &K, init: I, f: F) -> R
    where
        I: FnOnce() -> P,
        F: FnOnce(&mut P) -> R,
    {
        self.shard(key).update(key, init, f)
    }

    /// Overwrites the parameter of `key`, used when restoring checkpoints.
    pub fn insert(&self, key: K, param: P) {
        self.shard(&key).insert(key, param);
    }

    /// A copy of the parameter of `key`, `None` if it was never materialized.
    pub fn get(&self, key: &K) -> Option<P>
    where
        P: Clone,
    {
        self.shard(key).get(key)
    }

    /// The amount of materialized keys across all shards.
    pub fn len(&self) -> usize {
        self.shards.iter().map(ParameterShard::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends the text export of shard `idx` to `out`.
    ///
    /// # Panics
    /// If `idx` is not below `shard_count()`.
    pub fn export_shard(&self, idx: usize, out: &mut String)
    where
        P: Record,
    {
        self.shards[idx].export(out);
    }
}

impl<K, P> ParameterTable<K, P>
where
    K: Key,
    P: Record + Send + Sync,
{
    /// Renders every shard in parallel, returned in shard index order.
    ///
    /// Each shard is read locked only while its own export is rendered, the table keeps
    /// accepting updates on every other shard meanwhile.
    pub fn export_all(&self) -> Vec<String> {
        self.shards
            .par_iter()
            .map(|shard| {
                let mut out = String::new();
                shard.export(&mut out);
                out
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    fn table(shards: usize) -> ParameterTable<u64, f32> {
        ParameterTable::new(NonZeroUsize::new(shards).unwrap())
    }

    #[test]
    fn test_key_has_a_single_shard() {
        let table = table(7);

        for key in 0..1000 {
            let shard = table.shard_of(&key);
            assert!(shard < 7);
            assert_eq!(table.shard_of(&key), shard);
        }
    }

    #[test]
    fn test_keys_spread_over_shards() {
        let table = table(4);

        for key in 0..400u64 {
            table.update(&key, || 0.0, |p| *p = key as f32);
        }

        let exports = table.export_all();
        assert_eq!(exports.len(), 4);
        assert!(exports.iter().all(|shard| !shard.is_empty()));
        assert_eq!(exports.iter().map(|s| s.lines().count()).sum::<usize>(), 400);
        assert_eq!(table.len(), 400);
    }

    #[test]
    fn test_export_shard_matches_export_all() {
        let table = table(3);
        (0..30u64).for_each(|key| table.insert(key, key as f32 * 0.5));

        let all = table.export_all();
        for (idx, expected) in all.iter().enumerate() {
            let mut out = String::new();
            table.export_shard(idx, &mut out);
            assert_eq!(&out, expected);
        }
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        const THREADS: usize = 8;
        const UPDATES: usize = 1000;

        let table = Arc::new(table(2));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let table = Arc::clone(&table);
                thread::spawn(move || {
                    for _ in 0..UPDATES {
                        table.update(&42, || 0.0, |p| *p += 1.0);
                    }
                })
            })
            .collect();

        handles.into_iter().for_each(|h| h.join().unwrap());
        assert_eq!(table.get(&42), Some((THREADS * UPDATES) as f32));
    }
}
