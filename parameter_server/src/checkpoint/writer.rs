use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use comms::specs::server::CheckpointMode;
use log::{error, info};

use super::{CheckpointErr, Result};
use crate::{
    access::SizeMismatchErr,
    storage::{Key, ParameterTable, Record},
};

const PREFIX: &str = "param-";
const SUFFIX: &str = ".txt";

/// What a push handler hands a triggered checkpoint to.
pub trait CheckpointSink: Send + Sync {
    /// Pushes between checkpoints, `<= 0` disables them.
    fn period(&self) -> i64;

    /// Dumps the table for push counter `counter`.
    ///
    /// Failures are logged, never reported back to the push.
    fn checkpoint(&self, counter: u64);
}

/// Writes the whole parameter table to `{root}/param-{counter}.txt`.
pub struct Checkpointer<K, P> {
    table: Arc<ParameterTable<K, P>>,
    root: PathBuf,
    period: i64,
    mode: CheckpointMode,
}

impl<K, P> Checkpointer<K, P>
where
    K: Key,
    P: Record + Send + Sync + 'static,
{
    /// Creates a new `Checkpointer`.
    ///
    /// # Arguments
    /// * `table` - The table to dump.
    /// * `root` - The directory checkpoint files are written to.
    /// * `period` - Pushes between checkpoints, `<= 0` disables them.
    /// * `mode` - Whether triggered dumps run inline or in the background.
    ///
    /// # Returns
    /// A new `Checkpointer` instance.
    pub fn new(
        table: Arc<ParameterTable<K, P>>,
        root: impl Into<PathBuf>,
        period: i64,
        mode: CheckpointMode,
    ) -> Self {
        Self {
            table,
            root: root.into(),
            period,
            mode,
        }
    }

    /// The final path of the checkpoint for `counter`.
    pub fn path_for(&self, counter: u64) -> PathBuf {
        file_path(&self.root, counter)
    }

    /// Writes the checkpoint for `counter` and waits for it to be on disk.
    ///
    /// # Returns
    /// The path of the written file or the io failure.
    pub fn write(&self, counter: u64) -> Result<PathBuf> {
        dump(&self.table, &self.root, counter)
    }

    /// Loads every record of the checkpoint at `path` into `table`.
    ///
    /// Records overwrite whatever the table holds for their keys.
    ///
    /// # Returns
    /// The amount of loaded records.
    pub fn restore(path: &Path, table: &ParameterTable<K, P>) -> Result<usize> {
        Self::restore_checked(path, table, |_| Ok(()))
    }

    /// Like `restore`, but every record must also pass `check`.
    ///
    /// The whole file is parsed and checked before the first record is inserted, a rejected
    /// file leaves `table` untouched.
    ///
    /// # Arguments
    /// * `path` - The checkpoint file to load.
    /// * `table` - The table receiving the records.
    /// * `check` - Validates the shape of a restored parameter.
    ///
    /// # Returns
    /// The amount of loaded records.
    pub fn restore_checked<F>(
        path: &Path,
        table: &ParameterTable<K, P>,
        check: F,
    ) -> Result<usize>
    where
        F: Fn(&P) -> std::result::Result<(), SizeMismatchErr>,
    {
        let text = fs::read_to_string(path).map_err(CheckpointErr::io(path))?;
        let mut records = Vec::new();

        for (i, line) in text.lines().enumerate() {
            if line.is_empty() {
                continue;
            }

            let malformed = || CheckpointErr::Parse {
                path: path.to_path_buf(),
                line: i + 1,
            };

            let (key, param) = line.split_once('\t').ok_or_else(malformed)?;
            let key = K::parse_record(key).ok_or_else(malformed)?;
            let param = P::parse_record(param).ok_or_else(malformed)?;

            if let Err(e) = check(&param) {
                error!(path:? = path, line = i + 1; "restored parameter rejected: {e}");
                return Err(malformed());
            }

            records.push((key, param));
        }

        let loaded = records.len();
        for (key, param) in records {
            table.insert(key, param);
        }

        info!(path:? = path, records = loaded; "restored parameters from checkpoint");
        Ok(loaded)
    }
}

impl<K, P> CheckpointSink for Checkpointer<K, P>
where
    K: Key,
    P: Record + Send + Sync + 'static,
{
    fn period(&self) -> i64 {
        self.period
    }

    fn checkpoint(&self, counter: u64) {
        match self.mode {
            CheckpointMode::Sync => {
                if let Err(e) = self.write(counter) {
                    error!(counter = counter; "checkpoint failed: {e}");
                }
            }
            CheckpointMode::Background => {
                let table = Arc::clone(&self.table);
                let root = self.root.clone();

                rayon::spawn(move || {
                    if let Err(e) = dump(&table, &root, counter) {
                        error!(counter = counter; "background checkpoint failed: {e}");
                    }
                });
            }
        }
    }
}

/// Finds the checkpoint with the highest counter in `root`.
///
/// # Returns
/// The counter and path of that checkpoint, `None` if `root` holds none or doesn't exist.
pub fn latest(root: &Path) -> Result<Option<(u64, PathBuf)>> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CheckpointErr::io(root)(e)),
    };

    let mut best = None;

    for entry in entries {
        let entry = entry.map_err(CheckpointErr::io(root))?;
        let name = entry.file_name();

        let Some(counter) = name.to_str().and_then(parse_counter) else {
            continue;
        };

        if best.as_ref().is_none_or(|&(c, _)| counter > c) {
            best = Some((counter, entry.path()));
        }
    }

    Ok(best)
}

/// The push counter a checkpoint file was written at, `None` if `path` isn't named like one.
pub fn counter_of(path: &Path) -> Option<u64> {
    path.file_name()?.to_str().and_then(parse_counter)
}

fn file_path(root: &Path, counter: u64) -> PathBuf {
    root.join(format!("{PREFIX}{counter}{SUFFIX}"))
}

fn parse_counter(name: &str) -> Option<u64> {
    name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?.parse().ok()
}

/// Renders every shard and moves the result into place under its final name.
fn dump<K, P>(table: &ParameterTable<K, P>, root: &Path, counter: u64) -> Result<PathBuf>
where
    K: Key,
    P: Record + Send + Sync,
{
    fs::create_dir_all(root).map_err(CheckpointErr::io(root))?;

    let path = file_path(root, counter);
    let tmp = root.join(format!(".{PREFIX}{counter}{SUFFIX}.tmp"));

    let text = table.export_all().concat();
    fs::write(&tmp, text).map_err(CheckpointErr::io(&tmp))?;
    fs::rename(&tmp, &path).map_err(CheckpointErr::io(&path))?;

    info!(counter = counter, path:? = path; "backup local parameter");
    Ok(path)
}
