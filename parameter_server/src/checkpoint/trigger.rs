/// Whether the push that brought the counter to `counter` must dump the table.
///
/// A `period` of zero or less disables checkpointing.
pub fn should_checkpoint(counter: u64, period: i64) -> bool {
    match u64::try_from(period) {
        Ok(0) | Err(_) => false,
        Ok(period) => counter % period == 0,
    }
}
