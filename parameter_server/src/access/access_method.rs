use std::{
    error::Error,
    fmt::{self, Display},
};

use comms::Field;

use crate::storage::{Record, write_floats};

/// A pushed gradient or a restored parameter doesn't have the configured dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeMismatchErr {
    pub expected: usize,
    pub got: usize,
}

impl Display for SizeMismatchErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vector of length {} doesn't match the parameter dimension {}",
            self.got, self.expected
        )
    }
}

impl Error for SizeMismatchErr {}

/// The update math bound to a parameter table.
///
/// `Param` is what the server stores per key, `Value` is what a pull returns and `Grad` is what
/// a push carries. Implementations must be deterministic: the same gradients applied in the same
/// order to a fresh parameter always produce the same parameter.
pub trait AccessMethod: Send + Sync + 'static {
    type Param: Record + Send + Sync + 'static;
    type Value: Field;
    type Grad: Field;

    /// The parameter materialized the first time a key is accessed.
    fn init_param(&self) -> Self::Param;

    /// Projects a stored parameter into the value sent to workers.
    fn get_pull_value(&self, param: &Self::Param) -> Self::Value;

    /// Validates a gradient before any gradient of its request is applied.
    fn check_grad(&self, _grad: &Self::Grad) -> Result<(), SizeMismatchErr> {
        Ok(())
    }

    /// Validates a parameter loaded from outside, such as a checkpoint record.
    fn check_param(&self, _param: &Self::Param) -> Result<(), SizeMismatchErr> {
        Ok(())
    }

    /// Applies a gradient to a stored parameter.
    fn apply_push_value(&self, param: &mut Self::Param, grad: &Self::Grad);
}

/// Checks dense vectors against the configured dimension.
pub(super) fn check_dim(dim: usize, vector: &[f32]) -> Result<(), SizeMismatchErr> {
    if vector.len() != dim {
        return Err(SizeMismatchErr {
            expected: dim,
            got: vector.len(),
        });
    }

    Ok(())
}

/// Writes several dense vectors as one record, separated by `|`.
pub(super) fn write_parts(parts: &[&[f32]], out: &mut String) {
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push_str(" | ");
        }
        write_floats(part, out);
    }
}

/// Parses exactly `n` dense vectors written by `write_parts`.
pub(super) fn parse_parts(s: &str, n: usize) -> Option<Vec<Vec<f32>>> {
    let parts: Vec<_> = s.split('|').map(Vec::<f32>::parse_record).collect::<Option<_>>()?;
    (parts.len() == n).then_some(parts)
}
