use std::{marker::PhantomData, ops::AddAssign};

use comms::Scalar;

use super::AccessMethod;
use crate::storage::Record;

/// Scalar parameters updated by plain addition, `value += grad`.
#[derive(Debug)]
pub struct Additive<T> {
    _value: PhantomData<fn() -> T>,
}

impl<T> Additive<T> {
    pub fn new() -> Self {
        Self {
            _value: PhantomData,
        }
    }
}

impl<T> Default for Additive<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AccessMethod for Additive<T>
where
    T: Scalar + Record + Default + AddAssign + Send + Sync + 'static,
{
    type Param = T;
    type Value = T;
    type Grad = T;

    fn init_param(&self) -> T {
        T::default()
    }

    fn get_pull_value(&self, param: &T) -> T {
        *param
    }

    fn apply_push_value(&self, param: &mut T, grad: &T) {
        *param += *grad;
    }
}
