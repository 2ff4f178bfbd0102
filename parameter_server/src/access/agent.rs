use std::sync::Arc;

use super::{AccessMethod, SizeMismatchErr};
use crate::storage::{Key, ParameterTable};

/// The read side of an access strategy, what a pull handler consults per key.
pub trait PullStrategy<K>: Send + Sync {
    type Value;

    /// Resolves the authoritative value of `key`, initializing it if it was never seen.
    fn get_pull_value(&self, key: &K) -> Self::Value;
}

/// The read-modify-write side of an access strategy, what a push handler consults per key.
pub trait PushStrategy<K>: Send + Sync {
    type Grad;

    /// Validates `grad` without touching the table.
    fn check_grad(&self, grad: &Self::Grad) -> Result<(), SizeMismatchErr>;

    /// Atomically applies `grad` to the parameter of `key`.
    fn apply_push_value(&self, key: &K, grad: &Self::Grad);
}

/// Binds an `AccessMethod`'s pull projection to a parameter table.
pub struct PullAccess<K, A: AccessMethod> {
    table: Arc<ParameterTable<K, A::Param>>,
    method: Arc<A>,
}

impl<K, A: AccessMethod> PullAccess<K, A> {
    /// Creates a new `PullAccess` agent.
    ///
    /// # Arguments
    /// * `table` - The shared parameter table.
    /// * `method` - The shared access method.
    pub fn new(table: Arc<ParameterTable<K, A::Param>>, method: Arc<A>) -> Self {
        Self { table, method }
    }
}

impl<K: Key, A: AccessMethod> PullStrategy<K> for PullAccess<K, A> {
    type Value = A::Value;

    fn get_pull_value(&self, key: &K) -> A::Value {
        let method = &self.method;

        self.table.get_or_init(
            key,
            || method.init_param(),
            |param| method.get_pull_value(param),
        )
    }
}

/// Binds an `AccessMethod`'s update math to a parameter table.
pub struct PushAccess<K, A: AccessMethod> {
    table: Arc<ParameterTable<K, A::Param>>,
    method: Arc<A>,
}

impl<K, A: AccessMethod> PushAccess<K, A> {
    /// Creates a new `PushAccess` agent.
    ///
    /// # Arguments
    /// * `table` - The shared parameter table.
    /// * `method` - The shared access method.
    pub fn new(table: Arc<ParameterTable<K, A::Param>>, method: Arc<A>) -> Self {
        Self { table, method }
    }
}

impl<K: Key, A: AccessMethod> PushStrategy<K> for PushAccess<K, A> {
    type Grad = A::Grad;

    fn check_grad(&self, grad: &A::Grad) -> Result<(), SizeMismatchErr> {
        self.method.check_grad(grad)
    }

    fn apply_push_value(&self, key: &K, grad: &A::Grad) {
        let method = &self.method;

        self.table.update(
            key,
            || method.init_param(),
            |param| method.apply_push_value(param, grad),
        );
    }
}
