use std::{
    num::NonZeroUsize,
    sync::{Arc, atomic::AtomicU64},
};

use comms::{
    msg::{COORDINATOR, MessageClass},
    specs::server::{AccessSpec, ServerSpec},
};
use log::info;

use super::{FinishHandler, FinishTracker, ParameterServer, PullHandler, PushHandler, Registry};
use crate::{
    access::{
        AccessMethod, AdaGrad, Adam, Additive, GradientDescent, GradientDescentWithMomentum,
        PullAccess, PushAccess,
    },
    checkpoint::{self, CheckpointSink, Checkpointer},
    storage::ParameterTable,
};

/// The key type served by the binaries.
pub type ServerKey = u64;

/// Builds `ParameterServer`s given a specification.
pub struct ServerBuilder;

impl ServerBuilder {
    /// Creates a new `ServerBuilder`.
    ///
    /// # Returns
    /// A new `ServerBuilder` instance.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new `ParameterServer` following a spec.
    ///
    /// # Arguments
    /// * `spec` - The specification of the parameter server.
    ///
    /// # Returns
    /// A new server or a `CheckpointErr` if the configured restore file can't be loaded.
    pub fn build(&self, spec: &ServerSpec) -> checkpoint::Result<ParameterServer> {
        self.resolve_access(spec)
    }

    /// Resolves the `AccessMethod` for this server.
    ///
    /// # Arguments
    /// * `spec` - The specification of the parameter server.
    ///
    /// # Returns
    /// A new server.
    fn resolve_access(&self, spec: &ServerSpec) -> checkpoint::Result<ParameterServer> {
        match spec.access {
            AccessSpec::Additive => self.terminate_build(spec, Additive::<f32>::new()),
            AccessSpec::GradientDescent { learning_rate, dim } => {
                self.terminate_build(spec, GradientDescent::new(learning_rate, dim))
            }
            AccessSpec::GradientDescentWithMomentum {
                learning_rate,
                momentum,
                dim,
            } => self.terminate_build(
                spec,
                GradientDescentWithMomentum::new(learning_rate, momentum, dim),
            ),
            AccessSpec::AdaGrad {
                learning_rate,
                epsilon,
                dim,
            } => self.terminate_build(spec, AdaGrad::new(learning_rate, epsilon, dim)),
            AccessSpec::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
                dim,
            } => self.terminate_build(
                spec,
                Adam::new(learning_rate, beta1, beta2, epsilon, dim),
            ),
        }
    }

    /// Terminates the entire build and finally instanciates all the entities.
    ///
    /// # Arguments
    /// * `spec` - The specification of the parameter server.
    /// * `method` - A resolved access method.
    ///
    /// # Returns
    /// A new server.
    fn terminate_build<A: AccessMethod>(
        &self,
        spec: &ServerSpec,
        method: A,
    ) -> checkpoint::Result<ParameterServer> {
        let table = self.restore_table(spec.shards, spec, &method)?;
        let start = spec
            .param_restore_path
            .as_deref()
            .and_then(checkpoint::counter_of)
            .unwrap_or_default();

        let table = Arc::new(table);
        let method = Arc::new(method);
        let push_count = Arc::new(AtomicU64::new(start));

        let checkpointer: Arc<dyn CheckpointSink> = Arc::new(Checkpointer::new(
            Arc::clone(&table),
            &spec.param_backup_root,
            spec.param_backup_period,
            spec.checkpoint_mode,
        ));

        let pull = PullAccess::<ServerKey, A>::new(Arc::clone(&table), Arc::clone(&method));
        let push = PushAccess::<ServerKey, A>::new(table, method);

        let mut registry = Registry::new();
        registry
            .add(MessageClass::WorkerPullRequest, PullHandler::new(pull))
            .add(
                MessageClass::WorkerPushRequest,
                PushHandler::new(push, Arc::clone(&push_count), Some(checkpointer)),
            );

        let tracker = Arc::new(FinishTracker::new(spec.workers));
        if spec.node_id == COORDINATOR {
            registry.add(
                MessageClass::WorkerFinishWork,
                FinishHandler::new(Arc::clone(&tracker)),
            );
        }

        info!(
            server = spec.node_id,
            shards = spec.shards.get(),
            backup_period = spec.param_backup_period,
            push_count = start;
            "parameter server built"
        );

        Ok(ParameterServer::new(
            spec.node_id,
            spec.workers,
            registry,
            tracker,
            push_count,
        ))
    }

    /// Creates the parameter table, loading the restore checkpoint if one is configured.
    ///
    /// Every restored record must have the shape `method` expects.
    fn restore_table<A: AccessMethod>(
        &self,
        shards: NonZeroUsize,
        spec: &ServerSpec,
        method: &A,
    ) -> checkpoint::Result<ParameterTable<ServerKey, A::Param>> {
        let table = ParameterTable::new(shards);

        if let Some(path) = &spec.param_restore_path {
            Checkpointer::restore_checked(path, &table, |param| method.check_param(param))?;
        }

        Ok(table)
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
