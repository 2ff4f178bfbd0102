use std::{net::SocketAddr, num::NonZeroUsize, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::msg::NodeId;

/// The specification for the access method bound to the parameter table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AccessSpec {
    /// Scalar parameters, `value += grad`.
    Additive,
    GradientDescent {
        learning_rate: f32,
        dim: usize,
    },
    GradientDescentWithMomentum {
        learning_rate: f32,
        momentum: f32,
        dim: usize,
    },
    AdaGrad {
        learning_rate: f32,
        epsilon: f32,
        dim: usize,
    },
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
        dim: usize,
    },
}

/// Whether a triggered checkpoint holds the push that triggered it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointMode {
    /// The push response waits until the dump is on disk.
    #[default]
    Sync,
    /// The dump runs on the background pool, the push responds immediately.
    Background,
}

/// The specification for a parameter server node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSpec {
    #[serde(default)]
    pub node_id: NodeId,
    pub listen_addr: SocketAddr,
    /// The amount of workers expected to finish before the coordinator shuts down.
    pub workers: usize,
    pub shards: NonZeroUsize,
    pub access: AccessSpec,
    /// Pushes between checkpoints, `<= 0` disables checkpointing.
    #[serde(default)]
    pub param_backup_period: i64,
    #[serde(default = "default_backup_root")]
    pub param_backup_root: PathBuf,
    #[serde(default)]
    pub checkpoint_mode: CheckpointMode,
    /// A checkpoint file to load the table from at startup.
    #[serde(default)]
    pub param_restore_path: Option<PathBuf>,
}

fn default_backup_root() -> PathBuf {
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_disable_checkpointing() {
        let json = r#"{
            "listen_addr": "127.0.0.1:8765",
            "workers": 2,
            "shards": 4,
            "access": { "kind": "additive" }
        }"#;

        let spec: ServerSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.node_id, 0);
        assert_eq!(spec.param_backup_period, 0);
        assert_eq!(spec.checkpoint_mode, CheckpointMode::Sync);
        assert_eq!(spec.access, AccessSpec::Additive);
        assert!(spec.param_restore_path.is_none());
    }

    #[test]
    fn test_tagged_access_spec() {
        let json = r#"{ "kind": "ada_grad", "learning_rate": 0.1, "epsilon": 1e-6, "dim": 8 }"#;
        let spec: AccessSpec = serde_json::from_str(json).unwrap();

        assert_eq!(
            spec,
            AccessSpec::AdaGrad {
                learning_rate: 0.1,
                epsilon: 1e-6,
                dim: 8
            }
        );
    }
}
