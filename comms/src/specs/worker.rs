use std::{net::SocketAddr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::msg::NodeId;

/// The specification for a worker node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSpec {
    pub node_id: NodeId,
    /// Server addresses indexed by server node id.
    pub server_addrs: Vec<SocketAddr>,
    /// Bounds the finish handshake, waits forever when absent.
    #[serde(default)]
    pub handshake_timeout_ms: Option<u64>,
    /// Delay before the finish message is sent.
    #[serde(default)]
    pub finish_grace_ms: u64,
    /// Keys touched by the synthetic pull/push rounds of the worker binary.
    #[serde(default)]
    pub keys: u64,
    #[serde(default)]
    pub steps: usize,
    /// Dimension of the dense parameters the servers hold, scalar parameters when absent.
    #[serde(default)]
    pub dim: Option<usize>,
}

impl WorkerSpec {
    pub fn handshake_timeout(&self) -> Option<Duration> {
        self.handshake_timeout_ms.map(Duration::from_millis)
    }

    pub fn finish_grace(&self) -> Duration {
        Duration::from_millis(self.finish_grace_ms)
    }
}
