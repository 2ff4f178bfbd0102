use std::{env, io, path::PathBuf, sync::Arc};

use comms::specs::{self, worker::WorkerSpec};
use log::info;
use tokio::{signal, task};

use worker::{ParamClient, RpcClient, Terminator, error::Result};

const CONFIG_VAR: &str = "WORKER_CONFIG";

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let path = env::args_os()
        .nth(1)
        .or_else(|| env::var_os(CONFIG_VAR))
        .map(PathBuf::from)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("usage: worker <spec.json> (or set {CONFIG_VAR})"),
            )
        })?;

    let spec: WorkerSpec = specs::load(&path)?;
    let client = Arc::new(RpcClient::connect(spec.node_id, &spec.server_addrs).await?);
    info!(worker = spec.node_id, servers = spec.server_addrs.len(); "connected to every server");

    let work = task::spawn_blocking(move || run(spec, client));

    tokio::select! {
        ret = work => {
            ret??;
            info!("wrapping up, disconnecting...");
        }
        _ = signal::ctrl_c() => {
            info!("received SIGINT");
        }
    }

    Ok(())
}

/// Runs the synthetic pull/push rounds, then the termination handshake.
fn run(spec: WorkerSpec, client: Arc<RpcClient>) -> Result<()> {
    let params = ParamClient::new(Arc::clone(&client));
    let keys: Vec<u64> = (0..spec.keys).collect();

    for step in 0..spec.steps {
        match spec.dim {
            None => {
                // Additive servers: moves every value to 1.
                let values = params.pull::<f32>(&keys)?;
                let grads: Vec<_> = keys.iter().zip(values).map(|(&k, v)| (k, 1.0 - v)).collect();
                params.push(&grads)?;
            }
            Some(dim) => {
                let values = params.pull::<Vec<f32>>(&keys)?;
                let grads: Vec<_> = keys
                    .iter()
                    .zip(values)
                    .map(|(&k, v)| {
                        let mut grad: Vec<f32> = v.iter().map(|x| x - 1.0).collect();
                        grad.resize(dim, -1.0);
                        (k, grad)
                    })
                    .collect();
                params.push(&grads)?;
            }
        }

        info!(worker = spec.node_id, step = step; "step done");
    }

    let mut terminator = Terminator::new(client, spec.finish_grace(), spec.handshake_timeout());
    terminator.finish()
}
