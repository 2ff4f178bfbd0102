use std::{env, io, path::PathBuf};

use comms::specs::{self, server::ServerSpec};
use log::{info, warn};
use tokio::{net::TcpListener, signal};

use parameter_server::ServerBuilder;

const CONFIG_VAR: &str = "PS_CONFIG";

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
                format!("usage: parameter_server <spec.json> (or set {CONFIG_VAR})"),
            )
        })?;

    let spec: ServerSpec = specs::load(&path)?;
    let mut pserver = ServerBuilder::new().build(&spec)?;

    let listener = TcpListener::bind(spec.listen_addr).await?;
    info!(server = spec.node_id; "listening at {}", spec.listen_addr);

    tokio::select! {
        ret = pserver.serve(listener) => {
            ret?;
            info!(push_count = pserver.push_count(); "wrapping up");
        }
        _ = signal::ctrl_c() => {
            warn!("received SIGINT, shutting down");
        }
    }

    Ok(())
}
