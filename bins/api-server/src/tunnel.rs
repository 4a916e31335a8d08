use std::process::Stdio;

use anyhow::{anyhow, Result};
use tokio::process::{Child, Command};
use tracing::{info, instrument};

/// Local tunnel child process; killed when the handle is dropped.
pub struct TunnelHandle {
    _child: Child,
}

/// Spawn `<command> http <port>`, e.g. `ngrok http 4000`.
#[instrument]
pub fn spawn_tunnel(command: &str, port: u16) -> Result<TunnelHandle> {
    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| anyhow!("tunnel command is empty"))?;

    let mut process = Command::new(program);
    process.args(parts);
    process.arg("http").arg(port.to_string());
    process.kill_on_drop(true);
    process.stdin(Stdio::null());
    process.stdout(Stdio::null());
    process.stderr(Stdio::null());

    let child = process
        .spawn()
        .map_err(|err| anyhow!("failed to spawn tunnel process {program}: {err}"))?;
    info!(program, port, pid = ?child.id(), "tunnel process started");

    Ok(TunnelHandle { _child: child })
}
