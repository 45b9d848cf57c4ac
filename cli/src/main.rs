//! Launcher binary: starts the registry and/or supervisor HTTP surfaces as
//! sibling processes next to this executable.
//!
//! Subcommands: `registry` (registry-server only), `supervisor`
//! (supervisor-server only), `run` (both, default).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::Stdio;

#[derive(Parser, Debug)]
#[command(name = "banking-fabric")]
#[command(about = "Launch the registry and supervisor HTTP surfaces")]
struct Args {
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the Agent Registry service only.
    Registry,
    /// Start the Supervisor service only.
    Supervisor,
    /// Start both services (default).
    Run,
}

/// Resolves a sibling binary's path next to the running executable, falling
/// back to the bare name so `$PATH` lookup still works in a cargo workspace.
fn sibling_binary(name: &str) -> PathBuf {
    match std::env::current_exe() {
        Ok(exe) => {
            let candidate = exe.with_file_name(name);
            if candidate.exists() {
                candidate
            } else {
                PathBuf::from(name)
            }
        }
        Err(_) => PathBuf::from(name),
    }
}

fn spawn(name: &'static str) -> std::io::Result<tokio::process::Child> {
    tokio::process::Command::new(sibling_binary(name))
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match args.cmd.unwrap_or(Command::Run) {
        Command::Registry => {
            let mut child = spawn("registry-server")?;
            child.wait().await?;
        }
        Command::Supervisor => {
            let mut child = spawn("supervisor-server")?;
            child.wait().await?;
        }
        Command::Run => {
            let mut registry = spawn("registry-server")?;
            let mut supervisor = spawn("supervisor-server")?;
            tokio::select! {
                status = registry.wait() => {
                    tracing::warn!(?status, "registry-server exited, shutting down supervisor-server");
                    let _ = supervisor.kill().await;
                }
                status = supervisor.wait() => {
                    tracing::warn!(?status, "supervisor-server exited, shutting down registry-server");
                    let _ = registry.kill().await;
                }
            }
        }
    }
    Ok(())
}
