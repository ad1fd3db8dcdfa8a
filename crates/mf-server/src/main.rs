// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

use clap::Parser;
use mf_config::MotionForgeConfig;
use mf_server::ServerState;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// The MotionForge MCP tool server.
///
/// Speaks length-delimited JSON-RPC 2.0 lines on stdin/stdout (spec §6);
/// all diagnostic logging goes to stderr so it never interleaves with the
/// wire protocol.
#[derive(Parser, Debug)]
#[command(name = "mf-server", version, about = "MotionForge MCP stdio tool server")]
struct Cli {
    /// Run the stdio transport. Currently the only transport this server
    /// supports (spec §6: "no HTTP transport").
    #[arg(long)]
    stdio: bool,

    /// Directory to look for `motionforge.toml` in. Defaults to the
    /// current working directory.
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Enable debug-level logging.
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.debug { EnvFilter::new("mf=debug") } else { EnvFilter::new("mf=info") };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    if !cli.stdio {
        eprintln!("mf-server only supports --stdio; no other transport is implemented (spec §6)");
        return ExitCode::FAILURE;
    }

    let config_dir = cli.config_dir.unwrap_or_else(|| PathBuf::from("."));
    let (config, warnings) = match MotionForgeConfig::load_optional(&config_dir) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("failed to load motionforge.toml: {err}");
            return ExitCode::FAILURE;
        }
    };
    for warning in &warnings {
        tracing::warn!(%warning, "configuration warning");
    }

    let tooling_commit = std::env::var("GITHUB_SHA").ok().map(|sha| sha.chars().take(7).collect::<String>());
    let mut state = ServerState::new(config, tooling_commit);

    match mf_server::run(&mut state) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("mf-server I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}
