/// Match stream server — serves one simulated minute per GET request.
///
/// Usage: match-stream-server [--config <path>] [--bind <addr>]
///
/// Log verbosity follows `RUST_LOG` (default `info`).

mod config;
mod server;

use std::path::Path;
use std::process;

use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut bind = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--bind" if i + 1 < args.len() => {
                i += 1;
                bind = Some(args[i].clone());
            }
            "--help" | "-h" => {
                println!("Usage: match-stream-server [--config <path>] [--bind <addr>]");
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(ref path) => match ServerConfig::load(Path::new(path)) {
            Ok(config) => config,
            Err(err) => {
                error!(path = %path, %err, "config.load_failed");
                process::exit(1);
            }
        },
        None => ServerConfig::default(),
    };
    if let Some(addr) = bind {
        match addr.parse() {
            Ok(addr) => config.bind = addr,
            Err(err) => {
                error!(bind = %addr, %err, "config.bad_bind");
                process::exit(1);
            }
        }
    }

    if config.token_secret.is_none() {
        warn!("config.token_secret unset; tokens are signed with the development secret");
    }

    let stream = match config.build_stream() {
        Ok(stream) => stream,
        Err(err) => {
            error!(%err, "stream.build_failed");
            process::exit(1);
        }
    };

    info!(
        bind = %config.bind,
        regulation_minutes = stream.regulation_minutes(),
        model_version = stream.model_version(),
        "match stream server ready"
    );

    if let Err(err) = server::serve(config.bind, stream).await {
        error!(%err, "server.stopped");
        process::exit(1);
    }
}
