mod config;
mod server;

use std::time::Duration;

use config::ServerConfig;
use server::HellblockServer;
use tokio::io::AsyncBufReadExt;
use tracing::info;

#[tokio::main]
async fn main() {
    let config = match ServerConfig::load_or_default("hellblock.toml") {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load hellblock.toml: {e}");
            std::process::exit(1);
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("Hellblock Server v{} starting", env!("CARGO_PKG_VERSION"));
    info!("Storage: {}", config.storage.path);
    info!(
        "Invasion cadence: fine update every {} ticks, scan every {}s",
        config.server.update_interval_ticks, config.server.scan_interval_secs
    );

    let mut server = match HellblockServer::new(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open storage: {e}");
            std::process::exit(1);
        }
    };

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

    // Handle Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    // Console REPL: read lines from stdin
    let (console_tx, mut console_rx) = tokio::sync::mpsc::channel::<String>(32);
    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    let mut tick_interval = tokio::time::interval(Duration::from_millis(50));
    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                server.game_tick();
            }
            Some(line) = console_rx.recv() => {
                if server.handle_console_command(&line) {
                    break;
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    server.shutdown();
    info!("Server shut down.");
}
