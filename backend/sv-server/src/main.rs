//! svd - local worker supervisor
//!
//! Loads the worker table from `config.toml`, binds the control API on
//! loopback, then reconciles and auto-starts the workers and serves until
//! interrupted.

mod cli;

use crate::cli::Cli;

use sv_config::Config;
use sv_server::error::ServerError;
use sv_server::logger;
use sv_supervisor::{
    HttpHealthProbe, ProcessLauncher, Registry, ShutdownCoordinator, Supervisor,
    SupervisorTimings,
};

use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // Load and validate configuration
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => Config::config_dir()?,
    };
    let config = Config::load_from(&config_dir)?;
    config.validate()?;

    let registry = Registry::from_config(&config.workers)?;

    if cli.check {
        print_worker_table(&registry);
        return Ok(());
    }

    let log_file_path = match config.logging.file {
        Some(ref filename) => {
            let log_dir = config_dir.join(&config.logging.dir);
            std::fs::create_dir_all(&log_dir)?;
            Some(log_dir.join(filename))
        }
        None => None,
    };

    // Initialize logger (before any other logging)
    logger::initialize(config.logging.level, log_file_path, config.logging.colored)?;

    info!("Starting svd v{}", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    let timings = SupervisorTimings::from(&config.supervisor);
    let probe = HttpHealthProbe::new(config.supervisor.host.clone(), timings.probe_timeout)?;

    let mut launcher = ProcessLauncher::new().with_grace_period(timings.terminate_timeout);
    if let Some(dir) = config.worker_log_dir(&config_dir) {
        info!("Worker output captured under {}", dir.display());
        launcher = launcher.with_log_dir(dir);
    }

    let supervisor = Arc::new(Supervisor::new(
        registry,
        Arc::new(launcher),
        Arc::new(probe),
        timings,
    ));

    spawn_signal_handler(supervisor.shutdown_coordinator().clone());

    // Bind the control API before any worker is launched
    let bind_addr = config.api.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: bind_addr.clone(),
            source,
        })?;
    info!("Control API listening on {}", listener.local_addr()?);

    sv_server::run(supervisor, listener).await?;

    info!("Shutdown complete");
    Ok(())
}

fn spawn_signal_handler(shutdown: ShutdownCoordinator) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => info!("Received SIGINT (Ctrl+C), initiating graceful shutdown"),
                        _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
                    }
                    shutdown.shutdown();
                    return;
                }
                Err(e) => warn!("Failed to listen for SIGTERM: {}", e),
            }
        }

        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
                shutdown.shutdown();
            }
            Err(e) => {
                error!("Failed to listen for SIGINT: {}", e);
            }
        }
    });
}

fn print_worker_table(registry: &Registry) {
    println!("Configuration OK: {} workers", registry.len());
    for definition in registry.all() {
        println!(
            "  {:>5}  {:<24} auto_start={:<5} tool={:<10} {}",
            definition.port,
            definition.name,
            definition.auto_start,
            definition.tool_id.as_deref().unwrap_or("-"),
            definition.launch.display_command(definition.port)
        );
    }
}
