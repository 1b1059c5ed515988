use anyhow::{bail, Context, Result};
use crabrelay::config::RelayConfig;
use crabrelay::relay::SignalingRelay;
use crabrelay::server::{self, ServerState};
use crabrelay::session::{spawn_expiry_sweep, SessionRegistry};
use std::env;
use std::path::PathBuf;

const USAGE: &str = "Usage: crabrelay [serve] [--config <path>]\n       crabrelay print-config [--config <path>]\n       crabrelay version";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let command = match args.get(1).map(String::as_str) {
        None => "serve",
        Some("--config") => "serve",
        Some(arg) => arg,
    };

    match command {
        "serve" => cmd_serve(&args),
        "print-config" => cmd_print_config(&args),
        "version" | "--version" => {
            println!("{} {}", crabrelay::NAME, crabrelay::VERSION);
            Ok(())
        }
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            eprintln!("{}", USAGE);
            std::process::exit(1);
        }
    }
}

fn config_path(args: &[String]) -> Result<Option<PathBuf>> {
    let mut i = 1;
    while i < args.len() {
        if args[i] == "--config" {
            let Some(path) = args.get(i + 1) else {
                bail!("--config needs a path");
            };
            return Ok(Some(PathBuf::from(path)));
        }
        i += 1;
    }
    Ok(None)
}

fn load_config(args: &[String]) -> Result<RelayConfig> {
    let mut config = match config_path(args)? {
        Some(path) => RelayConfig::load_from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => RelayConfig::load_from_file(RelayConfig::default_path())?,
    };
    config.apply_env_overrides();
    if let Err(e) = config.validate() {
        bail!("Invalid configuration: {}", e);
    }
    Ok(config)
}

fn cmd_print_config(args: &[String]) -> Result<()> {
    let config = load_config(args)?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_serve(args: &[String]) -> Result<()> {
    crabrelay::init_logging();
    let config = load_config(args)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(run(config))
}

async fn run(config: RelayConfig) -> Result<()> {
    let addr = config.listen_addr()?;
    let registry = SessionRegistry::new(config.sessions.id_length);
    let sweeper = spawn_expiry_sweep(
        registry.clone(),
        config.sessions.sweep_interval(),
        config.sessions.timeout(),
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("{}", server::banner(addr.port()));

    let state = ServerState::new(SignalingRelay::new(registry), config);
    server::serve(listener, state, shutdown_signal())
        .await
        .context("Signaling server error")?;

    sweeper.abort();
    log::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received Ctrl+C, shutting down"),
        _ = terminate => log::info!("Received SIGTERM, shutting down"),
    }
}
