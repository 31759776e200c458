use anyhow::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use photonav::config::Config;
use photonav::db::Database;
use photonav::logging;
use photonav::processing::DisabledProcessor;
use photonav::server::{AppState, Server};
use photonav::sync::SyncManager;

fn parse_args() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("photonav {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config_path
}

fn print_help() {
    println!(
        r#"photonav - photo metadata catalog server

USAGE:
    photonav [OPTIONS]

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    PHOTONAV_LOG        Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/photonav/config.toml"#
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = parse_args();

    // Initialize logging (uses journald on Linux, file fallback otherwise)
    let _ = logging::init(Some(Config::config_dir().join("logs")));

    // Load configuration
    let config = match config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };

    // Initialize database
    let db = Database::open(&config.db_path)?;
    db.initialize()?;

    let state = Arc::new(AppState {
        db,
        sync: Mutex::new(SyncManager::new()),
        processor: Box::new(DisabledProcessor),
        max_tags: config.processing.max_tags,
    });

    let addr = SocketAddr::new(config.server.host, config.server.port);
    Server::new(state, addr).start().await?;

    Ok(())
}
