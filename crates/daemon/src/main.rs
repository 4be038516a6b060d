/// Nameplate Daemon - Directory Service Node
///
/// This daemon runs a directory node that:
/// - Accepts directory sessions over TCP
/// - Tracks name registrations across the scope hierarchy
/// - Answers resolve queries for client processes

use anyhow::Result;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber;

use nameplate_common::{ChannelLocation, Location, NodeConfig};
use nameplate_core::{DirectoryClient, DirectoryServer};
use nameplate_daemon::{TcpConnector, TcpSessionListener};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Starting Nameplate Daemon v{}", env!("CARGO_PKG_VERSION"));

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "help" | "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "version" | "--version" | "-v" => {
                println!("Nameplate Daemon v{}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "serve" => {
                run_serve_mode().await?;
            }
            "resolve" => {
                if args.len() < 4 {
                    eprintln!("Usage: nameplated resolve <name> <scope>");
                    std::process::exit(1);
                }
                run_resolve_mode(&args[2], &args[3]).await?;
            }
            _ => {
                eprintln!("Unknown command: {}", args[1]);
                eprintln!("Run with 'help' to see available commands");
                std::process::exit(1);
            }
        }
    } else {
        // Default: serve the directory
        run_serve_mode().await?;
    }

    Ok(())
}

/// Load the node configuration, creating a default file on first run
fn load_config() -> Result<NodeConfig> {
    let config_path = PathBuf::from("nameplate.toml");
    if config_path.exists() {
        info!("Loading configuration from {:?}", config_path);
        Ok(NodeConfig::from_file(&config_path)?)
    } else {
        info!("No configuration file found, using defaults");
        let config = NodeConfig::default();

        // Save default config for next time
        if let Err(e) = config.to_file(&config_path) {
            warn!("Failed to save default config: {}", e);
        } else {
            info!("Saved default configuration to {:?}", config_path);
        }

        Ok(config)
    }
}

/// Run the directory service
async fn run_serve_mode() -> Result<()> {
    let config = load_config()?;
    let bind_addr = format!("{}:{}", config.listen_addr, config.listen_port);

    let listener = TcpSessionListener::bind(&bind_addr).await?;
    info!("Directory service listening on {}", bind_addr);

    let server = DirectoryServer::new();
    tokio::spawn(async move {
        if let Err(e) = server.serve(listener).await {
            warn!("Directory service stopped: {}", e);
        }
    });

    info!("Directory is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received");
    Ok(())
}

/// Resolve one name against a running directory and print the result
async fn run_resolve_mode(name: &str, scope: &str) -> Result<()> {
    let config = load_config()?;
    let server_addr = config
        .server_addr
        .clone()
        .unwrap_or_else(|| format!("127.0.0.1:{}", config.listen_port));

    let scope = scope.parse()?;
    let server = Location::Channel(ChannelLocation::new(server_addr, 0));

    let client = DirectoryClient::connect_with_timeout(
        &TcpConnector::new(),
        &server,
        Location::None,
        config.reply_timeout(),
    )
    .await?;

    let resolution = client.resolve_location(name, &scope).await?;
    println!("{} @ {} -> {}", resolution.name, resolution.scope, resolution.location);

    Ok(())
}

/// Print help message
fn print_help() {
    println!("Nameplate Daemon - Directory Service Node");
    println!();
    println!("USAGE:");
    println!("    nameplated [COMMAND]");
    println!();
    println!("COMMANDS:");
    println!("    serve                    Run the directory service (default)");
    println!("    resolve <name> <scope>   Resolve a name against a running directory");
    println!("    help                     Show this help message");
    println!("    version                  Show version information");
    println!();
    println!("CONFIGURATION:");
    println!("    Settings are read from nameplate.toml in the working");
    println!("    directory; a default file is written on first run.");
    println!();
    println!("EXAMPLES:");
    println!("    # Start the directory service");
    println!("    nameplated");
    println!("    nameplated serve");
    println!();
    println!("    # Look up a name from another process");
    println!("    nameplated resolve pipeline.in global/acme/node1");
}
