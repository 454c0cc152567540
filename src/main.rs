//! Neo4j MCP Server - Rust Implementation
//!
//! A Model Context Protocol (MCP) server over a Neo4j e-commerce graph.
//! Connection settings are read from the environment (or the flags below)
//! the first time a tool needs the database. A `.env` file in the working
//! directory is loaded first; variables already set take precedence.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use neo4j_mcp_ecommerce::catalog::Catalog;
use neo4j_mcp_ecommerce::config::{load_env_file, SettingsOverrides};
use neo4j_mcp_ecommerce::error::Result;
use neo4j_mcp_ecommerce::graph::ConnectionManager;
use neo4j_mcp_ecommerce::mcp::tools::{list_tools, Dispatcher};
use neo4j_mcp_ecommerce::mcp::McpServer;

/// Neo4j MCP Server
#[derive(Parser)]
#[command(name = "neo4j-mcp-ecommerce")]
#[command(author, version, about = "Neo4j MCP Server - customer search and product recommendations")]
struct Cli {
    /// Bolt URI, overrides NEO4J_URI
    #[arg(long, global = true)]
    uri: Option<String>,

    /// Username, overrides NEO4J_USERNAME
    #[arg(long, global = true)]
    username: Option<String>,

    /// Password, overrides NEO4J_PASSWORD
    #[arg(long, global = true)]
    password: Option<String>,

    /// Database name, overrides NEO4J_DATABASE
    #[arg(long, global = true)]
    database: Option<String>,

    /// Dotenv file to load instead of ./.env
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tool catalog as JSON and exit
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Loaded before the subscriber so RUST_LOG may come from the file
    let env_file = load_env_file(cli.env_file.as_deref());

    // Logs go to stderr; stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match env_file {
        Ok(Some(path)) => tracing::debug!(path = %path.display(), "Loaded env file"),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Env file not loaded"),
    }

    let catalog = Arc::new(Catalog::ecommerce());

    match cli.command {
        Some(Commands::Tools) => {
            let tools = list_tools(&catalog);
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }
        None => {
            let overrides = SettingsOverrides {
                uri: cli.uri,
                username: cli.username,
                password: cli.password,
                database: cli.database,
            };
            run_server(catalog, overrides).await?;
            // The stdin reader thread may still be parked on a read
            std::process::exit(0);
        }
    }

    Ok(())
}

async fn run_server(catalog: Arc<Catalog>, overrides: SettingsOverrides) -> Result<()> {
    let connections = Arc::new(ConnectionManager::neo4j(overrides));
    let mut server = McpServer::new(Dispatcher::new(catalog, connections.clone()));

    let outcome = tokio::select! {
        res = server.run_stdio() => res,
        _ = shutdown_signal() => {
            tracing::info!("Shutting down server...");
            Ok(())
        }
    };

    connections.close().await;
    outcome
}

/// Resolves on Ctrl-C, or on SIGTERM where the platform has it
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
