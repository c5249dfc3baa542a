use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use unfurler::store::sqlite::SqliteStore;
use unfurler::store::CredentialStore;
use unfurler::{api, config, AppState};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "unfurler=debug,tower_http=debug".into()),
    );
    let json = std::env::var("UNFURLER_LOG_FORMAT").map(|v| v == "json").unwrap_or(false);
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let args = cli::Cli::parse();
    let cfg = config::load()?;

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(cli::Commands::Team { command }) => {
            let store = SqliteStore::connect(&cfg.database_url).await?;
            let res = handle_team_command(&store, command).await;
            store.close().await;
            res
        }
        Some(cli::Commands::Project { command }) => {
            let store = SqliteStore::connect(&cfg.database_url).await?;
            let res = handle_project_command(&store, command).await;
            store.close().await;
            res
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    cfg.require_slack()?;

    tracing::info!("Opening credential store...");
    let store = SqliteStore::connect(&cfg.database_url)
        .await
        .with_context(|| format!("failed to open {}", cfg.database_url))?;

    let addr = cfg.bind_addr(port);
    let state = Arc::new(AppState::new(cfg, Arc::new(store.clone()))?);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Unfurler listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down, closing credential store");
    store.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn handle_team_command(store: &SqliteStore, cmd: cli::TeamCommands) -> anyhow::Result<()> {
    match cmd {
        cli::TeamCommands::List => {
            let teams = store.list_teams().await?;
            if teams.is_empty() {
                println!("No teams found.");
            } else {
                println!("{:<16} {:<10}", "TEAM", "PROJECTS");
                for team in teams {
                    let projects = store.list_projects(&team).await?;
                    println!("{:<16} {:<10}", team, projects.len());
                }
            }
        }
        cli::TeamCommands::Delete { team } => {
            store.delete_team(&team).await?;
            println!("Team {} deleted.", team);
        }
    }
    Ok(())
}

async fn handle_project_command(
    store: &SqliteStore,
    cmd: cli::ProjectCommands,
) -> anyhow::Result<()> {
    match cmd {
        cli::ProjectCommands::List { team } => {
            let projects = store.list_projects(&team).await?;
            if projects.is_empty() {
                println!("No projects registered for {}.", team);
            } else {
                for project in projects {
                    println!("{}", unfurler::unfurl::project_url(&project));
                }
            }
        }
        cli::ProjectCommands::Clear { team, project } => {
            let project = project.to_lowercase();
            store.delete_project_token(&team, &project).await?;
            println!("Cleared token for {} in team {}.", project, team);
        }
    }
    Ok(())
}
