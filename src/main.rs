use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use axum::http::HeaderValue;
use clap::Parser;
use cron::Schedule;
use sqlx::migrate::Migrator;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledger_core::adapters::PostgresLedgerStore;
use ledger_core::cli::{self, Cli, Commands, DbCommands};
use ledger_core::config::Config;
use ledger_core::ports::LedgerStore;
use ledger_core::services::notifier::sink_from_config;
use ledger_core::services::runner::BatchRunner;
use ledger_core::services::scheduler::run_settlement_loop;
use ledger_core::{create_app, db, startup, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Cli::parse();
    let config = Config::from_env()?;

    match args.command {
        None | Some(Commands::Serve) => serve(config).await,
        Some(Commands::Settle) => cli::handle_settle(&config).await,
        Some(Commands::Db(DbCommands::Migrate)) => cli::handle_db_migrate(&config).await,
        Some(Commands::Config) => cli::handle_config_validate(&config),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = db::create_pool(&config).await?;

    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    let store: Arc<dyn LedgerStore> = Arc::new(PostgresLedgerStore::new(pool));
    let notifier = sink_from_config(&config);

    let report = startup::validate_environment(&config, store.as_ref()).await?;
    report.print();
    if !report.is_valid() {
        anyhow::bail!("startup validation failed");
    }

    let schedule = Schedule::from_str(&config.settlement_schedule)?;
    let runner = BatchRunner::new(store.clone(), notifier.clone(), config.retry_policy());
    tokio::spawn(run_settlement_loop(runner, schedule));
    tracing::info!(
        "settlement scheduler running on '{}'",
        config.settlement_schedule
    );

    let state = AppState {
        store,
        notifier,
        retry: config.retry_policy(),
    };
    let app = create_app(state).layer(cors_layer(&config)?);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    match &config.cors_allowed_origins {
        Some(origins) => {
            let origins = origins
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(|entry| entry.parse::<HeaderValue>())
                .collect::<Result<Vec<_>, _>>()?;

            Ok(CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any))
        }
        None => Ok(CorsLayer::permissive()),
    }
}
