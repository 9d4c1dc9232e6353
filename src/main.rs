use clap::Parser;
use qris_gateway::cli::{self, Cli, Commands, DbCommands};
use qris_gateway::config::Config;
use qris_gateway::middleware::signature::SignatureVerifier;
use qris_gateway::{create_app, db, telemetry, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let config = Config::from_env()?;

    telemetry::init_logging("info", config.log_format);

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Db(DbCommands::Migrate) => cli::handle_db_migrate(&config).await,
        Commands::Config => cli::handle_config_validate(&config).await,
        Commands::Tx(command) => {
            let pool = db::create_pool(&config).await?;
            cli::handle_tx(&pool, command).await
        }
        Commands::Sign { timestamp, body } => cli::handle_sign(&config, timestamp, &body),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = db::create_pool(&config).await?;

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    if config.sig_max_age_seconds <= 0 {
        tracing::warn!("signature freshness check disabled");
    }

    let state = AppState::new(pool.clone(), &config);
    tracing::info!(
        policy = ?state.transition_policy,
        "status transition policy"
    );

    let verifier = SignatureVerifier::from_config(&config);
    let app = create_app(state, verifier, &config.cors_allowed_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
