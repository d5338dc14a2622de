use std::sync::Arc;

use deskserver::api_router::configure_api_routes;
use deskserver::config::AppConfig;
use deskserver::mailer::Mailer;
use deskserver::security::jwt::TokenService;
use deskserver::shared::state::AppState;
use deskserver::shared::utils::{create_conn, run_migrations};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let pool = create_conn(&config.database_url)?;
    run_migrations(&pool).map_err(|e| anyhow::anyhow!("failed to run migrations: {e}"))?;

    let args: Vec<String> = std::env::args().collect();
    if let Some(command) = args.get(1) {
        match command.as_str() {
            "seed" => {
                deskserver::seed::run(&pool)?;
                return Ok(());
            }
            "serve" => {}
            other => {
                eprintln!("Unknown command: {other}");
                eprintln!("Usage: deskserver [serve|seed]");
                std::process::exit(2);
            }
        }
    }

    if config.auth.jwt_secret == "dev_secret" {
        warn!("JWT_SECRET is using the built-in development default");
    }

    std::fs::create_dir_all(&config.upload.dir)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState {
        tokens: TokenService::new(&config.auth.jwt_secret, config.auth.jwt_expires_min),
        mailer: Mailer::new(config.smtp.clone()),
        conn: pool,
        config,
    });

    let app = configure_api_routes(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("deskserver listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
