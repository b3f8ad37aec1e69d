use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use checkin_server::auth::AdminAuth;
use checkin_server::config::Config;
use checkin_server::mailer::{LogMailer, Mailer, SmtpMailer};
use checkin_server::routes::create_routes;
use checkin_server::state::AppState;
use checkin_server::store::Repositories;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("checkin_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env().context("Invalid configuration")?;

    let repos = match &config.database.url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(database_url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Successfully connected to database");

            sqlx::migrate!()
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Migrations run successfully");

            Repositories::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on exit");
            Repositories::in_memory()
        }
    };

    let mailer: Arc<dyn Mailer> = match &config.mail {
        Some(mail) => Arc::new(SmtpMailer::new(mail).context("Invalid SMTP configuration")?),
        None => {
            tracing::info!("Mail: SMTP_HOST not set, confirmation emails are logged only");
            Arc::new(LogMailer)
        }
    };

    let auth = AdminAuth::from_config(&config.auth).context("Failed to load admin users")?;
    let state = Arc::new(AppState::new(repos, auth, mailer));
    let app = create_routes(state, &config);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
