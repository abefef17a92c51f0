use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use boxoffice_server::config::{Config, StorageBackend};
use boxoffice_server::gateways::{http_client, EsewaGateway, PaypalGateway};
use boxoffice_server::pages::Pages;
use boxoffice_server::routes::{create_routes, AppState};
use boxoffice_server::services::QrIssuer;
use boxoffice_server::store::{MemoryRepository, PgRepository, Repository};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = Config::from_env().expect("Invalid configuration");

    let repo: Arc<dyn Repository> = match config.storage {
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(&config.database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Successfully connected to database");

            sqlx::migrate!()
                .run(&pool)
                .await
                .expect("Failed to run migrations");
            tracing::info!("Migrations run successfully");

            Arc::new(PgRepository::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store, data is lost on restart");
            Arc::new(MemoryRepository::new())
        }
    };

    let client = http_client(config.gateway_timeout).expect("Failed to build HTTP client");
    let state = AppState::new(
        repo,
        QrIssuer::new(config.qr_secret.clone()),
        EsewaGateway::new(client.clone(), config.esewa.clone()),
        PaypalGateway::new(client, config.paypal.clone()),
        Pages::new().expect("Failed to load page templates"),
    );

    let app = create_routes(state, config.production, &config.cors_allowed_origins);

    tracing::info!(addr = %config.bind_addr, "Server running");
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
