use std::net::SocketAddr;

use axum::Router;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use pokerclub_server::config::{Config, StoreBackend};
use pokerclub_server::ledger::LedgerService;
use pokerclub_server::models::{MemberRole, User};
use pokerclub_server::routes::create_routes;
use pokerclub_server::state::AppState;
use pokerclub_server::store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pokerclub_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(backend = %config.store_backend, "Starting pokerclub server");

    let app = match config.store_backend {
        StoreBackend::Postgres => {
            let store = PgStore::connect(&config.database_url, config.max_connections)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Successfully connected to database");

            store.migrate().await.expect("Failed to run migrations");
            tracing::info!("Migrations run successfully");

            build_app(store, &config)
        }
        StoreBackend::Memory => {
            let store = MemoryStore::new();
            let admin = User::new("Club Admin", "admin@localhost", MemberRole::Admin);
            store
                .create_user(&admin)
                .await
                .expect("Failed to seed admin user");
            tracing::warn!(admin_id = %admin.id, "In-memory store: data is lost on shutdown");

            build_app(store, &config)
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");
}

fn build_app<S: Store>(store: S, config: &Config) -> Router {
    let ledger = LedgerService::new(store, config.voucher_validity());
    create_routes(AppState::new(ledger), config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        tracing::info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
