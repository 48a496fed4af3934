//! API server entry point.

use api::config::{Config, LogFormat};
use api::{SystemState, create_app, create_state};
use cart_store::{
    InMemoryCartRepository, InMemoryProductStore, PostgresCartRepository, PostgresProductStore,
};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let (json, pretty) = match config.log_format {
        LogFormat::Json => (Some(tracing_subscriber::fmt::layer().json()), None),
        LogFormat::Pretty => (None, Some(tracing_subscriber::fmt::layer())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .init();
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let system = SystemState {
        backend: config.backend(),
        metrics: metrics_handle,
    };

    // 3. Open the stores, seed the catalog and build the application
    let app = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await
                .expect("failed to connect to PostgreSQL");
            cart_store::run_migrations(&pool)
                .await
                .expect("failed to run migrations");
            tracing::info!(
                max_connections = config.database_max_connections,
                "connected to PostgreSQL"
            );

            let products = PostgresProductStore::new(pool.clone());
            if let Some(path) = &config.product_catalog {
                api::catalog::seed_catalog(&products, path)
                    .await
                    .expect("failed to seed product catalog");
            }
            create_app(create_state(PostgresCartRepository::new(pool), products), system)
        }
        None => {
            let products = InMemoryProductStore::new();
            if let Some(path) = &config.product_catalog {
                api::catalog::seed_catalog(&products, path)
                    .await
                    .expect("failed to seed product catalog");
            }
            create_app(create_state(InMemoryCartRepository::new(), products), system)
        }
    };

    // 4. Start server
    let addr = config.addr();
    tracing::info!(%addr, backend = config.backend(), "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
