use lms_gate::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresUserStore, UserStoreState},
    session::{JwtSessionProvider, SessionProviderState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initialises logging, connects the profile store and
/// serves the gated router.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lms_gate=debug,tower_http=info,axum=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);
    tracing::info!(
        login = %config.gate.login_path,
        dashboard = %config.gate.dashboard_path,
        timeout_ms = config.gate.lookup_timeout.as_millis() as u64,
        retries = config.gate.lookup_retries,
        "access gate policy"
    );

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let store = Arc::new(PostgresUserStore::new(pool)) as UserStoreState;
    let sessions = Arc::new(JwtSessionProvider::from_config(&config)) as SessionProviderState;

    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState {
        store,
        sessions,
        config,
    });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: Failed to bind {bind_addr}: {e}"));

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("Admin API docs at {}", lms_gate::SWAGGER_UI_PATH);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly");
}
