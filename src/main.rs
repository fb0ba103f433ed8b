use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;
use chirpy::configuration::get_configuration;
use chirpy::startup::run;
use chirpy::store::{AuthStore, MemoryStore, PgStore};
use chirpy::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let store: Arc<dyn AuthStore> = if configuration.database.in_memory {
        tracing::warn!("Using in-memory store; data is lost on restart");
        Arc::new(MemoryStore::new())
    } else {
        tracing::info!("Attempting to connect to database");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&configuration.database.connection_string())
            .await
            .map_err(|e| {
                tracing::error!("Failed to create connection pool: {}", e);
                std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "Database connection error",
                )
            })?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
            })?;

        tracing::info!("Database connection pool created successfully");
        Arc::new(PgStore::new(pool))
    };

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(
        listener,
        store,
        &configuration.auth,
        configuration.application.platform,
    )?
    .await
}
