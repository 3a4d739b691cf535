use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tandem::config::{LoggingSettings, Settings};
use tandem::core::{Catalog, Dispatcher, Maintenance};
use tandem::routes::{self, admin::AppState};
use tandem::services::{EvaluationLedger, MemoryStore, PostgresClient, ProfileStore, TelegramClient};
use tandem::worker;

fn init_logging(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    match logging.format.as_str() {
        "json" => subscriber.json().init(),
        "pretty" => subscriber.pretty().init(),
        _ => subscriber.compact().init(),
    }
}

async fn open_store(settings: &Settings) -> std::io::Result<(Arc<dyn ProfileStore>, Arc<dyn EvaluationLedger>)> {
    if settings.database.is_memory() {
        warn!("Using the in-memory store, nothing will be persisted");
        let store = Arc::new(MemoryStore::new());
        return Ok((store.clone(), store));
    }

    let db = &settings.database;
    let postgres = PostgresClient::from_settings(
        &db.url,
        db.max_connections,
        db.min_connections,
        db.acquire_timeout_secs,
        db.idle_timeout_secs,
    )
    .await
    .map_err(|e| {
        error!("Failed to connect to PostgreSQL: {}", e);
        std::io::Error::other(e)
    })?;

    info!("PostgreSQL client initialized (max: {} connections)", db.max_connections.unwrap_or(10));

    let postgres = Arc::new(postgres);
    Ok((postgres.clone(), postgres))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(e)
    })?;

    init_logging(&settings.logging);
    info!("Starting Tandem bot...");

    let (profiles, ledger) = open_store(&settings).await?;

    let telegram = TelegramClient::new(
        &settings.telegram.api_url,
        &settings.telegram.token,
        Duration::from_secs(settings.telegram.request_timeout_secs),
    )
    .map_err(|e| {
        error!("Failed to create Telegram client: {}", e);
        std::io::Error::other(e)
    })?;

    let service_name = match telegram.get_me().await {
        Ok(name) => {
            info!("Authorised on account {}", name);
            name
        }
        Err(e) => {
            warn!("Could not fetch bot account ({}), using configured name", e);
            settings.telegram.bot_name.clone()
        }
    };

    let catalog = Arc::new(Catalog::new(service_name));
    let dispatcher = Dispatcher::new(profiles.clone(), ledger.clone(), catalog);

    let server_handle = if settings.server.enabled {
        let app_state = AppState {
            maintenance: Arc::new(Maintenance::new(profiles, ledger)),
        };
        let host = settings.server.host.clone();
        let port = settings.server.port;

        info!("Starting admin HTTP server on {}:{}", host, port);

        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(app_state.clone()))
                .wrap(middleware::Logger::default())
                .configure(routes::configure_routes)
        })
        .workers(settings.server.workers.unwrap_or(1))
        .bind((host, port))?
        .run();

        let handle = server.handle();
        actix_web::rt::spawn(server);
        Some(handle)
    } else {
        None
    };

    worker::run(&telegram, &dispatcher, settings.telegram.poll_timeout_secs).await;

    if let Some(handle) = server_handle {
        handle.stop(true).await;
    }

    info!("Stopped");
    Ok(())
}
