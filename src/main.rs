use dotenvy::dotenv;
use exerly::{
    api::{self, AppState},
    config::{self, admins, database},
    core::messaging::MessageFeed,
    errors::Result,
    services::{ObjectStore, email::mailer_from_config, ocr::extractor_from_config},
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = config::load_app_configuration()?;
    info!("Successfully processed application configuration.");

    // 4. Initialize database and schema
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Build external services
    tokio::fs::create_dir_all(&app_config.storage.root).await?;
    let store = Arc::new(ObjectStore::new(&app_config.storage));
    let mailer = mailer_from_config(&app_config.email);
    let ocr = extractor_from_config(&app_config.ocr);
    let admin_user_id = admins::get_admin_user_id();
    if admin_user_id.is_none() {
        info!("ADMIN_USER_ID not set; enquiry copies to operations are disabled");
    }

    // 6. Serve the API until Ctrl-C
    let bind_addr = app_config.server.bind_addr.clone();
    let state = AppState {
        db,
        config: Arc::new(app_config),
        store,
        mailer,
        ocr,
        feed: MessageFeed::default(),
        admin_user_id,
    };
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", bind_addr, e))?;
    info!("Listening on {}", bind_addr);

    axum::serve(listener, api::build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
