use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tokio::{signal, sync::mpsc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use packsync_api as api;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    let timeout = Duration::from_secs(cfg.http_timeout_secs);

    // External collaborators
    let inventory: Arc<dyn api::clients::inventory::InventoryApi> =
        Arc::new(api::clients::inventory::HttpInventoryClient::new(
            cfg.inventory_api_url.clone(),
            cfg.inventory_api_token.clone(),
            timeout,
        )?);
    let history: Option<Arc<dyn api::clients::documents::GroupHistoryStore>> =
        match &cfg.document_store_url {
            Some(url) => Some(Arc::new(api::clients::documents::HttpDocumentStoreClient::new(
                url.clone(),
                timeout,
            )?)),
            None => {
                info!("document store not configured; sessions baseline from live values");
                None
            }
        };
    let scratch: Arc<dyn api::clients::scratch::ScratchStore> =
        Arc::new(api::clients::scratch::InMemoryScratchStore::new());

    // Init events
    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(event_rx));

    // Build services
    let submission = Arc::new(api::services::submission::SubmissionMergeService::new(
        inventory,
    ));
    let sessions = Arc::new(api::services::session::EditSessionService::new(
        history,
        scratch,
        submission,
        event_sender.clone(),
        cfg.price_steps(),
    ));

    let state = api::AppState {
        config: cfg.clone(),
        event_sender,
        services: api::handlers::AppServices::new(sessions),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = api::app_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = cfg.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "packsync-api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install shutdown handler");
        return;
    }
    info!("shutdown signal received");
}
