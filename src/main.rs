//! sos-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use sos_gateway::api;
use sos_gateway::app_state::AppState;
use sos_gateway::auth::AuthVerifier;
use sos_gateway::config::GatewayConfig;
use sos_gateway::domain::{EventBus, SosStore};
use sos_gateway::persistence::PostgresPersistence;
use sos_gateway::presence::PresenceRegistry;
use sos_gateway::service::SosService;
use sos_gateway::ws::FanoutRouter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting sos-gateway");

    let auth = AuthVerifier::new(config.jwt_secret.clone(), config.jwt_expiry_secs)?;

    // Build domain layer
    let store = Arc::new(SosStore::new());
    let event_bus = EventBus::new(config.event_bus_capacity);
    let presence = Arc::new(PresenceRegistry::new());

    // Build service layer; persistence is optional and best-effort.
    let mut sos_service = SosService::new(Arc::clone(&store), event_bus.clone());
    if config.persistence_enabled {
        match PostgresPersistence::connect(
            &config.database_url,
            config.database_max_connections,
            config.database_connect_timeout_secs,
        )
        .await
        {
            Ok(persistence) => {
                tracing::info!("postgres audit mirror enabled");
                sos_service = sos_service.with_persistence(Arc::new(persistence));
            }
            Err(e) => {
                tracing::warn!(error = %e, "postgres unavailable, running without persistence");
            }
        }
    }
    let sos_service = Arc::new(sos_service);

    // Start the event fan-out loop
    let fanout_handle = FanoutRouter::new(Arc::clone(&presence)).spawn(&event_bus);

    // Build application state
    let app_state = AppState {
        sos_service,
        event_bus,
        presence,
        auth,
    };

    // Build router
    let app = api::build_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    fanout_handle.abort();
    Ok(())
}
