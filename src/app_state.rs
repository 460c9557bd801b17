//! Shared application state for Axum handlers.

use std::sync::Arc;

use crate::auth::AuthVerifier;
use crate::domain::EventBus;
use crate::presence::PresenceRegistry;
use crate::service::SosService;

/// Application state shared across all HTTP and WebSocket handlers.
///
/// Cheap to clone: every field is an `Arc` or an `Arc`-backed handle.
#[derive(Debug, Clone)]
pub struct AppState {
    /// SOS lifecycle service.
    pub sos_service: Arc<SosService>,
    /// Broadcast bus for lifecycle events.
    pub event_bus: EventBus,
    /// Directory of open real-time channels.
    pub presence: Arc<PresenceRegistry>,
    /// Bearer token verifier.
    pub auth: AuthVerifier,
}
