//! # sos-gateway
//!
//! Real-time coordination core for an emergency-response platform. The
//! service owns the SOS request lifecycle (`Pending -> InProgress ->
//! Resolved/Cancelled`), matches pending requests to nearby volunteers,
//! and pushes lifecycle events to connected clients over WebSocket.
//! Identity and accounts live elsewhere; this crate only verifies the
//! platform's bearer tokens.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler + Connection Loop (ws/)
//!     │
//!     ├── SosService (service/)       lifecycle engine
//!     ├── EventBus (domain/)          broadcast of lifecycle events
//!     ├── FanoutRouter (ws/)          event -> recipient groups
//!     ├── PresenceRegistry (presence/) open channels, ephemeral
//!     │
//!     ├── SosStore (domain/)          records + pending spatial index
//!     └── PostgreSQL Persistence      optional audit mirror
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod presence;
pub mod service;
pub mod ws;
