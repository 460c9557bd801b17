//! Domain layer: core types, SOS store, and event system.
//!
//! This module contains the server-side domain model: request identity,
//! geographic points and distance math, the SOS record with its status
//! machine, the event bus for broadcasting lifecycle changes, and the
//! concurrent store with its pending-request spatial index.

pub mod event_bus;
pub mod geo;
pub mod sos_event;
pub mod sos_id;
pub mod sos_request;
pub mod sos_store;

pub use event_bus::EventBus;
pub use geo::GeoPoint;
pub use sos_event::{ActorRef, SosEvent};
pub use sos_id::SosId;
pub use sos_request::{SosRequest, SosStatus, SosType};
pub use sos_store::{DEFAULT_NEARBY_LIMIT, SosStore};
