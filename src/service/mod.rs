//! Service layer: lifecycle orchestration over the domain store.

pub mod sos_service;

pub use sos_service::{CreateSosInput, SosService};
