//! Real-time layer: WebSocket endpoint, per-connection loop, wire
//! messages, and the event fan-out router.

pub mod connection;
pub mod fanout;
pub mod handler;
pub mod messages;

pub use fanout::FanoutRouter;
pub use handler::ws_handler;
pub use messages::{WsCommand, WsMessage, WsMessageType};
