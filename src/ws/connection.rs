//! Per-connection socket loop.
//!
//! Each accepted socket registers an outbound channel in the presence
//! registry, then runs two halves: a forward task draining the channel
//! into the socket, and a read loop handling client commands. Teardown
//! always unregisters, guarded so a stale close cannot remove a newer
//! connection of the same identity.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;

use super::messages::{WsCommand, WsMessage};
use crate::app_state::AppState;
use crate::auth::Identity;
use crate::domain::GeoPoint;
use crate::presence::ChannelHandle;

/// Runs the socket until either side closes it.
pub async fn handle_socket(socket: WebSocket, state: AppState, identity: Identity) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<String>();

    state.presence.register(&identity, frame_tx.clone()).await;
    tracing::info!(identity_id = %identity.id, role = %identity.role, "channel opened");

    let _ = frame_tx.send(
        WsMessage::response(json!({
            "kind": "connected",
            "identity_id": identity.id,
            "role": identity.role,
        }))
        .to_frame(),
    );

    // Forward half: pre-serialized frames from presence/fanout to the wire.
    let mut forward_task = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Read half: client commands until close.
    loop {
        tokio::select! {
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_command(&state, &identity, &frame_tx, text.as_str()).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            _ = &mut forward_task => break,
        }
    }

    forward_task.abort();
    unregister(&state, &identity, &frame_tx).await;
    tracing::info!(identity_id = %identity.id, "channel closed");
}

async fn handle_command(
    state: &AppState,
    identity: &Identity,
    frame_tx: &ChannelHandle,
    raw: &str,
) {
    let command = match serde_json::from_str::<WsCommand>(raw) {
        Ok(command) => command,
        Err(e) => {
            // Malformed frames are reported, not fatal.
            let _ = frame_tx.send(WsMessage::error(&format!("unrecognized command: {e}")).to_frame());
            return;
        }
    };

    match command {
        WsCommand::LocationUpdate {
            longitude,
            latitude,
        } => match GeoPoint::new(longitude, latitude) {
            Ok(point) => {
                state.presence.update_location(&identity.id, point).await;
                let _ = frame_tx
                    .send(WsMessage::response(json!({ "kind": "location_updated" })).to_frame());
            }
            Err(e) => {
                let _ = frame_tx.send(WsMessage::error(&e.to_string()).to_frame());
            }
        },
        WsCommand::Register => {
            let _ = frame_tx.send(
                WsMessage::response(json!({
                    "kind": "registered",
                    "identity_id": identity.id,
                    "role": identity.role,
                }))
                .to_frame(),
            );
        }
        WsCommand::Ping => {
            let _ = frame_tx.send(WsMessage::response(json!({ "kind": "pong" })).to_frame());
        }
    }
}

async fn unregister(state: &AppState, identity: &Identity, frame_tx: &ChannelHandle) {
    state
        .presence
        .unregister_channel(&identity.id, frame_tx)
        .await;
}
