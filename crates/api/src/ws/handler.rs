use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::task::JoinHandle;

use tabula_core::events::{ClientFrame, WireEvent};

use crate::state::AppState;
use crate::ws::manager::WsSender;

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered with `WsManager` and
/// managed by two spawned tasks (sender + receiver).
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `WsManager`.
///   2. Spawns a sender task that forwards messages from the manager channel.
///   3. Processes inbound frames on the current task; the only recognized
///      frame is `join_task_room`, which may be sent any number of times
///      for any number of jobs.
///   4. Cleans up (connection entry plus room forwarders) on disconnect.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    // Register and get the receiver for outbound messages.
    let mut rx = state.ws_manager.add(conn_id.clone()).await;
    let sender = outbound_sender(&state, &conn_id).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // One forwarder task per joined room.
    let mut room_tasks: Vec<JoinHandle<()>> = Vec::new();

    // Receiver loop: process inbound frames.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(ClientFrame::JoinTaskRoom { task_id }) => {
                    if let Some(sender) = &sender {
                        let task =
                            join_task_room(&state, sender.clone(), &conn_id, &task_id).await;
                        room_tasks.push(task);
                    }
                }
                Err(e) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "Ignoring unrecognized frame");
                }
            },
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: remove connection and abort the helper tasks.
    state.ws_manager.remove(&conn_id).await;
    for task in room_tasks {
        task.abort();
    }
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

/// Join one job room on behalf of this connection.
///
/// Subscribes first, then sends the late-join snapshot (current progress,
/// or a synthesized completion for a terminal job) to this connection
/// only, then forwards the room's events until it closes. No
/// acknowledgement frame is sent.
async fn join_task_room(
    state: &AppState,
    sender: WsSender,
    conn_id: &str,
    task_id: &str,
) -> JoinHandle<()> {
    tracing::debug!(conn_id = %conn_id, %task_id, "Joining task room");

    // Subscribe before snapshotting so no event falls in the gap.
    let mut subscription = state.hub.subscribe(task_id).await;

    if let Some(snapshot) = state.registry.snapshot(task_id).await {
        send_event(&sender, &snapshot.to_wire_event(task_id));
    }

    let task_id = task_id.to_string();
    tokio::spawn(async move {
        while let Some(event) = subscription.recv().await {
            if !send_event(&sender, &event) {
                break;
            }
        }
        tracing::debug!(%task_id, "Task room stream ended");
    })
}

/// Serialize an event and push it down a connection's outbound channel.
/// Returns false once the connection is gone.
fn send_event(sender: &WsSender, event: &WireEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => sender.send(Message::Text(json.into())).is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize event");
            true
        }
    }
}

/// Clone of the connection's outbound sender, for room forwarders.
async fn outbound_sender(state: &AppState, conn_id: &str) -> Option<WsSender> {
    state.ws_manager.sender(conn_id).await
}
