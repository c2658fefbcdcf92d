// WebSocket transport: one connection, one bound identity, one table room.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::StreamExt;
use tokio::sync::broadcast;
use tonk_shared::{ClientMsg, ServerMsg};

use super::state::AppState;
use super::table;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    // The connection starts unbound: identity and room membership are
    // established by the first join (token verification happened upstream).
    let mut rx: Option<broadcast::Receiver<ServerMsg>> = None;
    let mut bound: Option<(String, String)> = None;

    loop {
        tokio::select! {
            biased;

            // Room broadcasts for the table this socket joined.
            incoming = recv_broadcast(&mut rx), if rx.is_some() => {
                match incoming {
                    Ok(sm) => {
                        if should_forward(&sm, bound.as_ref()) {
                            send_ws(&mut socket, &sm).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "socket lagged behind table broadcasts");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            // Client events.
            msg = socket.next() => {
                match msg {
                    Some(Ok(Message::Text(txt))) => {
                        let Ok(cm) = serde_json::from_str::<ClientMsg>(&txt) else {
                            tracing::warn!("failed to parse incoming ClientMsg JSON");
                            tracing::debug!(raw_in = %txt);
                            send_ws(
                                &mut socket,
                                &ServerMsg::GameError { message: "malformed message".to_owned() },
                            )
                            .await;
                            continue;
                        };

                        let subscribe_to = match &cm {
                            ClientMsg::JoinTable { table_id, .. }
                            | ClientMsg::RequestInitialGameState { table_id } => {
                                Some(table_id.clone())
                            }
                            _ => None,
                        };
                        let bind_to = match &cm {
                            ClientMsg::JoinTable { table_id, user_id, .. } => {
                                Some((table_id.clone(), user_id.clone()))
                            }
                            _ => None,
                        };
                        let unbind = matches!(&cm, ClientMsg::LeaveTable { user_id, .. }
                            if bound.as_ref().is_some_and(|(_, u)| u == user_id));

                        let resp = table::handle_client_msg(&state, cm).await;
                        let failed = matches!(resp, ServerMsg::GameError { .. });
                        if !failed {
                            if let Some(table_id) = subscribe_to {
                                rx = state.subscribe(&table_id).await;
                            }
                            if let Some(identity) = bind_to {
                                bound = Some(identity);
                            }
                            if unbind {
                                bound = None;
                                rx = None;
                            }
                        }
                        send_ws(&mut socket, &resp).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }

    // A vanished socket behaves like an explicit leave.
    if let Some((table_id, user_id)) = bound {
        tracing::info!(table = %table_id, user = %user_id, "client disconnected; leaving table");
        let _ = table::handle_client_msg(
            &state,
            ClientMsg::LeaveTable {
                table_id,
                user_id: user_id.clone(),
                username: user_id,
            },
        )
        .await;
    }
}

async fn recv_broadcast(
    rx: &mut Option<broadcast::Receiver<ServerMsg>>,
) -> Result<ServerMsg, broadcast::error::RecvError> {
    match rx.as_mut() {
        Some(rx) => rx.recv().await,
        // Unreachable: the select arm is guarded on rx.is_some().
        None => std::future::pending().await,
    }
}

/// Targeted messages only reach the connection bound to that user; all other
/// room traffic is forwarded as-is.
fn should_forward(msg: &ServerMsg, bound: Option<&(String, String)>) -> bool {
    match msg {
        ServerMsg::WalletBalanceUpdate { user_id, .. } => {
            bound.is_some_and(|(_, bound_user)| bound_user == user_id)
        }
        _ => true,
    }
}

async fn send_ws(socket: &mut WebSocket, msg: &ServerMsg) {
    match serde_json::to_string(msg) {
        Ok(txt) => {
            let _ = socket.send(Message::Text(txt.into())).await;
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize ServerMsg for websocket send");
        }
    }
}
