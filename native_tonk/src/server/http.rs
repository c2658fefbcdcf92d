// HTTP mirror of the websocket events.
//
// A single POST endpoint accepts the same tagged `ClientMsg` payloads the
// websocket does and reuses the central handler, so the session logic stays
// transport-agnostic. Connection-scoped behaviour (room subscription,
// targeted pushes) only exists on the websocket side.

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use tonk_shared::{ClientMsg, ServerMsg};

use super::state::AppState;
use super::table;

/// Apply any client event over HTTP.
///
/// Body: `{ "type": "drawCard", "data": { ... } }`
pub async fn message_handler(
    State(state): State<AppState>,
    Json(cm): Json<ClientMsg>,
) -> impl IntoResponse {
    let resp = table::handle_client_msg(&state, cm).await;
    match resp {
        ServerMsg::GameError { .. } => (StatusCode::BAD_REQUEST, Json(resp)).into_response(),
        other => (StatusCode::OK, Json(other)).into_response(),
    }
}
