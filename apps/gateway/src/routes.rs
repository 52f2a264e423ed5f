//! HTTP routes: synchronous and duplex ask.

use crate::{
    auth::Authenticator,
    error::GatewayError,
    gateway::Accepted,
    request::{AskPayload, PromptRequest, RequestError},
    state::AppState,
    ws,
};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

/// Synchronous ask reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    /// Model answer.
    pub response: String,
}

/// Build the axum router with every gateway endpoint.
pub fn router<A: Authenticator + 'static>(state: AppState<A>) -> Router {
    Router::new()
        .route("/api/v1/client/ask", post(ask::<A>))
        .route("/api/v1/client/ws_ask/{channel}", post(ws_ask::<A>))
        .route("/api/v1/ws/llm/{channel}", get(ws::ws_handler::<A>))
        .with_state(state)
}

async fn ask<A: Authenticator + 'static>(
    State(state): State<AppState<A>>,
    headers: HeaderMap,
    body: Result<Json<AskPayload>, JsonRejection>,
) -> Result<Json<AskResponse>, GatewayError> {
    authorize(&state, &headers).await?;
    let request = parse(body)?;
    tracing::debug!(
        "ask from {} for {}",
        request.caller_id(),
        request.purpose()
    );
    let response = state.gateway.ask(&request).await?;
    Ok(Json(AskResponse { response }))
}

async fn ws_ask<A: Authenticator + 'static>(
    State(state): State<AppState<A>>,
    Path(channel): Path<String>,
    headers: HeaderMap,
    body: Result<Json<AskPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Accepted>), GatewayError> {
    authorize(&state, &headers).await?;
    let request = parse(body)?;
    let accepted = state.gateway.duplex_ask(&channel, request)?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

async fn authorize<A: Authenticator>(
    state: &AppState<A>,
    headers: &HeaderMap,
) -> Result<(), GatewayError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or_default()
        .trim();
    match state.authenticator.authenticate(token).await {
        Ok(ctx) => {
            tracing::trace!("authenticated {}", ctx.identity);
            Ok(())
        }
        Err(e) => {
            tracing::warn!("rejected caller: {e}");
            Err(GatewayError::Unauthorized)
        }
    }
}

fn parse(body: Result<Json<AskPayload>, JsonRejection>) -> Result<PromptRequest, GatewayError> {
    let Json(payload) = body.map_err(|e| RequestError::Malformed(e.body_text()))?;
    Ok(PromptRequest::try_from(payload)?)
}
