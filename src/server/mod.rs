pub mod interactions;
pub mod signature;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::error::AppResult;
use interactions::{Interaction, InteractionReply, route_interaction, run_deferred};
use signature::{InteractionVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};

const HEALTH_ENDPOINT: &str = "/";
const INTERACTIONS_ENDPOINT: &str = "/interactions";
const TRANSCRIPTS_PATH: &str = "/transcripts";

pub struct ServerState {
    pub ctx: AppContext,
    pub verifier: InteractionVerifier,
}

pub fn build_router(state: Arc<ServerState>, transcript_dir: PathBuf) -> Router {
    Router::new()
        .route(HEALTH_ENDPOINT, get(handle_health))
        .route(INTERACTIONS_ENDPOINT, post(handle_interaction))
        .nest_service(TRANSCRIPTS_PATH, ServeDir::new(transcript_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves interactions and transcripts until ctrl-c.
pub async fn run_server(
    state: Arc<ServerState>,
    transcript_dir: PathBuf,
    port: u16,
) -> AppResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        transcripts = %transcript_dir.display(),
        "interaction server listening"
    );

    axum::serve(listener, build_router(state, transcript_dir))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

async fn handle_health(State(state): State<Arc<ServerState>>) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "open_tickets": state.ctx.tickets.open_tickets().len(),
        })),
    )
        .into_response()
}

async fn handle_interaction(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let timestamp = header_str(&headers, TIMESTAMP_HEADER);
    let signature = header_str(&headers, SIGNATURE_HEADER);
    if let Err(err) = state.verifier.verify(timestamp, signature, &body) {
        tracing::debug!(error = %err, "rejected interaction");
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(interaction) => interaction,
        Err(err) => {
            tracing::warn!(error = %err, "malformed interaction payload");
            return (StatusCode::BAD_REQUEST, "malformed interaction").into_response();
        }
    };

    let reply = match route_interaction(&state.ctx, &interaction) {
        Ok(routed) => {
            if let Some((token, action)) = routed.deferred {
                let ctx = state.ctx.clone();
                tokio::spawn(async move {
                    run_deferred(&ctx, &token, action).await;
                });
            }
            routed.reply
        }
        Err(err) => {
            tracing::debug!(interaction_id = %interaction.id, error = %err, "interaction refused");
            InteractionReply::ephemeral(err.user_message())
        }
    };

    Json(reply.to_json()).into_response()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}
