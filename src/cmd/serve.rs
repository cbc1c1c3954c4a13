use std::sync::Arc;

use crate::cmd::build_context;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::server::signature::InteractionVerifier;
use crate::server::{ServerState, run_server};

pub async fn run(config: AppConfig) -> AppResult<()> {
    let public_key = config.public_key.as_deref().ok_or_else(|| {
        AppError::Configuration("DISCORD_PUBLIC_KEY not configured".to_string())
    })?;
    let verifier = InteractionVerifier::from_hex(public_key)?;
    if config.application_id.is_none() {
        tracing::warn!("DISCORD_APPLICATION_ID not configured; deferred replies cannot be edited");
    }

    let ctx = build_context(&config)?;
    let state = Arc::new(ServerState { ctx, verifier });
    run_server(state, config.transcript_dir.clone(), config.port).await
}
