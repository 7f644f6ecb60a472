//! Story generation endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::types::{StoryOutcome, StoryRequest};
use crate::AppState;

/// POST /generate
///
/// The pipeline runs on its own task so a disconnecting client does not
/// cancel it; artifacts are still produced.
pub async fn generate_story(
    State(state): State<AppState>,
    payload: Result<Json<StoryRequest>, JsonRejection>,
) -> ApiResult<Json<StoryOutcome>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    request.validate().map_err(ApiError::BadRequest)?;

    info!(
        topic = %request.topic,
        style = %request.style,
        lang = ?request.lang,
        voice = ?request.voice,
        "Story requested"
    );

    let pipeline = state.pipeline.clone();
    let result = tokio::spawn(async move { pipeline.run(&request).await })
        .await
        .map_err(|e| ApiError::Internal(format!("Pipeline task failed: {}", e)))?;

    match result {
        Ok(outcome) => Ok(Json(outcome)),
        Err(error) => {
            warn!(error = %error, "Story generation failed");
            *state.last_error.write().await = Some(error.to_string());
            Err(ApiError::pipeline(error, state.config.error_status))
        }
    }
}

pub fn generate_routes() -> Router<AppState> {
    Router::new().route("/generate", post(generate_story))
}
