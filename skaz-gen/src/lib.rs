//! skaz-gen library interface
//!
//! Topic in, narrated story out: facts are gathered from public knowledge
//! sources, a local language model writes a plan and then the story, the
//! story is optionally translated, saved as Markdown and synthesized to audio.
//!
//! Exposes the router and pipeline for integration testing.

pub mod api;
pub mod error;
pub mod facts;
pub mod localize;
pub mod narrative;
pub mod pipeline;
pub mod speech;
pub mod store;
pub mod types;

pub use crate::error::{ApiError, ApiResult};
pub use crate::pipeline::{PipelineError, StoryPipeline};
pub use crate::types::{StoryOutcome, StoryRequest};

use axum::Router;
use chrono::{DateTime, Utc};
use skaz_common::StoryConfig;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<StoryPipeline>,
    pub config: Arc<StoryConfig>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last pipeline failure, reported by /health
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(pipeline: StoryPipeline, config: StoryConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            config: Arc::new(config),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::generate_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
