pub mod admin;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // ── Admin surface (spec §6) ─────────────────────────────────────────
        .route("/api/v1/jobs", post(admin::create_job))
        .route("/api/v1/jobs/:job_id", get(admin::get_job))
        .route("/api/v1/jobs/:job_id/jd", post(admin::enqueue_jd))
        .route("/api/v1/jobs/:job_id/resumes", post(admin::enqueue_resumes))
        .route("/api/v1/jobs/:job_id/rank", post(admin::enqueue_rank))
        .route("/api/v1/jobs/:job_id/cancel", post(admin::cancel_job))
        .route("/api/v1/jobs/:job_id/scores", get(admin::get_scores))
        .route("/api/v1/jobs/:job_id/progress", get(admin::subscribe_progress))
        .with_state(state)
}
