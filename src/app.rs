use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/data", get(handlers::get_data))
        .route("/api/daily/template", post(handlers::add_daily_template))
        .route("/api/daily/template/:id", delete(handlers::delete_daily_template))
        .route("/api/daily/toggle", post(handlers::toggle_daily))
        .route("/api/analysis", get(handlers::analysis))
        .route("/api/:period/add", post(handlers::add_period_habit))
        .route("/api/:period/toggle", post(handlers::toggle_period_habit))
        .route("/api/:period/delete", post(handlers::delete_period_habit))
        .with_state(state)
}
