use crate::dates::local_today;
use crate::errors::AppError;
use crate::models::{
    AnalysisQuery, AnalysisResponse, CreateTemplateRequest, DailyTemplate, DailyToggleRequest,
    DailyToggleResponse, OkResponse, PeriodAddRequest, PeriodHabit, PeriodItemRequest, PeriodKind,
    PeriodToggleResponse, Snapshot,
};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

pub async fn get_data(State(state): State<AppState>) -> Json<Snapshot> {
    let data = state.data.lock().await;
    Json(data.snapshot())
}

pub async fn add_daily_template(
    State(state): State<AppState>,
    Json(payload): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<DailyTemplate>), AppError> {
    let template = state
        .write(|data| data.add_template(&payload.name, payload.start_date, local_today()))
        .await?;

    info!(id = template.id, "created daily template");
    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn delete_daily_template(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OkResponse>, AppError> {
    state
        .write(|data| {
            data.end_template(id, local_today());
            Ok(())
        })
        .await?;

    info!(id, "ended daily template");
    Ok(Json(OkResponse { ok: true }))
}

pub async fn toggle_daily(
    State(state): State<AppState>,
    Json(payload): Json<DailyToggleRequest>,
) -> Result<Json<DailyToggleResponse>, AppError> {
    let completed = state
        .write(|data| data.toggle_daily(&payload.date_key, payload.template_id))
        .await?;

    Ok(Json(DailyToggleResponse {
        date_key: payload.date_key,
        template_id: payload.template_id,
        completed,
    }))
}

fn period_kind(raw: &str) -> Result<PeriodKind, AppError> {
    raw.parse().map_err(|_| AppError::bad_request("Invalid period"))
}

pub async fn add_period_habit(
    State(state): State<AppState>,
    Path(period): Path<String>,
    Json(payload): Json<PeriodAddRequest>,
) -> Result<(StatusCode, Json<PeriodHabit>), AppError> {
    let kind = period_kind(&period)?;
    let habit = state
        .write(|data| data.add_period(kind, &payload.key, &payload.name))
        .await?;

    info!(id = habit.id, %kind, key = %payload.key, "created habit");
    Ok((StatusCode::CREATED, Json(habit)))
}

pub async fn toggle_period_habit(
    State(state): State<AppState>,
    Path(period): Path<String>,
    Json(payload): Json<PeriodItemRequest>,
) -> Result<Json<PeriodToggleResponse>, AppError> {
    let kind = period_kind(&period)?;
    let habit = state
        .write(|data| data.toggle_period(kind, &payload.key, payload.id))
        .await?;

    Ok(Json(PeriodToggleResponse { ok: true, habit }))
}

pub async fn delete_period_habit(
    State(state): State<AppState>,
    Path(period): Path<String>,
    Json(payload): Json<PeriodItemRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let kind = period_kind(&period)?;
    state
        .write(|data| {
            data.delete_period(kind, payload.id);
            Ok(())
        })
        .await?;

    info!(id = payload.id, %kind, "deleted habit");
    Ok(Json(OkResponse { ok: true }))
}

pub async fn analysis(
    State(state): State<AppState>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let scope = query.scope.as_deref().unwrap_or("daily");
    let year = query.year.as_deref().filter(|year| !year.is_empty());
    let data = state.data.lock().await;
    Ok(Json(data.analysis(scope, year)?))
}
