use crate::middleware::auth::AuthUser;
use crate::modules::timetable::changes::ChangeService;
use crate::modules::timetable::model::{
    AvailabilityQuery, ConflictQuery, ConflictReport, CreateChangeDto, CreateTimetableDto,
    PaginatedTimetablesResponse, TimetableChangeResponse, TimetableFilterParams,
    TimetableResponse, UpdateTimetableDto, WeekScheduleResponse,
};
use crate::modules::timetable::service::TimetableService;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use slateboard_core::AppError;
use slateboard_models::ids::{ChangeId, TimetableId, UserId};
use slateboard_models::users::{TeacherSummary, UserRole};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Optional date and teacher scope for the day view. Teachers are always
/// scoped to their own schedule regardless of `teacher_id`.
#[derive(Debug, Deserialize, IntoParams)]
pub struct DayQuery {
    /// Defaults to the current date.
    pub date: Option<NaiveDate>,
    pub teacher_id: Option<UserId>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct WeekQuery {
    /// First day of the 7-day grid; defaults to the current date.
    pub start_date: Option<NaiveDate>,
    pub teacher_id: Option<UserId>,
}

fn teacher_scope(
    auth_user: &AuthUser,
    requested: Option<UserId>,
) -> Result<Option<UserId>, AppError> {
    match auth_user.role() {
        UserRole::Teacher => Ok(Some(auth_user.user_id()?)),
        _ => Ok(requested),
    }
}

#[utoipa::path(
    post,
    path = "/api/timetable",
    request_body = CreateTimetableDto,
    responses(
        (status = 200, description = "Timetable entry created", body = TimetableResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - staff only", body = ErrorResponse),
        (status = 409, description = "Schedule conflict", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state, dto))]
pub async fn create_timetable(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(dto): Json<CreateTimetableDto>,
) -> Result<Json<TimetableResponse>, AppError> {
    dto.validate()
        .map_err(|e| AppError::unprocessable(anyhow::anyhow!("Validation failed: {}", e)))?;

    let entry =
        TimetableService::create(&state.db, state.notifier.as_ref(), dto, auth_user.user_id()?)
            .await?;
    Ok(Json(entry))
}

#[utoipa::path(
    get,
    path = "/api/timetable",
    params(TimetableFilterParams),
    responses(
        (status = 200, description = "Filtered timetable entries", body = PaginatedTimetablesResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state))]
pub async fn get_timetables(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(filters): Query<TimetableFilterParams>,
) -> Result<Json<PaginatedTimetablesResponse>, AppError> {
    let entries = TimetableService::find_all(&state.db, filters).await?;
    Ok(Json(entries))
}

#[utoipa::path(
    get,
    path = "/api/timetable/conflicts",
    params(ConflictQuery),
    responses(
        (status = 200, description = "Conflicting entries for the proposed slot", body = [ConflictReport]),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state))]
pub async fn get_conflicts(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(query): Query<ConflictQuery>,
) -> Result<Json<Vec<ConflictReport>>, AppError> {
    let conflicts = TimetableService::find_conflicts(&state.db, query).await?;
    Ok(Json(conflicts))
}

#[utoipa::path(
    get,
    path = "/api/timetable/available-teachers",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Teachers free for the slot", body = [TeacherSummary]),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state))]
pub async fn get_available_teachers(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<TeacherSummary>>, AppError> {
    let teachers = TimetableService::find_available_teachers(&state.db, query).await?;
    Ok(Json(teachers))
}

#[utoipa::path(
    get,
    path = "/api/timetable/today",
    params(DayQuery),
    responses(
        (status = 200, description = "Entries for the date with that date's overrides", body = [TimetableResponse]),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state))]
pub async fn get_today_schedule(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<DayQuery>,
) -> Result<Json<Vec<TimetableResponse>>, AppError> {
    let on_date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let teacher_id = teacher_scope(&auth_user, query.teacher_id)?;

    let schedule = TimetableService::today_schedule(&state.db, on_date, teacher_id).await?;
    Ok(Json(schedule))
}

#[utoipa::path(
    get,
    path = "/api/timetable/week",
    params(WeekQuery),
    responses(
        (status = 200, description = "7-day schedule grid", body = WeekScheduleResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state))]
pub async fn get_week_schedule(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<WeekQuery>,
) -> Result<Json<WeekScheduleResponse>, AppError> {
    let start_date = query.start_date.unwrap_or_else(|| Utc::now().date_naive());
    let teacher_id = teacher_scope(&auth_user, query.teacher_id)?;

    let week = TimetableService::week_schedule(&state.db, start_date, teacher_id).await?;
    Ok(Json(week))
}

#[utoipa::path(
    get,
    path = "/api/timetable/teacher/{teacher_id}",
    params(
        ("teacher_id" = UserId, Path, description = "Teacher to fetch the schedule for"),
        DayQuery
    ),
    responses(
        (status = 200, description = "The teacher's schedule as valid today", body = [TimetableResponse]),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Teachers can only view their own schedule", body = ErrorResponse),
        (status = 404, description = "Teacher not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state))]
pub async fn get_teacher_schedule(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(teacher_id): Path<UserId>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Vec<TimetableResponse>>, AppError> {
    if auth_user.role() == UserRole::Teacher && teacher_id != auth_user.user_id()? {
        return Err(AppError::forbidden(
            "Teachers can only view their own schedule".to_string(),
        ));
    }

    let on_date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let schedule = TimetableService::teacher_schedule(&state.db, teacher_id, on_date).await?;
    Ok(Json(schedule))
}

#[utoipa::path(
    get,
    path = "/api/timetable/{id}",
    params(("id" = TimetableId, Path, description = "Timetable entry ID")),
    responses(
        (status = 200, description = "The entry with its override history", body = TimetableResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Entry not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state))]
pub async fn get_timetable(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<TimetableId>,
) -> Result<Json<TimetableResponse>, AppError> {
    let entry = TimetableService::find_one(&state.db, id).await?;
    Ok(Json(entry))
}

#[utoipa::path(
    put,
    path = "/api/timetable/{id}",
    params(("id" = TimetableId, Path, description = "Timetable entry ID")),
    request_body = UpdateTimetableDto,
    responses(
        (status = 200, description = "Updated entry", body = TimetableResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the owner, or attempted teacher change", body = ErrorResponse),
        (status = 404, description = "Entry not found", body = ErrorResponse),
        (status = 409, description = "Schedule conflict", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state, dto))]
pub async fn update_timetable(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<TimetableId>,
    Json(dto): Json<UpdateTimetableDto>,
) -> Result<Json<TimetableResponse>, AppError> {
    dto.validate()
        .map_err(|e| AppError::unprocessable(anyhow::anyhow!("Validation failed: {}", e)))?;

    let entry = TimetableService::update(
        &state.db,
        state.notifier.as_ref(),
        id,
        dto,
        auth_user.actor()?,
    )
    .await?;
    Ok(Json(entry))
}

#[utoipa::path(
    delete,
    path = "/api/timetable/{id}",
    params(("id" = TimetableId, Path, description = "Timetable entry ID")),
    responses(
        (status = 200, description = "Entry deleted", body = serde_json::Value),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Entry not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state))]
pub async fn delete_timetable(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<TimetableId>,
) -> Result<Json<serde_json::Value>, AppError> {
    TimetableService::remove(&state.db, state.notifier.as_ref(), id, auth_user.actor()?).await?;
    Ok(Json(
        serde_json::json!({ "message": "Timetable entry deleted" }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/timetable/changes",
    request_body = CreateChangeDto,
    responses(
        (status = 200, description = "Override recorded", body = TimetableChangeResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - staff only", body = ErrorResponse),
        (status = 404, description = "Entry not found", body = ErrorResponse),
        (status = 422, description = "Malformed change payload", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state, dto))]
pub async fn create_change(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(dto): Json<CreateChangeDto>,
) -> Result<Json<TimetableChangeResponse>, AppError> {
    let change =
        ChangeService::create_change(&state.db, state.notifier.as_ref(), dto, auth_user.user_id()?)
            .await?;
    Ok(Json(change))
}

#[utoipa::path(
    get,
    path = "/api/timetable/{id}/changes",
    params(("id" = TimetableId, Path, description = "Timetable entry ID")),
    responses(
        (status = 200, description = "Override history, newest first", body = [TimetableChangeResponse]),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state))]
pub async fn get_changes(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<TimetableId>,
) -> Result<Json<Vec<TimetableChangeResponse>>, AppError> {
    let changes = ChangeService::list_changes(&state.db, id).await?;
    Ok(Json(changes))
}

#[utoipa::path(
    delete,
    path = "/api/timetable/changes/{change_id}",
    params(("change_id" = ChangeId, Path, description = "Override ID")),
    responses(
        (status = 200, description = "Override deleted; the recurring slot is restored", body = serde_json::Value),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the creator", body = ErrorResponse),
        (status = 404, description = "Override not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
#[instrument(skip(state))]
pub async fn delete_change(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(change_id): Path<ChangeId>,
) -> Result<Json<serde_json::Value>, AppError> {
    ChangeService::remove_change(&state.db, change_id, auth_user.actor()?).await?;
    Ok(Json(
        serde_json::json!({ "message": "Timetable change deleted" }),
    ))
}
