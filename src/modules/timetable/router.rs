use crate::middleware::role::require_staff;
use crate::modules::timetable::controller::{
    create_change, create_timetable, delete_change, delete_timetable, get_available_teachers,
    get_changes, get_conflicts, get_teacher_schedule, get_timetable, get_timetables,
    get_today_schedule, get_week_schedule, update_timetable,
};
use crate::state::AppState;
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};

/// Routes with literal segments are registered before `/{id}` so the
/// matcher never treats them as entry IDs.
pub fn init_timetable_router(state: AppState) -> Router<AppState> {
    let staff_only = Router::new()
        .route("/", post(create_timetable))
        .route("/changes", post(create_change))
        .route("/changes/{change_id}", delete(delete_change))
        .route("/teacher/{teacher_id}", get(get_teacher_schedule))
        .route("/{id}", put(update_timetable).delete(delete_timetable))
        .route_layer(from_fn_with_state(state, require_staff));

    Router::new()
        .route("/", get(get_timetables))
        .route("/conflicts", get(get_conflicts))
        .route("/available-teachers", get(get_available_teachers))
        .route("/today", get(get_today_schedule))
        .route("/week", get(get_week_schedule))
        .route("/{id}", get(get_timetable))
        .route("/{id}/changes", get(get_changes))
        .merge(staff_only)
}
