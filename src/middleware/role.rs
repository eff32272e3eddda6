//! Role-based authorization middleware.
//!
//! The timetable router needs one guard: mutating routes are for staff
//! (admins and teachers). Finer-grained ownership checks (own entry, own
//! override) live in the service layer where the entry is loaded anyway.

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use slateboard_core::AppError;
use slateboard_models::users::UserRole;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Middleware that checks the authenticated user has one of the allowed
/// roles.
pub async fn require_roles(
    State(state): State<AppState>,
    req: Request,
    next: Next,
    allowed_roles: Vec<UserRole>,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await?;

    if !allowed_roles.contains(&auth_user.role()) {
        return Err(AppError::forbidden(format!(
            "Access denied. Required roles: {:?}, but user has role: {:?}",
            allowed_roles,
            auth_user.role()
        )));
    }

    let req = Request::from_parts(parts, body);
    Ok(next.run(req).await)
}

/// Guard for schedule-mutating routes: admins and teachers only.
pub async fn require_staff(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match require_roles(
        State(state),
        req,
        next,
        vec![UserRole::Admin, UserRole::Teacher],
    )
    .await
    {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}
