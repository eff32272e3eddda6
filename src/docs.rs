use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::timetable::controller::ErrorResponse;
use crate::modules::timetable::model::{
    AvailabilityQuery, ChangeDetail, ChangeType, ConflictQuery, ConflictReport,
    CreateChangeDto, CreateTimetableDto, DaySchedule, GradeBrief, MediumBrief,
    PaginatedTimetablesResponse, SubjectBrief, TimetableChangeResponse, TimetableFilterParams,
    TimetableResponse, UpdateTimetableDto, UserBrief, WeekScheduleResponse,
};
use slateboard_core::{PaginationMeta, PaginationParams};
use slateboard_models::users::{TeacherSummary, UserRole};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::timetable::controller::create_timetable,
        crate::modules::timetable::controller::get_timetables,
        crate::modules::timetable::controller::get_conflicts,
        crate::modules::timetable::controller::get_available_teachers,
        crate::modules::timetable::controller::get_today_schedule,
        crate::modules::timetable::controller::get_week_schedule,
        crate::modules::timetable::controller::get_teacher_schedule,
        crate::modules::timetable::controller::get_timetable,
        crate::modules::timetable::controller::update_timetable,
        crate::modules::timetable::controller::delete_timetable,
        crate::modules::timetable::controller::create_change,
        crate::modules::timetable::controller::get_changes,
        crate::modules::timetable::controller::delete_change,
    ),
    components(
        schemas(
            TimetableResponse,
            CreateTimetableDto,
            UpdateTimetableDto,
            TimetableFilterParams,
            PaginatedTimetablesResponse,
            ConflictQuery,
            ConflictReport,
            AvailabilityQuery,
            DaySchedule,
            WeekScheduleResponse,
            ChangeType,
            ChangeDetail,
            CreateChangeDto,
            TimetableChangeResponse,
            UserBrief,
            GradeBrief,
            SubjectBrief,
            MediumBrief,
            TeacherSummary,
            UserRole,
            PaginationMeta,
            PaginationParams,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Timetable", description = "Recurring schedules, conflict checks, and single-date overrides")
    ),
    info(
        title = "Slateboard API",
        version = "0.1.0",
        description = "Timetable scheduling service built with Rust, Axum, and PostgreSQL.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
