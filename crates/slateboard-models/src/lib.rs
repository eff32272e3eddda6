//! # Slateboard Models
//!
//! Domain models and DTOs for the Slateboard API.
//!
//! - [`ids`]: strongly-typed ID newtypes over `Uuid`
//! - [`users`]: user reference data, roles, and the [`users::Actor`]
//!   caller context
//! - [`timetable`]: recurring weekly entries, their DTOs and views
//! - [`changes`]: single-date overrides layered on an entry

pub mod changes;
pub mod ids;
pub mod timetable;
pub mod users;

// Re-export commonly used types at crate root for convenience
pub use ids::{
    AcademicYearId, AssignmentId, ChangeId, GradeId, MediumId, SubjectId, TimetableId, UserId,
};

pub use users::{Actor, TeacherSummary, User, UserRole, UserStatus};

pub use timetable::{
    AvailabilityQuery, ConflictQuery, ConflictReport, CreateTimetableDto, DaySchedule, GradeBrief,
    MediumBrief, PaginatedTimetablesResponse, SubjectBrief, Timetable, TimetableFilterParams,
    TimetableResponse, TimetableRow, UpdateTimetableDto, UserBrief, WeekScheduleResponse,
};

pub use changes::{
    ChangeDetail, ChangeRow, ChangeType, CreateChangeDto, TimetableChange, TimetableChangeResponse,
};
