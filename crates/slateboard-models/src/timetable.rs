//! Timetable entry models and DTOs.
//!
//! A [`Timetable`] row is a recurring weekly class slot: one teacher,
//! one subject, one grade and medium, a `[start_time, end_time)` window
//! on one day of the week, active between `valid_from` and `valid_until`
//! (inclusive calendar dates).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use slateboard_core::{PaginationMeta, PaginationParams, day_name};

use crate::changes::TimetableChangeResponse;
use crate::ids::{
    AcademicYearId, AssignmentId, GradeId, MediumId, SubjectId, TimetableId, UserId,
};

/// A recurring weekly timetable entry as stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Timetable {
    pub id: TimetableId,
    pub grade_id: GradeId,
    pub academic_year_id: AcademicYearId,
    pub term: i32,
    pub subject_id: SubjectId,
    pub medium_id: MediumId,
    pub teacher_id: UserId,
    pub teacher_assignment_id: AssignmentId,
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: i16,
    /// `HH:MM`, 24-hour.
    pub start_time: String,
    /// `HH:MM`, 24-hour, strictly after `start_time`.
    pub end_time: String,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub recurring: bool,
    /// Raw recurrence pattern; not interpreted by conflict logic.
    pub recurrence_pattern: Option<String>,
    /// Raw exclusion dates; not interpreted by conflict logic.
    pub exclude_dates: Option<Vec<NaiveDate>>,
    pub class_link: Option<String>,
    pub room_number: Option<String>,
    pub color: Option<String>,
    pub notes: Option<String>,
    pub active: bool,
    pub created_by: UserId,
    pub last_modified_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A timetable row joined with its reference data, as produced by the
/// list/detail queries.
#[derive(Debug, Clone, FromRow)]
pub struct TimetableRow {
    pub id: TimetableId,
    pub grade_id: GradeId,
    pub academic_year_id: AcademicYearId,
    pub term: i32,
    pub subject_id: SubjectId,
    pub medium_id: MediumId,
    pub teacher_id: UserId,
    pub teacher_assignment_id: AssignmentId,
    pub day_of_week: i16,
    pub start_time: String,
    pub end_time: String,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub recurring: bool,
    pub recurrence_pattern: Option<String>,
    pub exclude_dates: Option<Vec<NaiveDate>>,
    pub class_link: Option<String>,
    pub room_number: Option<String>,
    pub color: Option<String>,
    pub notes: Option<String>,
    pub active: bool,
    pub created_by: UserId,
    pub last_modified_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub teacher_first_name: String,
    pub teacher_last_name: String,
    pub teacher_email: String,
    pub grade_name: String,
    pub grade_level: i32,
    pub subject_name: String,
    pub subject_code: String,
    pub medium_name: String,
    pub academic_year: String,
}

/// Compact user representation embedded in responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserBrief {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GradeBrief {
    pub id: GradeId,
    pub name: String,
    pub level: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubjectBrief {
    pub id: SubjectId,
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MediumBrief {
    pub id: MediumId,
    pub name: String,
}

/// API representation of a timetable entry with its reference data and
/// any layered overrides.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TimetableResponse {
    pub id: TimetableId,
    pub grade: GradeBrief,
    pub academic_year: String,
    pub term: i32,
    pub subject: SubjectBrief,
    pub medium: MediumBrief,
    pub teacher: UserBrief,
    pub teacher_assignment_id: AssignmentId,
    pub day_of_week: i16,
    pub day_of_week_name: String,
    pub start_time: String,
    pub end_time: String,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub recurring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_dates: Option<Vec<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub active: bool,
    /// Overrides relevant to the queried range; empty for plain listings.
    #[serde(default)]
    pub changes: Vec<TimetableChangeResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TimetableRow> for TimetableResponse {
    fn from(row: TimetableRow) -> Self {
        TimetableResponse {
            id: row.id,
            grade: GradeBrief {
                id: row.grade_id,
                name: row.grade_name,
                level: row.grade_level,
            },
            academic_year: row.academic_year,
            term: row.term,
            subject: SubjectBrief {
                id: row.subject_id,
                name: row.subject_name,
                code: row.subject_code,
            },
            medium: MediumBrief {
                id: row.medium_id,
                name: row.medium_name,
            },
            teacher: UserBrief {
                id: row.teacher_id,
                first_name: row.teacher_first_name,
                last_name: row.teacher_last_name,
                email: Some(row.teacher_email),
            },
            teacher_assignment_id: row.teacher_assignment_id,
            day_of_week: row.day_of_week,
            day_of_week_name: day_name(row.day_of_week).to_string(),
            start_time: row.start_time,
            end_time: row.end_time,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            recurring: row.recurring,
            recurrence_pattern: row.recurrence_pattern,
            exclude_dates: row.exclude_dates,
            class_link: row.class_link,
            room_number: row.room_number,
            color: row.color,
            notes: row.notes,
            active: row.active,
            changes: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// DTO for creating a timetable entry.
///
/// `grade_id`, `subject_id` and `medium_id` are optional at the wire
/// level so their absence can be reported as a field-specific 400 rather
/// than a generic deserialization failure.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTimetableDto {
    pub grade_id: Option<GradeId>,
    pub subject_id: Option<SubjectId>,
    pub medium_id: Option<MediumId>,
    pub teacher_id: UserId,
    /// Calendar year of the academic year record, e.g. `2025`. When
    /// omitted, the year flagged current is used.
    pub academic_year: Option<i32>,
    #[validate(range(min = 1, max = 3))]
    pub term: Option<i32>,
    #[validate(range(min = 0, max = 6))]
    pub day_of_week: i16,
    pub start_time: String,
    pub end_time: String,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub recurring: Option<bool>,
    pub recurrence_pattern: Option<String>,
    pub exclude_dates: Option<Vec<NaiveDate>>,
    pub class_link: Option<String>,
    pub room_number: Option<String>,
    pub color: Option<String>,
    pub notes: Option<String>,
    pub active: Option<bool>,
}

/// DTO for partially updating a timetable entry. Absent fields are left
/// untouched.
///
/// `teacher_id` is accepted at the wire level only so that an attempt to
/// change it can be rejected explicitly; the teacher of an entry is
/// immutable after creation.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTimetableDto {
    pub teacher_id: Option<UserId>,
    pub academic_year: Option<i32>,
    #[validate(range(min = 1, max = 3))]
    pub term: Option<i32>,
    #[validate(range(min = 0, max = 6))]
    pub day_of_week: Option<i16>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub recurring: Option<bool>,
    pub recurrence_pattern: Option<String>,
    pub exclude_dates: Option<Vec<NaiveDate>>,
    pub class_link: Option<String>,
    pub room_number: Option<String>,
    pub color: Option<String>,
    pub notes: Option<String>,
    pub active: Option<bool>,
}

impl UpdateTimetableDto {
    /// Whether the update touches any dimension of the conflict predicate.
    pub fn touches_schedule(&self) -> bool {
        self.day_of_week.is_some()
            || self.start_time.is_some()
            || self.end_time.is_some()
            || self.valid_from.is_some()
            || self.valid_until.is_some()
    }

    /// Names of the fields present in the payload, for the update
    /// notification summary.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.academic_year.is_some() {
            fields.push("academic_year");
        }
        if self.term.is_some() {
            fields.push("term");
        }
        if self.day_of_week.is_some() {
            fields.push("day_of_week");
        }
        if self.start_time.is_some() {
            fields.push("start_time");
        }
        if self.end_time.is_some() {
            fields.push("end_time");
        }
        if self.valid_from.is_some() {
            fields.push("valid_from");
        }
        if self.valid_until.is_some() {
            fields.push("valid_until");
        }
        if self.recurring.is_some() {
            fields.push("recurring");
        }
        if self.recurrence_pattern.is_some() {
            fields.push("recurrence_pattern");
        }
        if self.exclude_dates.is_some() {
            fields.push("exclude_dates");
        }
        if self.class_link.is_some() {
            fields.push("class_link");
        }
        if self.room_number.is_some() {
            fields.push("room_number");
        }
        if self.color.is_some() {
            fields.push("color");
        }
        if self.notes.is_some() {
            fields.push("notes");
        }
        if self.active.is_some() {
            fields.push("active");
        }
        fields
    }
}

/// Query parameters for the filtered list endpoint.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct TimetableFilterParams {
    pub grade_id: Option<GradeId>,
    pub subject_id: Option<SubjectId>,
    pub medium_id: Option<MediumId>,
    pub teacher_id: Option<UserId>,
    pub day_of_week: Option<i16>,
    pub term: Option<i32>,
    pub academic_year: Option<i32>,
    pub active: Option<bool>,
    /// Restrict to entries whose validity window contains this date.
    pub date: Option<NaiveDate>,
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedTimetablesResponse {
    pub data: Vec<TimetableResponse>,
    pub meta: PaginationMeta,
}

/// Query parameters for the advisory conflict endpoint.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ConflictQuery {
    pub teacher_id: UserId,
    pub day_of_week: i16,
    pub start_time: String,
    pub end_time: String,
    /// Optional validity gate; when both bounds are present only entries
    /// with coexisting windows are reported.
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub exclude_id: Option<TimetableId>,
}

/// One conflicting entry, with enough context to display why the slot is
/// unavailable.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConflictReport {
    /// Conflict kind; currently always `TEACHER_BUSY`.
    pub kind: String,
    pub message: String,
    pub entry: TimetableResponse,
}

/// Query parameters for availability search.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AvailabilityQuery {
    pub day_of_week: i16,
    pub start_time: String,
    pub end_time: String,
    /// Narrow to teachers holding an active assignment for this subject.
    pub subject_id: Option<SubjectId>,
}

/// One day of a materialized schedule grid.
#[derive(Debug, Serialize, ToSchema)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub day_of_week: i16,
    pub day_of_week_name: String,
    pub entries: Vec<TimetableResponse>,
}

/// A 7-day schedule grid starting from an arbitrary date.
#[derive(Debug, Serialize, ToSchema)]
pub struct WeekScheduleResponse {
    pub start_date: NaiveDate,
    pub days: Vec<DaySchedule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touches_schedule_detects_conflict_dimensions() {
        let dto = UpdateTimetableDto {
            notes: Some("room moved".to_string()),
            ..Default::default()
        };
        assert!(!dto.touches_schedule());

        let dto = UpdateTimetableDto {
            start_time: Some("09:00".to_string()),
            ..Default::default()
        };
        assert!(dto.touches_schedule());

        let dto = UpdateTimetableDto {
            valid_until: Some(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()),
            ..Default::default()
        };
        assert!(dto.touches_schedule());
    }

    #[test]
    fn changed_fields_names_the_payload() {
        let dto = UpdateTimetableDto {
            day_of_week: Some(2),
            notes: Some("note".to_string()),
            ..Default::default()
        };
        assert_eq!(dto.changed_fields(), vec!["day_of_week", "notes"]);
    }

    #[test]
    fn create_dto_validates_day_range() {
        use validator::Validate;

        let dto: CreateTimetableDto = serde_json::from_value(serde_json::json!({
            "teacher_id": "12345678-1234-1234-1234-123456789abc",
            "day_of_week": 9,
            "start_time": "09:00",
            "end_time": "10:00",
            "valid_from": "2025-01-01",
            "valid_until": "2025-06-30"
        }))
        .unwrap();
        assert!(dto.validate().is_err());
    }
}
