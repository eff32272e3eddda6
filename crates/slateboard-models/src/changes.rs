//! Single-date override models.
//!
//! A [`TimetableChange`] never mutates its parent entry; it is read
//! alongside the entry when a concrete day's schedule is materialized.
//! The per-type required fields are enforced by the shape of
//! [`ChangeDetail`]: a `TEACHER_CHANGE` without a substitute teacher is
//! not representable and fails at deserialization, before anything
//! touches the store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::ids::{ChangeId, TimetableId, UserId};
use crate::timetable::UserBrief;

/// Discriminant of an override, as stored in `timetable_changes.change_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Cancelled,
    SubjectChange,
    TeacherChange,
    TimeChange,
    RoomChange,
    Reschedule,
}

/// Type-conditional payload of an override. Each variant carries exactly
/// the fields its change type requires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "change_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeDetail {
    Cancelled,
    SubjectChange {
        new_subject: String,
    },
    TeacherChange {
        new_teacher_id: UserId,
    },
    TimeChange {
        new_start_time: String,
        new_end_time: String,
    },
    RoomChange {
        new_room: String,
    },
    Reschedule {
        new_date: NaiveDate,
        new_start_time: String,
        new_end_time: String,
        new_class_link: Option<String>,
    },
}

impl ChangeType {
    /// The stored discriminant string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Cancelled => "CANCELLED",
            ChangeType::SubjectChange => "SUBJECT_CHANGE",
            ChangeType::TeacherChange => "TEACHER_CHANGE",
            ChangeType::TimeChange => "TIME_CHANGE",
            ChangeType::RoomChange => "ROOM_CHANGE",
            ChangeType::Reschedule => "RESCHEDULE",
        }
    }
}

impl ChangeDetail {
    pub fn change_type(&self) -> ChangeType {
        match self {
            ChangeDetail::Cancelled => ChangeType::Cancelled,
            ChangeDetail::SubjectChange { .. } => ChangeType::SubjectChange,
            ChangeDetail::TeacherChange { .. } => ChangeType::TeacherChange,
            ChangeDetail::TimeChange { .. } => ChangeType::TimeChange,
            ChangeDetail::RoomChange { .. } => ChangeType::RoomChange,
            ChangeDetail::Reschedule { .. } => ChangeType::Reschedule,
        }
    }

    pub fn new_teacher_id(&self) -> Option<UserId> {
        match self {
            ChangeDetail::TeacherChange { new_teacher_id } => Some(*new_teacher_id),
            _ => None,
        }
    }

    pub fn new_subject(&self) -> Option<&str> {
        match self {
            ChangeDetail::SubjectChange { new_subject } => Some(new_subject),
            _ => None,
        }
    }

    /// The substitute `[start, end)` times, for the variants that move a
    /// slot in time.
    pub fn new_times(&self) -> Option<(&str, &str)> {
        match self {
            ChangeDetail::TimeChange {
                new_start_time,
                new_end_time,
            }
            | ChangeDetail::Reschedule {
                new_start_time,
                new_end_time,
                ..
            } => Some((new_start_time, new_end_time)),
            _ => None,
        }
    }

    pub fn new_date(&self) -> Option<NaiveDate> {
        match self {
            ChangeDetail::Reschedule { new_date, .. } => Some(*new_date),
            _ => None,
        }
    }

    pub fn new_room(&self) -> Option<&str> {
        match self {
            ChangeDetail::RoomChange { new_room } => Some(new_room),
            _ => None,
        }
    }

    pub fn new_class_link(&self) -> Option<&str> {
        match self {
            ChangeDetail::Reschedule { new_class_link, .. } => new_class_link.as_deref(),
            _ => None,
        }
    }
}

/// A stored override row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TimetableChange {
    pub id: ChangeId,
    pub timetable_id: TimetableId,
    pub change_type: ChangeType,
    /// The single calendar date the override applies to.
    pub change_date: NaiveDate,
    pub new_subject: Option<String>,
    pub new_teacher_id: Option<UserId>,
    pub new_start_time: Option<String>,
    pub new_end_time: Option<String>,
    pub new_date: Option<NaiveDate>,
    pub new_room: Option<String>,
    pub new_class_link: Option<String>,
    pub reason: Option<String>,
    pub notification_sent: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// An override row joined with the substitute teacher and creator names.
#[derive(Debug, Clone, FromRow)]
pub struct ChangeRow {
    pub id: ChangeId,
    pub timetable_id: TimetableId,
    pub change_type: ChangeType,
    pub change_date: NaiveDate,
    pub new_subject: Option<String>,
    pub new_teacher_id: Option<UserId>,
    pub new_start_time: Option<String>,
    pub new_end_time: Option<String>,
    pub new_date: Option<NaiveDate>,
    pub new_room: Option<String>,
    pub new_class_link: Option<String>,
    pub reason: Option<String>,
    pub notification_sent: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub new_teacher_first_name: Option<String>,
    pub new_teacher_last_name: Option<String>,
    pub creator_first_name: Option<String>,
    pub creator_last_name: Option<String>,
}

/// API representation of an override.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TimetableChangeResponse {
    pub id: ChangeId,
    pub timetable_id: TimetableId,
    pub change_type: ChangeType,
    pub change_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_teacher: Option<UserBrief>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_class_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub notification_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<UserBrief>,
    pub created_at: DateTime<Utc>,
}

impl From<ChangeRow> for TimetableChangeResponse {
    fn from(row: ChangeRow) -> Self {
        let new_teacher = match (
            row.new_teacher_id,
            row.new_teacher_first_name,
            row.new_teacher_last_name,
        ) {
            (Some(id), Some(first_name), Some(last_name)) => Some(UserBrief {
                id,
                first_name,
                last_name,
                email: None,
            }),
            _ => None,
        };
        let creator = match (row.creator_first_name, row.creator_last_name) {
            (Some(first_name), Some(last_name)) => Some(UserBrief {
                id: row.created_by,
                first_name,
                last_name,
                email: None,
            }),
            _ => None,
        };

        TimetableChangeResponse {
            id: row.id,
            timetable_id: row.timetable_id,
            change_type: row.change_type,
            change_date: row.change_date,
            new_subject: row.new_subject,
            new_teacher,
            new_start_time: row.new_start_time,
            new_end_time: row.new_end_time,
            new_date: row.new_date,
            new_room: row.new_room,
            new_class_link: row.new_class_link,
            reason: row.reason,
            notification_sent: row.notification_sent,
            creator,
            created_at: row.created_at,
        }
    }
}

/// DTO for creating an override.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateChangeDto {
    pub timetable_id: TimetableId,
    pub change_date: NaiveDate,
    #[serde(flatten)]
    pub detail: ChangeDetail,
    pub reason: Option<String>,
}
