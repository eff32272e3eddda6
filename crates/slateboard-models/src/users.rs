//! User reference-data models consumed by the scheduler.
//!
//! Slateboard does not own user CRUD; it only reads users as reference
//! data (does this ID resolve to a teacher? which students are enrolled
//! in a grade?) and threads the authenticated caller through mutations
//! as an explicit [`Actor`].

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::ids::{GradeId, UserId};

/// Role of a user account.
///
/// Stored as text in the `users.role` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Teacher,
    Student,
}

impl UserRole {
    /// Whether this role may appear as the teacher of a timetable entry.
    pub fn is_teacher(&self) -> bool {
        matches!(self, UserRole::Teacher)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

/// Account status. Suspended users are excluded from availability search
/// and notification fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Suspended,
}

/// A user row as the scheduler sees it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: UserRole,
    pub status: UserStatus,
    /// Enrollment grade for students; `None` for staff.
    pub grade_id: Option<GradeId>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Compact teacher representation returned by availability search.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TeacherSummary {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// The authenticated caller of a mutation, passed explicitly into the
/// service layer so authorization decisions are testable without a
/// request context.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: UserId,
    pub role: UserRole,
}

impl Actor {
    pub fn admin(id: UserId) -> Self {
        Self {
            id,
            role: UserRole::Admin,
        }
    }

    pub fn teacher(id: UserId) -> Self {
        Self {
            id,
            role: UserRole::Teacher,
        }
    }

    /// Admin, or the given owner.
    pub fn is_admin_or(&self, owner: UserId) -> bool {
        self.role.is_admin() || self.id == owner
    }
}
