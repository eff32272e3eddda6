//! User reference-data lookups for the scheduler.
//!
//! User CRUD lives elsewhere; the scheduler only resolves IDs to users,
//! asserts the teacher role, enumerates active teachers for availability
//! search, and finds the students enrolled in a grade for notification
//! fan-out.

use sqlx::PgPool;
use tracing::instrument;

use slateboard_core::AppError;
use slateboard_models::ids::{GradeId, SubjectId, UserId};
use slateboard_models::users::{TeacherSummary, User};

pub struct UserService;

impl UserService {
    #[instrument(skip(db))]
    pub async fn get_user(db: &PgPool, user_id: UserId) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"SELECT id, first_name, last_name, email, role, status, grade_id
               FROM users WHERE id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User {} not found", user_id)))
    }

    /// Resolve a user ID that must be a teacher.
    ///
    /// Returns 404 if the user does not exist and 400 if it exists but
    /// does not hold the teacher role.
    #[instrument(skip(db))]
    pub async fn require_teacher(db: &PgPool, teacher_id: UserId) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, first_name, last_name, email, role, status, grade_id
               FROM users WHERE id = $1"#,
        )
        .bind(teacher_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Teacher {} not found", teacher_id)))?;

        if !user.role.is_teacher() {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "User {} does not have the teacher role",
                teacher_id
            )));
        }

        Ok(user)
    }

    /// All active teachers, optionally narrowed to those holding an
    /// active assignment for a subject. Ordered deterministically so
    /// repeated availability queries return identical lists.
    #[instrument(skip(db))]
    pub async fn active_teachers(
        db: &PgPool,
        subject_id: Option<SubjectId>,
    ) -> Result<Vec<TeacherSummary>, AppError> {
        let teachers = match subject_id {
            Some(subject_id) => {
                sqlx::query_as::<_, TeacherSummary>(
                    r#"SELECT DISTINCT u.id, u.first_name, u.last_name, u.email
                       FROM users u
                       JOIN teacher_subject_assignments a
                         ON a.teacher_id = u.id AND a.is_active = TRUE
                       WHERE u.role = 'TEACHER' AND u.status = 'ACTIVE' AND a.subject_id = $1
                       ORDER BY u.last_name, u.first_name, u.id"#,
                )
                .bind(subject_id)
                .fetch_all(db)
                .await?
            }
            None => {
                sqlx::query_as::<_, TeacherSummary>(
                    r#"SELECT id, first_name, last_name, email
                       FROM users
                       WHERE role = 'TEACHER' AND status = 'ACTIVE'
                       ORDER BY last_name, first_name, id"#,
                )
                .fetch_all(db)
                .await?
            }
        };

        Ok(teachers)
    }

    /// Active students enrolled in a grade, for notification fan-out.
    #[instrument(skip(db))]
    pub async fn students_in_grade(db: &PgPool, grade_id: GradeId) -> Result<Vec<UserId>, AppError> {
        let ids = sqlx::query_scalar::<_, UserId>(
            r#"SELECT id FROM users
               WHERE role = 'STUDENT' AND status = 'ACTIVE' AND grade_id = $1"#,
        )
        .bind(grade_id)
        .fetch_all(db)
        .await?;

        Ok(ids)
    }
}
