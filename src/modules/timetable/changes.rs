//! Single-date overrides on recurring entries.
//!
//! An override never mutates its parent entry; it is stored beside it
//! and layered in when a concrete day is materialized. Deleting an
//! override restores the recurring slot silently, with no student
//! notification. Cancellation notices already reached students when the
//! override was created, so a second fan-out on restoration would be
//! noise more often than news.

use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::instrument;

use slateboard_core::AppError;
use slateboard_models::changes::{
    ChangeDetail, ChangeRow, CreateChangeDto, TimetableChange, TimetableChangeResponse,
};
use slateboard_models::ids::{ChangeId, TimetableId, UserId};
use slateboard_models::users::Actor;

use crate::modules::notifications::NotificationDispatcher;
use crate::modules::timetable::service::TimetableService;
use crate::modules::users::service::UserService;

const CHANGE_SELECT: &str = r#"SELECT
    c.id, c.timetable_id, c.change_type, c.change_date,
    c.new_subject, c.new_teacher_id, c.new_start_time, c.new_end_time,
    c.new_date, c.new_room, c.new_class_link, c.reason,
    c.notification_sent, c.created_by, c.created_at,
    nt.first_name AS new_teacher_first_name, nt.last_name AS new_teacher_last_name,
    cr.first_name AS creator_first_name, cr.last_name AS creator_last_name
FROM timetable_changes c
LEFT JOIN users nt ON nt.id = c.new_teacher_id
LEFT JOIN users cr ON cr.id = c.created_by"#;

pub struct ChangeService;

impl ChangeService {
    /// Record an override for one date and notify the affected grade.
    #[instrument(skip(db, notifier, dto), fields(timetable_id = %dto.timetable_id))]
    pub async fn create_change(
        db: &PgPool,
        notifier: &dyn NotificationDispatcher,
        dto: CreateChangeDto,
        creator: UserId,
    ) -> Result<TimetableChangeResponse, AppError> {
        let parent = TimetableService::fetch_response(db, dto.timetable_id).await?;

        if let Some(substitute_id) = dto.detail.new_teacher_id() {
            UserService::require_teacher(db, substitute_id).await?;
        }
        if let Some((new_start, new_end)) = dto.detail.new_times() {
            TimetableService::validate_slot(new_start, new_end)?;
        }

        let id = sqlx::query_scalar::<_, ChangeId>(
            r#"INSERT INTO timetable_changes (
                   timetable_id, change_type, change_date, new_subject, new_teacher_id,
                   new_start_time, new_end_time, new_date, new_room, new_class_link,
                   reason, created_by
               )
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
               RETURNING id"#,
        )
        .bind(dto.timetable_id)
        .bind(dto.detail.change_type())
        .bind(dto.change_date)
        .bind(dto.detail.new_subject())
        .bind(dto.detail.new_teacher_id())
        .bind(dto.detail.new_times().map(|(start, _)| start.to_string()))
        .bind(dto.detail.new_times().map(|(_, end)| end.to_string()))
        .bind(dto.detail.new_date())
        .bind(dto.detail.new_room())
        .bind(dto.detail.new_class_link())
        .bind(&dto.reason)
        .bind(creator)
        .fetch_one(db)
        .await?;

        let message = match &dto.reason {
            Some(reason) => format!(
                "{} on {} for your {} class: {}",
                change_headline(&dto.detail),
                dto.change_date,
                parent.subject.name,
                reason
            ),
            None => format!(
                "{} on {} for your {} class",
                change_headline(&dto.detail),
                dto.change_date,
                parent.subject.name
            ),
        };

        let sent = TimetableService::notify_grade(
            db,
            notifier,
            parent.grade.id,
            "schedule_change",
            "Class Schedule Change",
            &message,
            serde_json::json!({
                "timetable_id": parent.id,
                "change_id": id,
                "change_type": dto.detail.change_type().as_str(),
                "change_date": dto.change_date,
            }),
        )
        .await;

        if sent {
            sqlx::query("UPDATE timetable_changes SET notification_sent = TRUE WHERE id = $1")
                .bind(id)
                .execute(db)
                .await?;
        }

        Self::fetch_change(db, id).await
    }

    async fn fetch_change(db: &PgPool, id: ChangeId) -> Result<TimetableChangeResponse, AppError> {
        let row = sqlx::query_as::<_, ChangeRow>(&format!("{CHANGE_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Timetable change not found")))?;
        Ok(row.into())
    }

    /// All overrides of one entry, newest change date first.
    #[instrument(skip(db))]
    pub async fn list_changes(
        db: &PgPool,
        timetable_id: TimetableId,
    ) -> Result<Vec<TimetableChangeResponse>, AppError> {
        let rows = sqlx::query_as::<_, ChangeRow>(&format!(
            "{CHANGE_SELECT} WHERE c.timetable_id = $1 ORDER BY c.change_date DESC, c.created_at DESC"
        ))
        .bind(timetable_id)
        .fetch_all(db)
        .await?;

        Ok(rows.into_iter().map(TimetableChangeResponse::from).collect())
    }

    /// Overrides of a set of entries dated within `[from, until]`, for
    /// layering into day and week views.
    pub(crate) async fn for_timetables_between(
        db: &PgPool,
        timetable_ids: &[TimetableId],
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<TimetableChangeResponse>, AppError> {
        if timetable_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, ChangeRow>(&format!(
            r#"{CHANGE_SELECT}
               WHERE c.timetable_id = ANY($1) AND c.change_date >= $2 AND c.change_date <= $3
               ORDER BY c.change_date, c.created_at"#
        ))
        .bind(timetable_ids)
        .bind(from)
        .bind(until)
        .fetch_all(db)
        .await?;

        Ok(rows.into_iter().map(TimetableChangeResponse::from).collect())
    }

    /// Delete an override, restoring the recurring slot for that date.
    /// Only the creator or an admin may do this; no notification is sent.
    #[instrument(skip(db))]
    pub async fn remove_change(
        db: &PgPool,
        id: ChangeId,
        actor: Actor,
    ) -> Result<(), AppError> {
        let existing = sqlx::query_as::<_, TimetableChange>(
            r#"SELECT id, timetable_id, change_type, change_date, new_subject, new_teacher_id,
                      new_start_time, new_end_time, new_date, new_room, new_class_link,
                      reason, notification_sent, created_by, created_at
               FROM timetable_changes WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Timetable change not found")))?;

        if !actor.is_admin_or(existing.created_by) {
            return Err(AppError::forbidden(
                "You can only delete your own changes".to_string(),
            ));
        }

        sqlx::query("DELETE FROM timetable_changes WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        Ok(())
    }
}

fn change_headline(detail: &ChangeDetail) -> String {
    match detail {
        ChangeDetail::Cancelled => "Class cancelled".to_string(),
        ChangeDetail::SubjectChange { new_subject } => {
            format!("Subject changed to {new_subject}")
        }
        ChangeDetail::TeacherChange { .. } => "Substitute teacher assigned".to_string(),
        ChangeDetail::TimeChange {
            new_start_time,
            new_end_time,
        } => format!("Time moved to {new_start_time}-{new_end_time}"),
        ChangeDetail::RoomChange { new_room } => format!("Room changed to {new_room}"),
        ChangeDetail::Reschedule { new_date, .. } => {
            format!("Class rescheduled to {new_date}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use slateboard_models::changes::ChangeType;

    use crate::modules::notifications::dispatcher::testing::{
        FailingDispatcher, RecordingDispatcher,
    };
    use crate::modules::timetable::service::tests::{dto, insert_user, seed};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn cancelled(timetable_id: TimetableId, on: NaiveDate) -> CreateChangeDto {
        CreateChangeDto {
            timetable_id,
            change_date: on,
            detail: ChangeDetail::Cancelled,
            reason: Some("Teacher on leave".to_string()),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn cancellation_notifies_and_marks_the_row(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        let entry = TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();

        let change = ChangeService::create_change(
            &pool,
            &notifier,
            cancelled(entry.id, date(2025, 3, 10)),
            refs.admin_id,
        )
        .await
        .unwrap();

        assert_eq!(change.change_type, ChangeType::Cancelled);
        assert!(change.notification_sent);
        assert_eq!(notifier.kinds(), vec!["new_schedule", "schedule_change"]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn dispatch_failure_leaves_the_flag_unset(pool: PgPool) {
        let refs = seed(&pool).await;
        let recording = RecordingDispatcher::default();

        let entry = TimetableService::create(&pool, &recording, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();

        let change = ChangeService::create_change(
            &pool,
            &FailingDispatcher,
            cancelled(entry.id, date(2025, 3, 10)),
            refs.admin_id,
        )
        .await
        .unwrap();

        assert!(!change.notification_sent);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn change_on_unknown_entry_is_not_found(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        let err = ChangeService::create_change(
            &pool,
            &notifier,
            cancelled(TimetableId::new(), date(2025, 3, 10)),
            refs.admin_id,
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn substitute_must_hold_the_teacher_role(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        let entry = TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();
        let student = insert_user(&pool, "Sia", "Student", "STUDENT", Some(refs.grade_id)).await;

        let err = ChangeService::create_change(
            &pool,
            &notifier,
            CreateChangeDto {
                timetable_id: entry.id,
                change_date: date(2025, 3, 10),
                detail: ChangeDetail::TeacherChange {
                    new_teacher_id: student,
                },
                reason: None,
            },
            refs.admin_id,
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn substitute_times_are_validated(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        let entry = TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();

        let err = ChangeService::create_change(
            &pool,
            &notifier,
            CreateChangeDto {
                timetable_id: entry.id,
                change_date: date(2025, 3, 10),
                detail: ChangeDetail::TimeChange {
                    new_start_time: "11:00".to_string(),
                    new_end_time: "10:00".to_string(),
                },
                reason: None,
            },
            refs.admin_id,
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn listing_is_newest_change_date_first(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        let entry = TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();

        ChangeService::create_change(&pool, &notifier, cancelled(entry.id, date(2025, 3, 10)), refs.admin_id)
            .await
            .unwrap();
        ChangeService::create_change(&pool, &notifier, cancelled(entry.id, date(2025, 3, 24)), refs.admin_id)
            .await
            .unwrap();

        let changes = ChangeService::list_changes(&pool, entry.id).await.unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].change_date, date(2025, 3, 24));
        assert_eq!(changes[1].change_date, date(2025, 3, 10));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn only_the_creator_or_an_admin_can_delete(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        let entry = TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();
        let change = ChangeService::create_change(
            &pool,
            &notifier,
            cancelled(entry.id, date(2025, 3, 10)),
            refs.teacher_id,
        )
        .await
        .unwrap();

        let other = insert_user(&pool, "Nila", "Fernando", "TEACHER", None).await;
        let err = ChangeService::remove_change(&pool, change.id, Actor::teacher(other))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let batches_before = notifier.batch_count();
        ChangeService::remove_change(&pool, change.id, Actor::teacher(refs.teacher_id))
            .await
            .unwrap();
        // Restoration is silent.
        assert_eq!(notifier.batch_count(), batches_before);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM timetable_changes")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn deleting_the_entry_cascades_to_its_changes(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        let entry = TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();
        ChangeService::create_change(&pool, &notifier, cancelled(entry.id, date(2025, 3, 10)), refs.admin_id)
            .await
            .unwrap();

        TimetableService::remove(&pool, &notifier, entry.id, Actor::admin(refs.admin_id))
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM timetable_changes")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
