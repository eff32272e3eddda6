//! Timetable lifecycle, conflict detection, and availability search.
//!
//! Everything here is request-scoped: no caching, no background loop;
//! each conflict check reads current store state. The check-then-write
//! sequence on create/update runs inside a transaction holding a
//! per-(teacher, day) advisory lock, so two concurrent writes for the
//! same slot serialize instead of both passing the check.

use chrono::{Datelike, Days, NaiveDate};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::instrument;

use slateboard_core::{AppError, PaginationMeta, day_name, parse_hhmm, periods_overlap, times_overlap};
use slateboard_models::ids::{AcademicYearId, AssignmentId, GradeId, MediumId, SubjectId, TimetableId, UserId};
use slateboard_models::timetable::{
    AvailabilityQuery, ConflictQuery, ConflictReport, CreateTimetableDto, DaySchedule,
    PaginatedTimetablesResponse, Timetable, TimetableFilterParams, TimetableResponse, TimetableRow,
    UpdateTimetableDto, WeekScheduleResponse,
};
use slateboard_models::users::{Actor, TeacherSummary};

use crate::modules::notifications::{Notification, NotificationDispatcher};
use crate::modules::timetable::changes::ChangeService;
use crate::modules::users::service::UserService;

/// Shared projection for timetable queries that need reference data.
pub(crate) const TIMETABLE_SELECT: &str = r#"SELECT
    t.id, t.grade_id, t.academic_year_id, t.term, t.subject_id, t.medium_id,
    t.teacher_id, t.teacher_assignment_id, t.day_of_week, t.start_time, t.end_time,
    t.valid_from, t.valid_until, t.recurring, t.recurrence_pattern, t.exclude_dates,
    t.class_link, t.room_number, t.color, t.notes, t.active,
    t.created_by, t.last_modified_by, t.created_at, t.updated_at,
    u.first_name AS teacher_first_name, u.last_name AS teacher_last_name,
    u.email AS teacher_email,
    g.name AS grade_name, g.level AS grade_level,
    s.name AS subject_name, s.code AS subject_code,
    m.name AS medium_name,
    y.year AS academic_year
FROM timetables t
JOIN users u ON u.id = t.teacher_id
JOIN grades g ON g.id = t.grade_id
JOIN subjects s ON s.id = t.subject_id
JOIN mediums m ON m.id = t.medium_id
JOIN academic_years y ON y.id = t.academic_year_id"#;

const ENTRY_COLUMNS: &str = r#"id, grade_id, academic_year_id, term, subject_id, medium_id,
    teacher_id, teacher_assignment_id, day_of_week, start_time, end_time,
    valid_from, valid_until, recurring, recurrence_pattern, exclude_dates,
    class_link, room_number, color, notes, active,
    created_by, last_modified_by, created_at, updated_at"#;

pub struct TimetableService;

impl TimetableService {
    /// Validate both bounds of a `[start, end)` slot and check the order.
    pub(crate) fn validate_slot(start_time: &str, end_time: &str) -> Result<(), AppError> {
        let start = parse_hhmm(start_time)?;
        let end = parse_hhmm(end_time)?;
        if start >= end {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Start time {} must be before end time {}",
                start_time,
                end_time
            )));
        }
        Ok(())
    }

    /// Resolve an academic year: an explicit calendar year when given,
    /// otherwise the year flagged current.
    async fn resolve_academic_year(
        db: &PgPool,
        year: Option<i32>,
    ) -> Result<(AcademicYearId, String), AppError> {
        match year {
            Some(year) => sqlx::query_as::<_, (AcademicYearId, String)>(
                "SELECT id, year FROM academic_years WHERE year = $1",
            )
            .bind(year.to_string())
            .fetch_optional(db)
            .await?
            .ok_or_else(|| {
                AppError::not_found(anyhow::anyhow!("Academic year {} not found", year))
            }),
            None => sqlx::query_as::<_, (AcademicYearId, String)>(
                "SELECT id, year FROM academic_years WHERE is_current = TRUE",
            )
            .fetch_optional(db)
            .await?
            .ok_or_else(|| {
                AppError::not_found(anyhow::anyhow!(
                    "No academic year is flagged current; pass academic_year explicitly or mark one current"
                ))
            }),
        }
    }

    /// The teacher's active assignment for (subject, grade, medium, year).
    ///
    /// Assignments are authorization records and are never created here;
    /// absence is a hard rejection.
    async fn require_assignment(
        db: &PgPool,
        teacher_id: UserId,
        subject_id: SubjectId,
        grade_id: GradeId,
        medium_id: MediumId,
        academic_year_id: AcademicYearId,
        year: &str,
    ) -> Result<AssignmentId, AppError> {
        sqlx::query_scalar::<_, AssignmentId>(
            r#"SELECT id FROM teacher_subject_assignments
               WHERE teacher_id = $1 AND subject_id = $2 AND grade_id = $3
                 AND medium_id = $4 AND academic_year_id = $5 AND is_active = TRUE"#,
        )
        .bind(teacher_id)
        .bind(subject_id)
        .bind(grade_id)
        .bind(medium_id)
        .bind(academic_year_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| {
            AppError::bad_request(anyhow::anyhow!(
                "No active teacher assignment exists for this teacher/subject/grade/medium in {}; create the assignment first",
                year
            ))
        })
    }

    /// Serialize concurrent conflict checks for one (teacher, day) pair.
    async fn lock_teacher_day(
        tx: &mut Transaction<'_, Postgres>,
        teacher_id: UserId,
        day_of_week: i16,
    ) -> Result<(), AppError> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text), $2)")
            .bind(teacher_id)
            .bind(day_of_week as i32)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Active entries of a teacher on a day whose validity window (when a
    /// window is given) and time range both overlap the proposed slot.
    async fn conflicting_entries<'e, E>(
        executor: E,
        teacher_id: UserId,
        day_of_week: i16,
        start_time: &str,
        end_time: &str,
        validity: Option<(NaiveDate, NaiveDate)>,
        exclude_id: Option<TimetableId>,
    ) -> Result<Vec<Timetable>, AppError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let candidates = sqlx::query_as::<_, Timetable>(&format!(
            r#"SELECT {ENTRY_COLUMNS} FROM timetables
               WHERE teacher_id = $1 AND day_of_week = $2 AND active = TRUE
                 AND ($3::uuid IS NULL OR id <> $3)"#
        ))
        .bind(teacher_id)
        .bind(day_of_week)
        .bind(exclude_id)
        .fetch_all(executor)
        .await?;

        let mut conflicts = Vec::new();
        for candidate in candidates {
            if let Some((valid_from, valid_until)) = validity
                && !periods_overlap(
                    valid_from,
                    valid_until,
                    candidate.valid_from,
                    candidate.valid_until,
                )
            {
                continue;
            }

            if times_overlap(
                start_time,
                end_time,
                &candidate.start_time,
                &candidate.end_time,
            )? {
                conflicts.push(candidate);
            }
        }

        Ok(conflicts)
    }

    /// Enforcing conflict check: 409 naming the first conflicting slot.
    async fn check_conflicts(
        tx: &mut Transaction<'_, Postgres>,
        teacher_id: UserId,
        day_of_week: i16,
        start_time: &str,
        end_time: &str,
        valid_from: NaiveDate,
        valid_until: NaiveDate,
        exclude_id: Option<TimetableId>,
    ) -> Result<(), AppError> {
        let conflicts = Self::conflicting_entries(
            &mut **tx,
            teacher_id,
            day_of_week,
            start_time,
            end_time,
            Some((valid_from, valid_until)),
            exclude_id,
        )
        .await?;

        if let Some(conflict) = conflicts.first() {
            return Err(AppError::conflict(anyhow::anyhow!(
                "Schedule conflict: Teacher already has a class on {} from {} to {}",
                day_name(day_of_week),
                conflict.start_time,
                conflict.end_time
            )));
        }

        Ok(())
    }

    /// Create a recurring timetable entry.
    #[instrument(skip(db, notifier, dto), fields(teacher_id = %dto.teacher_id))]
    pub async fn create(
        db: &PgPool,
        notifier: &dyn NotificationDispatcher,
        dto: CreateTimetableDto,
        creator: UserId,
    ) -> Result<TimetableResponse, AppError> {
        let teacher = UserService::require_teacher(db, dto.teacher_id).await?;

        Self::validate_slot(&dto.start_time, &dto.end_time)?;
        if dto.valid_from > dto.valid_until {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "valid_from {} must not be after valid_until {}",
                dto.valid_from,
                dto.valid_until
            )));
        }

        let grade_id = dto
            .grade_id
            .ok_or_else(|| AppError::bad_request(anyhow::anyhow!("grade_id is required")))?;
        let subject_id = dto
            .subject_id
            .ok_or_else(|| AppError::bad_request(anyhow::anyhow!("subject_id is required")))?;
        let medium_id = dto
            .medium_id
            .ok_or_else(|| AppError::bad_request(anyhow::anyhow!("medium_id is required")))?;

        let (academic_year_id, year) = Self::resolve_academic_year(db, dto.academic_year).await?;

        let assignment_id = Self::require_assignment(
            db,
            dto.teacher_id,
            subject_id,
            grade_id,
            medium_id,
            academic_year_id,
            &year,
        )
        .await?;

        let mut tx = db.begin().await?;
        Self::lock_teacher_day(&mut tx, dto.teacher_id, dto.day_of_week).await?;
        Self::check_conflicts(
            &mut tx,
            dto.teacher_id,
            dto.day_of_week,
            &dto.start_time,
            &dto.end_time,
            dto.valid_from,
            dto.valid_until,
            None,
        )
        .await?;

        let id = sqlx::query_scalar::<_, TimetableId>(
            r#"INSERT INTO timetables (
                   grade_id, academic_year_id, term, subject_id, medium_id, teacher_id,
                   teacher_assignment_id, day_of_week, start_time, end_time,
                   valid_from, valid_until, recurring, recurrence_pattern, exclude_dates,
                   class_link, room_number, color, notes, active, created_by, last_modified_by
               )
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                       $16, $17, $18, $19, $20, $21, $22)
               RETURNING id"#,
        )
        .bind(grade_id)
        .bind(academic_year_id)
        .bind(dto.term.unwrap_or(1))
        .bind(subject_id)
        .bind(medium_id)
        .bind(dto.teacher_id)
        .bind(assignment_id)
        .bind(dto.day_of_week)
        .bind(&dto.start_time)
        .bind(&dto.end_time)
        .bind(dto.valid_from)
        .bind(dto.valid_until)
        .bind(dto.recurring.unwrap_or(true))
        .bind(&dto.recurrence_pattern)
        .bind(&dto.exclude_dates)
        .bind(&dto.class_link)
        .bind(&dto.room_number)
        .bind(&dto.color)
        .bind(&dto.notes)
        .bind(dto.active.unwrap_or(true))
        .bind(creator)
        .bind(creator)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        let response = Self::fetch_response(db, id).await?;

        Self::notify_grade(
            db,
            notifier,
            response.grade.id,
            "new_schedule",
            "New Class Scheduled",
            &format!(
                "A new {} class has been scheduled on {} at {}-{} with {}",
                response.subject.name,
                response.day_of_week_name,
                response.start_time,
                response.end_time,
                teacher.full_name(),
            ),
            serde_json::json!({
                "timetable_id": response.id,
                "grade_id": response.grade.id,
                "day_of_week": response.day_of_week,
            }),
        )
        .await;

        Ok(response)
    }

    /// One entry joined with its reference data; overrides not attached.
    pub(crate) async fn fetch_response(db: &PgPool, id: TimetableId) -> Result<TimetableResponse, AppError> {
        let row = sqlx::query_as::<_, TimetableRow>(&format!("{TIMETABLE_SELECT} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Timetable entry not found")))?;
        Ok(row.into())
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &TimetableFilterParams) {
        qb.push(" WHERE 1 = 1");
        if let Some(grade_id) = filters.grade_id {
            qb.push(" AND t.grade_id = ").push_bind(grade_id);
        }
        if let Some(subject_id) = filters.subject_id {
            qb.push(" AND t.subject_id = ").push_bind(subject_id);
        }
        if let Some(medium_id) = filters.medium_id {
            qb.push(" AND t.medium_id = ").push_bind(medium_id);
        }
        if let Some(teacher_id) = filters.teacher_id {
            qb.push(" AND t.teacher_id = ").push_bind(teacher_id);
        }
        if let Some(day_of_week) = filters.day_of_week {
            qb.push(" AND t.day_of_week = ").push_bind(day_of_week);
        }
        if let Some(term) = filters.term {
            qb.push(" AND t.term = ").push_bind(term);
        }
        if let Some(year) = filters.academic_year {
            qb.push(" AND y.year = ").push_bind(year.to_string());
        }
        if let Some(active) = filters.active {
            qb.push(" AND t.active = ").push_bind(active);
        }
        if let Some(date) = filters.date {
            qb.push(" AND t.valid_from <= ").push_bind(date);
            qb.push(" AND t.valid_until >= ").push_bind(date);
        }
    }

    /// Filtered, paginated listing ordered by day and start time.
    #[instrument(skip(db))]
    pub async fn find_all(
        db: &PgPool,
        filters: TimetableFilterParams,
    ) -> Result<PaginatedTimetablesResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        let mut count_qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM timetables t JOIN academic_years y ON y.id = t.academic_year_id",
        );
        Self::push_filters(&mut count_qb, &filters);
        let total: i64 = count_qb.build_query_scalar().fetch_one(db).await?;

        let mut qb = QueryBuilder::<Postgres>::new(TIMETABLE_SELECT);
        Self::push_filters(&mut qb, &filters);
        qb.push(" ORDER BY t.day_of_week, t.start_time, t.id");
        qb.push(" LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind(offset);

        let rows = qb.build_query_as::<TimetableRow>().fetch_all(db).await?;

        Ok(PaginatedTimetablesResponse {
            data: rows.into_iter().map(TimetableResponse::from).collect(),
            meta: PaginationMeta {
                total,
                limit,
                offset: Some(offset),
                has_more: offset + limit < total,
            },
        })
    }

    /// One entry with its full override history (newest first).
    #[instrument(skip(db))]
    pub async fn find_one(db: &PgPool, id: TimetableId) -> Result<TimetableResponse, AppError> {
        let mut response = Self::fetch_response(db, id).await?;
        response.changes = ChangeService::list_changes(db, id).await?;
        Ok(response)
    }

    /// The schedule materialized for one calendar date: entries active
    /// and valid on that date, with that date's overrides layered in.
    #[instrument(skip(db))]
    pub async fn today_schedule(
        db: &PgPool,
        on_date: NaiveDate,
        teacher_id: Option<UserId>,
    ) -> Result<Vec<TimetableResponse>, AppError> {
        let day_of_week = on_date.weekday().num_days_from_sunday() as i16;

        let mut qb = QueryBuilder::<Postgres>::new(TIMETABLE_SELECT);
        qb.push(" WHERE t.active = TRUE AND t.day_of_week = ")
            .push_bind(day_of_week);
        qb.push(" AND t.valid_from <= ").push_bind(on_date);
        qb.push(" AND t.valid_until >= ").push_bind(on_date);
        if let Some(teacher_id) = teacher_id {
            qb.push(" AND t.teacher_id = ").push_bind(teacher_id);
        }
        qb.push(" ORDER BY t.start_time, t.id");

        let rows = qb.build_query_as::<TimetableRow>().fetch_all(db).await?;
        let ids: Vec<TimetableId> = rows.iter().map(|row| row.id).collect();
        let changes = ChangeService::for_timetables_between(db, &ids, on_date, on_date).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut response = TimetableResponse::from(row);
                response.changes = changes
                    .iter()
                    .filter(|change| change.timetable_id == response.id)
                    .cloned()
                    .collect();
                response
            })
            .collect())
    }

    /// A 7-day grid starting from an arbitrary date. Each day carries the
    /// entries whose weekday and validity window match that concrete
    /// date, plus the overrides dated on it.
    #[instrument(skip(db))]
    pub async fn week_schedule(
        db: &PgPool,
        start_date: NaiveDate,
        teacher_id: Option<UserId>,
    ) -> Result<WeekScheduleResponse, AppError> {
        let end_date = start_date + Days::new(6);

        let mut qb = QueryBuilder::<Postgres>::new(TIMETABLE_SELECT);
        qb.push(" WHERE t.active = TRUE");
        qb.push(" AND t.valid_from <= ").push_bind(end_date);
        qb.push(" AND t.valid_until >= ").push_bind(start_date);
        if let Some(teacher_id) = teacher_id {
            qb.push(" AND t.teacher_id = ").push_bind(teacher_id);
        }
        qb.push(" ORDER BY t.day_of_week, t.start_time, t.id");

        let rows = qb.build_query_as::<TimetableRow>().fetch_all(db).await?;
        let ids: Vec<TimetableId> = rows.iter().map(|row| row.id).collect();
        let changes =
            ChangeService::for_timetables_between(db, &ids, start_date, end_date).await?;

        let days = (0..7)
            .map(|offset| {
                let date = start_date + Days::new(offset);
                let day_of_week = date.weekday().num_days_from_sunday() as i16;
                let entries = rows
                    .iter()
                    .filter(|row| {
                        row.day_of_week == day_of_week
                            && row.valid_from <= date
                            && row.valid_until >= date
                    })
                    .map(|row| {
                        let mut response = TimetableResponse::from(row.clone());
                        response.changes = changes
                            .iter()
                            .filter(|change| {
                                change.timetable_id == response.id && change.change_date == date
                            })
                            .cloned()
                            .collect();
                        response
                    })
                    .collect();
                DaySchedule {
                    date,
                    day_of_week,
                    day_of_week_name: day_name(day_of_week).to_string(),
                    entries,
                }
            })
            .collect();

        Ok(WeekScheduleResponse { start_date, days })
    }

    /// One teacher's weekly schedule as valid on the given date.
    #[instrument(skip(db))]
    pub async fn teacher_schedule(
        db: &PgPool,
        teacher_id: UserId,
        on_date: NaiveDate,
    ) -> Result<Vec<TimetableResponse>, AppError> {
        // 404 on unknown user, not an empty list.
        UserService::get_user(db, teacher_id).await?;

        let rows = sqlx::query_as::<_, TimetableRow>(&format!(
            r#"{TIMETABLE_SELECT}
               WHERE t.teacher_id = $1 AND t.active = TRUE
                 AND t.valid_from <= $2 AND t.valid_until >= $2
               ORDER BY t.day_of_week, t.start_time, t.id"#
        ))
        .bind(teacher_id)
        .bind(on_date)
        .fetch_all(db)
        .await?;

        Ok(rows.into_iter().map(TimetableResponse::from).collect())
    }

    /// Partially update an entry. Fields absent from the payload are left
    /// untouched; the teacher field is immutable.
    #[instrument(skip(db, notifier, dto))]
    pub async fn update(
        db: &PgPool,
        notifier: &dyn NotificationDispatcher,
        id: TimetableId,
        dto: UpdateTimetableDto,
        actor: Actor,
    ) -> Result<TimetableResponse, AppError> {
        let existing = sqlx::query_as::<_, Timetable>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM timetables WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Timetable entry not found")))?;

        if !actor.is_admin_or(existing.teacher_id) {
            return Err(AppError::forbidden(
                "You can only modify your own timetable entries".to_string(),
            ));
        }

        if let Some(teacher_id) = dto.teacher_id
            && teacher_id != existing.teacher_id
        {
            return Err(AppError::forbidden(
                "The teacher of a timetable entry is immutable; delete the entry and recreate it under the substitute's assignment".to_string(),
            ));
        }

        let start_time = dto.start_time.clone().unwrap_or(existing.start_time);
        let end_time = dto.end_time.clone().unwrap_or(existing.end_time);
        Self::validate_slot(&start_time, &end_time)?;

        let day_of_week = dto.day_of_week.unwrap_or(existing.day_of_week);
        let valid_from = dto.valid_from.unwrap_or(existing.valid_from);
        let valid_until = dto.valid_until.unwrap_or(existing.valid_until);
        if valid_from > valid_until {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "valid_from {} must not be after valid_until {}",
                valid_from,
                valid_until
            )));
        }

        let academic_year_id = match dto.academic_year {
            Some(year) => Self::resolve_academic_year(db, Some(year)).await?.0,
            None => existing.academic_year_id,
        };

        let term = dto.term.unwrap_or(existing.term);
        let recurring = dto.recurring.unwrap_or(existing.recurring);
        let recurrence_pattern = dto.recurrence_pattern.clone().or(existing.recurrence_pattern);
        let exclude_dates = dto.exclude_dates.clone().or(existing.exclude_dates);
        let class_link = dto.class_link.clone().or(existing.class_link);
        let room_number = dto.room_number.clone().or(existing.room_number);
        let color = dto.color.clone().or(existing.color);
        let notes = dto.notes.clone().or(existing.notes);
        let active = dto.active.unwrap_or(existing.active);

        let update_sql = r#"UPDATE timetables SET
               academic_year_id = $1, term = $2, day_of_week = $3,
               start_time = $4, end_time = $5, valid_from = $6, valid_until = $7,
               recurring = $8, recurrence_pattern = $9, exclude_dates = $10,
               class_link = $11, room_number = $12, color = $13, notes = $14,
               active = $15, last_modified_by = $16, updated_at = NOW()
           WHERE id = $17"#;

        if dto.touches_schedule() {
            // Re-check against the merged values, excluding this entry.
            let mut tx = db.begin().await?;
            Self::lock_teacher_day(&mut tx, existing.teacher_id, day_of_week).await?;
            Self::check_conflicts(
                &mut tx,
                existing.teacher_id,
                day_of_week,
                &start_time,
                &end_time,
                valid_from,
                valid_until,
                Some(id),
            )
            .await?;

            sqlx::query(update_sql)
                .bind(academic_year_id)
                .bind(term)
                .bind(day_of_week)
                .bind(&start_time)
                .bind(&end_time)
                .bind(valid_from)
                .bind(valid_until)
                .bind(recurring)
                .bind(&recurrence_pattern)
                .bind(&exclude_dates)
                .bind(&class_link)
                .bind(&room_number)
                .bind(&color)
                .bind(&notes)
                .bind(active)
                .bind(actor.id)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
        } else {
            sqlx::query(update_sql)
                .bind(academic_year_id)
                .bind(term)
                .bind(day_of_week)
                .bind(&start_time)
                .bind(&end_time)
                .bind(valid_from)
                .bind(valid_until)
                .bind(recurring)
                .bind(&recurrence_pattern)
                .bind(&exclude_dates)
                .bind(&class_link)
                .bind(&room_number)
                .bind(&color)
                .bind(&notes)
                .bind(active)
                .bind(actor.id)
                .bind(id)
                .execute(db)
                .await?;
        }

        let response = Self::fetch_response(db, id).await?;

        Self::notify_grade(
            db,
            notifier,
            response.grade.id,
            "schedule_update",
            "Class Schedule Updated",
            &format!(
                "Your {} class schedule has been updated. Changes: {}",
                response.subject.name,
                dto.changed_fields().join(", ")
            ),
            serde_json::json!({
                "timetable_id": response.id,
                "grade_id": response.grade.id,
                "changed_fields": dto.changed_fields(),
            }),
        )
        .await;

        Ok(response)
    }

    /// Delete an entry. The cancellation fan-out goes out before the row
    /// is removed, since its subject/day/time are gone afterwards; a
    /// dispatch failure never aborts the delete.
    #[instrument(skip(db, notifier))]
    pub async fn remove(
        db: &PgPool,
        notifier: &dyn NotificationDispatcher,
        id: TimetableId,
        actor: Actor,
    ) -> Result<(), AppError> {
        let existing = Self::fetch_response(db, id).await?;

        if !actor.is_admin_or(existing.teacher.id) {
            return Err(AppError::forbidden(
                "You can only delete your own timetable entries".to_string(),
            ));
        }

        Self::notify_grade(
            db,
            notifier,
            existing.grade.id,
            "schedule_cancelled",
            "Class Cancelled",
            &format!(
                "The {} class on {} at {}-{} has been cancelled",
                existing.subject.name,
                existing.day_of_week_name,
                existing.start_time,
                existing.end_time
            ),
            serde_json::json!({
                "timetable_id": existing.id,
                "grade_id": existing.grade.id,
            }),
        )
        .await;

        sqlx::query("DELETE FROM timetables WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        Ok(())
    }

    /// Advisory conflict query: the full conflict list, never an error.
    /// When the validity bounds are present only entries with coexisting
    /// windows are reported.
    #[instrument(skip(db))]
    pub async fn find_conflicts(
        db: &PgPool,
        query: ConflictQuery,
    ) -> Result<Vec<ConflictReport>, AppError> {
        Self::validate_slot(&query.start_time, &query.end_time)?;

        let validity = match (query.valid_from, query.valid_until) {
            (Some(from), Some(until)) => Some((from, until)),
            _ => None,
        };

        let conflicts = Self::conflicting_entries(
            db,
            query.teacher_id,
            query.day_of_week,
            &query.start_time,
            &query.end_time,
            validity,
            query.exclude_id,
        )
        .await?;

        let mut reports = Vec::with_capacity(conflicts.len());
        for conflict in conflicts {
            let entry = Self::fetch_response(db, conflict.id).await?;
            reports.push(ConflictReport {
                kind: "TEACHER_BUSY".to_string(),
                message: format!(
                    "Teacher already has a class on {} from {} to {} ({})",
                    day_name(query.day_of_week),
                    entry.start_time,
                    entry.end_time,
                    entry.subject.name
                ),
                entry,
            });
        }

        Ok(reports)
    }

    /// Teachers free for a weekly slot. Validity windows are ignored by
    /// design: this answers "who teaches at this time in a typical
    /// week", not "who is free on one exact date".
    #[instrument(skip(db))]
    pub async fn find_available_teachers(
        db: &PgPool,
        query: AvailabilityQuery,
    ) -> Result<Vec<TeacherSummary>, AppError> {
        Self::validate_slot(&query.start_time, &query.end_time)?;

        let teachers = UserService::active_teachers(db, query.subject_id).await?;

        let busy_slots = sqlx::query_as::<_, (UserId, String, String)>(
            r#"SELECT teacher_id, start_time, end_time FROM timetables
               WHERE day_of_week = $1 AND active = TRUE"#,
        )
        .bind(query.day_of_week)
        .fetch_all(db)
        .await?;

        let mut busy = std::collections::HashSet::new();
        for (teacher_id, start_time, end_time) in busy_slots {
            if times_overlap(&query.start_time, &query.end_time, &start_time, &end_time)? {
                busy.insert(teacher_id);
            }
        }

        Ok(teachers
            .into_iter()
            .filter(|teacher| !busy.contains(&teacher.id))
            .collect())
    }

    /// Best-effort fan-out to the active students of a grade. Failures
    /// are logged and discarded; returns whether the batch was handed to
    /// the dispatcher successfully.
    pub(crate) async fn notify_grade(
        db: &PgPool,
        notifier: &dyn NotificationDispatcher,
        grade_id: GradeId,
        kind: &str,
        title: &str,
        message: &str,
        metadata: serde_json::Value,
    ) -> bool {
        let students = match UserService::students_in_grade(db, grade_id).await {
            Ok(students) => students,
            Err(err) => {
                tracing::error!(%grade_id, error = %err.error, "failed to resolve enrolled students");
                return false;
            }
        };

        if students.is_empty() {
            tracing::info!(%grade_id, "no enrolled students to notify");
            return true;
        }

        let batch: Vec<Notification> = students
            .into_iter()
            .map(|recipient_id| Notification {
                recipient_id,
                kind: kind.to_string(),
                title: title.to_string(),
                message: message.to_string(),
                metadata: metadata.clone(),
            })
            .collect();

        let count = batch.len();
        match notifier.dispatch(batch).await {
            Ok(()) => {
                tracing::info!(%grade_id, count, kind, "sent notifications");
                true
            }
            Err(err) => {
                tracing::error!(%grade_id, error = %err, "failed to send notifications");
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::http::StatusCode;
    use slateboard_core::PaginationParams;

    use crate::modules::notifications::dispatcher::testing::{
        FailingDispatcher, RecordingDispatcher,
    };

    pub(crate) struct TestRefs {
        pub grade_id: GradeId,
        pub subject_id: SubjectId,
        pub medium_id: MediumId,
        pub teacher_id: UserId,
        pub admin_id: UserId,
    }

    pub(crate) async fn seed(pool: &PgPool) -> TestRefs {
        seed_with_year(pool, "2025", true).await
    }

    pub(crate) async fn seed_with_year(pool: &PgPool, year: &str, current: bool) -> TestRefs {
        let grade_id: GradeId =
            sqlx::query_scalar("INSERT INTO grades (name, level) VALUES ('Grade 10', 10) RETURNING id")
                .fetch_one(pool)
                .await
                .unwrap();
        let subject_id: SubjectId = sqlx::query_scalar(
            "INSERT INTO subjects (name, code) VALUES ('Mathematics', 'MATH') RETURNING id",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        let medium_id: MediumId =
            sqlx::query_scalar("INSERT INTO mediums (name) VALUES ('English') RETURNING id")
                .fetch_one(pool)
                .await
                .unwrap();
        let year_id: AcademicYearId = sqlx::query_scalar(
            "INSERT INTO academic_years (year, is_current) VALUES ($1, $2) RETURNING id",
        )
        .bind(year)
        .bind(current)
        .fetch_one(pool)
        .await
        .unwrap();

        let teacher_id = insert_user(pool, "Tamara", "Perera", "TEACHER", None).await;
        let admin_id = insert_user(pool, "Amal", "Silva", "ADMIN", None).await;
        insert_user(pool, "Sam", "Student", "STUDENT", Some(grade_id)).await;
        insert_user(pool, "Sue", "Student", "STUDENT", Some(grade_id)).await;

        sqlx::query(
            r#"INSERT INTO teacher_subject_assignments
               (teacher_id, subject_id, grade_id, medium_id, academic_year_id)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(teacher_id)
        .bind(subject_id)
        .bind(grade_id)
        .bind(medium_id)
        .bind(year_id)
        .execute(pool)
        .await
        .unwrap();

        TestRefs {
            grade_id,
            subject_id,
            medium_id,
            teacher_id,
            admin_id,
        }
    }

    pub(crate) async fn insert_user(
        pool: &PgPool,
        first: &str,
        last: &str,
        role: &str,
        grade_id: Option<GradeId>,
    ) -> UserId {
        sqlx::query_scalar(
            r#"INSERT INTO users (first_name, last_name, email, role, grade_id)
               VALUES ($1, $2, $3, $4, $5) RETURNING id"#,
        )
        .bind(first)
        .bind(last)
        .bind(format!("{}.{}@example.com", first.to_lowercase(), uuid::Uuid::new_v4()))
        .bind(role)
        .bind(grade_id)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub(crate) fn dto(refs: &TestRefs, day: i16, start: &str, end: &str) -> CreateTimetableDto {
        CreateTimetableDto {
            grade_id: Some(refs.grade_id),
            subject_id: Some(refs.subject_id),
            medium_id: Some(refs.medium_id),
            teacher_id: refs.teacher_id,
            academic_year: Some(2025),
            term: Some(1),
            day_of_week: day,
            start_time: start.to_string(),
            end_time: end.to_string(),
            valid_from: date(2025, 1, 1),
            valid_until: date(2025, 6, 30),
            recurring: None,
            recurrence_pattern: None,
            exclude_dates: None,
            class_link: None,
            room_number: None,
            color: None,
            notes: None,
            active: None,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn create_returns_joined_entry(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        let entry = TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();

        assert_eq!(entry.day_of_week_name, "Monday");
        assert_eq!(entry.subject.name, "Mathematics");
        assert_eq!(entry.grade.name, "Grade 10");
        assert_eq!(entry.teacher.id, refs.teacher_id);
        assert!(entry.active);
        // One batch to the grade's two students.
        assert_eq!(notifier.batch_count(), 1);
        assert_eq!(notifier.total_recipients(), 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn overlapping_entry_is_rejected_naming_existing_slot(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();

        let err = TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:30", "10:30"), refs.admin_id)
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::CONFLICT);
        let message = err.error.to_string();
        assert!(message.contains("Monday"), "{message}");
        assert!(message.contains("09:00"), "{message}");
        assert!(message.contains("10:00"), "{message}");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn back_to_back_slots_are_accepted(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();

        let result =
            TimetableService::create(&pool, &notifier, dto(&refs, 1, "10:00", "11:00"), refs.admin_id)
                .await;
        assert!(result.is_ok());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn disjoint_validity_windows_never_conflict(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        let mut term1 = dto(&refs, 1, "09:00", "10:00");
        term1.valid_from = date(2025, 1, 1);
        term1.valid_until = date(2025, 4, 30);
        TimetableService::create(&pool, &notifier, term1, refs.admin_id)
            .await
            .unwrap();

        let mut term3 = dto(&refs, 1, "09:00", "10:00");
        term3.valid_from = date(2025, 9, 1);
        term3.valid_until = date(2025, 12, 20);
        term3.term = Some(3);
        let result = TimetableService::create(&pool, &notifier, term3, refs.admin_id).await;
        assert!(result.is_ok());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn missing_assignment_is_a_hard_rejection(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        // A perfectly valid subject the teacher is simply not assigned to.
        let other_subject: SubjectId = sqlx::query_scalar(
            "INSERT INTO subjects (name, code) VALUES ('Physics', 'PHYS') RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        let mut dto = dto(&refs, 1, "09:00", "10:00");
        dto.subject_id = Some(other_subject);

        let err = TimetableService::create(&pool, &notifier, dto, refs.admin_id)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.error.to_string().contains("assignment"));
        // Nothing was persisted.
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM timetables")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn malformed_time_is_rejected(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        let mut bad = dto(&refs, 1, "9:00", "10:00");
        bad.start_time = "9:00".to_string();
        let err = TimetableService::create(&pool, &notifier, bad, refs.admin_id)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.error.to_string().contains("Invalid time format"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn missing_grade_reference_is_named(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        let mut missing = dto(&refs, 1, "09:00", "10:00");
        missing.grade_id = None;
        let err = TimetableService::create(&pool, &notifier, missing, refs.admin_id)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.error.to_string().contains("grade_id"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn no_current_academic_year_is_reported(pool: PgPool) {
        let refs = seed_with_year(&pool, "2025", false).await;
        let notifier = RecordingDispatcher::default();

        let mut no_year = dto(&refs, 1, "09:00", "10:00");
        no_year.academic_year = None;
        let err = TimetableService::create(&pool, &notifier, no_year, refs.admin_id)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert!(err.error.to_string().contains("current"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn student_cannot_be_the_teacher_of_an_entry(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        let student_id = insert_user(&pool, "Sia", "Student", "STUDENT", Some(refs.grade_id)).await;
        let mut dto = dto(&refs, 1, "09:00", "10:00");
        dto.teacher_id = student_id;

        let err = TimetableService::create(&pool, &notifier, dto, refs.admin_id)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.error.to_string().contains("teacher role"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn cosmetic_update_never_self_conflicts(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        let entry = TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();

        let update = UpdateTimetableDto {
            room_number: Some("B12".to_string()),
            notes: Some("bring lab kits".to_string()),
            ..Default::default()
        };
        let updated = TimetableService::update(
            &pool,
            &notifier,
            entry.id,
            update,
            Actor::teacher(refs.teacher_id),
        )
        .await
        .unwrap();

        assert_eq!(updated.room_number.as_deref(), Some("B12"));
        assert_eq!(updated.start_time, "09:00");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn rescheduling_onto_another_entry_conflicts(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();
        let second =
            TimetableService::create(&pool, &notifier, dto(&refs, 1, "11:00", "12:00"), refs.admin_id)
                .await
                .unwrap();

        let onto_first = UpdateTimetableDto {
            start_time: Some("09:30".to_string()),
            end_time: Some("10:30".to_string()),
            ..Default::default()
        };
        let err = TimetableService::update(
            &pool,
            &notifier,
            second.id,
            onto_first,
            Actor::admin(refs.admin_id),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        // A genuinely free slot is fine.
        let to_free = UpdateTimetableDto {
            start_time: Some("13:00".to_string()),
            end_time: Some("14:00".to_string()),
            ..Default::default()
        };
        let updated = TimetableService::update(
            &pool,
            &notifier,
            second.id,
            to_free,
            Actor::admin(refs.admin_id),
        )
        .await
        .unwrap();
        assert_eq!(updated.start_time, "13:00");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn teacher_field_is_immutable_on_update(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        let entry = TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();
        let substitute = insert_user(&pool, "Nila", "Fernando", "TEACHER", None).await;

        let swap = UpdateTimetableDto {
            teacher_id: Some(substitute),
            ..Default::default()
        };
        let err = TimetableService::update(
            &pool,
            &notifier,
            entry.id,
            swap,
            Actor::admin(refs.admin_id),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert!(err.error.to_string().contains("immutable"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn other_teachers_cannot_touch_the_entry(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        let entry = TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();
        let other = insert_user(&pool, "Nila", "Fernando", "TEACHER", None).await;

        let update = UpdateTimetableDto {
            notes: Some("mine now".to_string()),
            ..Default::default()
        };
        let err = TimetableService::update(&pool, &notifier, entry.id, update, Actor::teacher(other))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let err = TimetableService::remove(&pool, &notifier, entry.id, Actor::teacher(other))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn delete_notifies_once_before_removal(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        let entry = TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();

        TimetableService::remove(&pool, &notifier, entry.id, Actor::admin(refs.admin_id))
            .await
            .unwrap();

        assert_eq!(notifier.kinds(), vec!["new_schedule", "schedule_cancelled"]);
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM timetables")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn delete_succeeds_even_when_dispatch_fails(pool: PgPool) {
        let refs = seed(&pool).await;
        let recording = RecordingDispatcher::default();

        let entry = TimetableService::create(&pool, &recording, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();

        TimetableService::remove(&pool, &FailingDispatcher, entry.id, Actor::admin(refs.admin_id))
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM timetables")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn advisory_query_reports_without_raising(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();

        let reports = TimetableService::find_conflicts(
            &pool,
            ConflictQuery {
                teacher_id: refs.teacher_id,
                day_of_week: 1,
                start_time: "09:30".to_string(),
                end_time: "10:30".to_string(),
                valid_from: None,
                valid_until: None,
                exclude_id: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, "TEACHER_BUSY");
        assert!(reports[0].message.contains("Mathematics"));

        // Validity gate applies when both bounds are given.
        let gated = TimetableService::find_conflicts(
            &pool,
            ConflictQuery {
                teacher_id: refs.teacher_id,
                day_of_week: 1,
                start_time: "09:30".to_string(),
                end_time: "10:30".to_string(),
                valid_from: Some(date(2025, 9, 1)),
                valid_until: Some(date(2025, 12, 20)),
                exclude_id: None,
            },
        )
        .await
        .unwrap();
        assert!(gated.is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn availability_excludes_busy_teachers_and_is_idempotent(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        // A second teacher with no Monday classes.
        let free_teacher = insert_user(&pool, "Nila", "Fernando", "TEACHER", None).await;

        TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();

        let query = || AvailabilityQuery {
            day_of_week: 1,
            start_time: "09:30".to_string(),
            end_time: "10:30".to_string(),
            subject_id: None,
        };

        let available = TimetableService::find_available_teachers(&pool, query())
            .await
            .unwrap();
        let ids: Vec<UserId> = available.iter().map(|t| t.id).collect();
        assert!(ids.contains(&free_teacher));
        assert!(!ids.contains(&refs.teacher_id));

        // Identical inputs, no intervening writes: identical ordered result.
        let again = TimetableService::find_available_teachers(&pool, query())
            .await
            .unwrap();
        let again_ids: Vec<UserId> = again.iter().map(|t| t.id).collect();
        assert_eq!(ids, again_ids);

        // The busy teacher is free once the slot no longer overlaps.
        let later = TimetableService::find_available_teachers(
            &pool,
            AvailabilityQuery {
                day_of_week: 1,
                start_time: "10:00".to_string(),
                end_time: "11:00".to_string(),
                subject_id: None,
            },
        )
        .await
        .unwrap();
        assert!(later.iter().any(|t| t.id == refs.teacher_id));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn today_schedule_layers_same_day_overrides(pool: PgPool) {
        use slateboard_models::changes::{ChangeDetail, CreateChangeDto};

        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        // 2025-03-10 is a Monday.
        let monday = date(2025, 3, 10);
        let entry = TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();

        ChangeService::create_change(
            &pool,
            &notifier,
            CreateChangeDto {
                timetable_id: entry.id,
                change_date: monday,
                detail: ChangeDetail::Cancelled,
                reason: Some("Teacher on leave".to_string()),
            },
            refs.admin_id,
        )
        .await
        .unwrap();

        let today = TimetableService::today_schedule(&pool, monday, None)
            .await
            .unwrap();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].changes.len(), 1);

        // The override is date-specific: the next Monday is unaffected.
        let next_monday = TimetableService::today_schedule(&pool, date(2025, 3, 17), None)
            .await
            .unwrap();
        assert_eq!(next_monday.len(), 1);
        assert!(next_monday[0].changes.is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn week_schedule_buckets_entries_by_concrete_date(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();
        TimetableService::create(&pool, &notifier, dto(&refs, 3, "11:00", "12:00"), refs.admin_id)
            .await
            .unwrap();

        // Grid starting Sunday 2025-03-09.
        let week = TimetableService::week_schedule(&pool, date(2025, 3, 9), None)
            .await
            .unwrap();
        assert_eq!(week.days.len(), 7);
        assert_eq!(week.days[0].day_of_week_name, "Sunday");
        assert_eq!(week.days[1].entries.len(), 1); // Monday
        assert_eq!(week.days[3].entries.len(), 1); // Wednesday
        assert!(week.days[2].entries.is_empty());

        // Outside the validity window the grid is empty.
        let off_season = TimetableService::week_schedule(&pool, date(2025, 8, 3), None)
            .await
            .unwrap();
        assert!(off_season.days.iter().all(|day| day.entries.is_empty()));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn find_all_filters_compose(pool: PgPool) {
        let refs = seed(&pool).await;
        let notifier = RecordingDispatcher::default();

        TimetableService::create(&pool, &notifier, dto(&refs, 1, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();
        TimetableService::create(&pool, &notifier, dto(&refs, 2, "09:00", "10:00"), refs.admin_id)
            .await
            .unwrap();

        let monday_only = TimetableService::find_all(
            &pool,
            TimetableFilterParams {
                day_of_week: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(monday_only.meta.total, 1);
        assert_eq!(monday_only.data.len(), 1);
        assert_eq!(monday_only.data[0].day_of_week, 1);

        let paged = TimetableService::find_all(
            &pool,
            TimetableFilterParams {
                teacher_id: Some(refs.teacher_id),
                pagination: PaginationParams {
                    limit: Some(1),
                    offset: Some(0),
                },
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(paged.meta.total, 2);
        assert_eq!(paged.data.len(), 1);
        assert!(paged.meta.has_more);

        // Point-in-time filter outside the validity window.
        let off_window = TimetableService::find_all(
            &pool,
            TimetableFilterParams {
                date: Some(date(2025, 8, 1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(off_window.meta.total, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn teacher_schedule_rejects_unknown_users(pool: PgPool) {
        seed(&pool).await;

        let err = TimetableService::teacher_schedule(&pool, UserId::new(), date(2025, 3, 10))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
