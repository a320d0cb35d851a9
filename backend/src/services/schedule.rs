//! Job schedules posted by HHMs and worker applications to them

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    answer, ensure_no_active, like_pattern, Application, ApplicationStatus, Decision,
    NotificationKind, Schedule, ScheduleStatus, UserRole, WorkflowStatus,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use super::notification::{EntityRef, NewNotification, NotificationService};
use super::user::UserService;
use super::parse_stored;

/// Schedule and application service
#[derive(Clone)]
pub struct ScheduleService {
    db: PgPool,
    users: UserService,
    notifications: NotificationService,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleInput {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 100, message = "Work type is required"))]
    pub work_type: String,
    #[validate(length(min = 1, max = 200, message = "Location is required"))]
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(range(min = 1, max = 1000, message = "Workers needed must be between 1 and 1000"))]
    pub workers_needed: i32,
    pub wage_per_day: Decimal,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyInput {
    pub application_message: Option<String>,
    /// Defaults to the skills on the worker's profile
    pub worker_skills: Option<Vec<String>>,
    pub expected_wage: Option<Decimal>,
    pub availability: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondApplicationInput {
    #[serde(alias = "status")]
    pub decision: Decision,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleFilter {
    pub location: Option<String>,
}

#[derive(Debug, FromRow)]
struct ScheduleRow {
    id: Uuid,
    hhm_id: Uuid,
    title: String,
    work_type: String,
    location: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    workers_needed: i32,
    wage_per_day: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ScheduleRow> for Schedule {
    type Error = AppError;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        Ok(Schedule {
            id: row.id,
            hhm_id: row.hhm_id,
            title: row.title,
            work_type: row.work_type,
            location: row.location,
            start_date: row.start_date,
            end_date: row.end_date,
            workers_needed: row.workers_needed,
            wage_per_day: row.wage_per_day,
            status: parse_stored::<ScheduleStatus>(&row.status)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ApplicationRow {
    id: Uuid,
    schedule_id: Uuid,
    worker_id: Uuid,
    application_message: Option<String>,
    worker_skills: Vec<String>,
    expected_wage: Option<Decimal>,
    availability: Option<String>,
    status: String,
    responded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = AppError;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        Ok(Application {
            id: row.id,
            schedule_id: row.schedule_id,
            worker_id: row.worker_id,
            application_message: row.application_message,
            worker_skills: row.worker_skills,
            expected_wage: row.expected_wage,
            availability: row.availability,
            status: parse_stored::<ApplicationStatus>(&row.status)?,
            responded_at: row.responded_at,
            created_at: row.created_at,
        })
    }
}

const SCHEDULE_COLUMNS: &str = "id, hhm_id, title, work_type, location, start_date, end_date, \
                                workers_needed, wage_per_day, status, created_at";

const APPLICATION_COLUMNS: &str = "id, schedule_id, worker_id, application_message, worker_skills, \
                                   expected_wage, availability, status, responded_at, created_at";

/// Trim, drop blanks and de-duplicate skills, keeping first-seen order
pub fn normalize_skills(skills: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for skill in skills {
        let skill = skill.trim();
        if !skill.is_empty() && !out.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
            out.push(skill.to_string());
        }
    }
    out
}

impl ScheduleService {
    pub fn new(db: PgPool) -> Self {
        Self {
            users: UserService::new(db.clone()),
            notifications: NotificationService::new(db.clone()),
            db,
        }
    }

    // ========================================================================
    // Schedules
    // ========================================================================

    pub async fn create(&self, hhm: &AuthUser, input: CreateScheduleInput) -> AppResult<Schedule> {
        hhm.require_role(&[UserRole::Hhm])?;
        input.validate()?;
        shared::validate_date_range(input.start_date, input.end_date)
            .map_err(|msg| AppError::validation("endDate", msg))?;
        shared::validate_wage(input.wage_per_day)
            .map_err(|msg| AppError::validation("wagePerDay", msg))?;

        let row = sqlx::query_as::<_, ScheduleRow>(&format!(
            r#"
            INSERT INTO schedules (id, hhm_id, title, work_type, location, start_date, end_date,
                                   workers_needed, wage_per_day, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'open')
            RETURNING {}
            "#,
            SCHEDULE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(hhm.user_id)
        .bind(input.title.trim())
        .bind(input.work_type.trim())
        .bind(input.location.trim())
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.workers_needed)
        .bind(input.wage_per_day)
        .fetch_one(&self.db)
        .await?;

        let schedule = Schedule::try_from(row)?;
        tracing::info!(schedule_id = %schedule.id, hhm_id = %hhm.user_id, "Schedule posted");
        Ok(schedule)
    }

    /// Open schedules, optionally filtered by a location substring
    pub async fn list_open(&self, filter: &ScheduleFilter) -> AppResult<Vec<Schedule>> {
        let location = filter
            .location
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
            r#"
            SELECT {}
            FROM schedules
            WHERE status = 'open' AND ($1::text IS NULL OR location ILIKE $1 ESCAPE '\')
            ORDER BY start_date, created_at DESC
            "#,
            SCHEDULE_COLUMNS
        ))
        .bind(&location)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Schedule::try_from).collect()
    }

    pub async fn mine(&self, hhm: &AuthUser) -> AppResult<Vec<Schedule>> {
        hhm.require_role(&[UserRole::Hhm])?;

        let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
            "SELECT {} FROM schedules WHERE hhm_id = $1 ORDER BY created_at DESC",
            SCHEDULE_COLUMNS
        ))
        .bind(hhm.user_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Schedule::try_from).collect()
    }

    async fn find_schedule(&self, schedule_id: Uuid) -> AppResult<Schedule> {
        let row = sqlx::query_as::<_, ScheduleRow>(&format!(
            "SELECT {} FROM schedules WHERE id = $1",
            SCHEDULE_COLUMNS
        ))
        .bind(schedule_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Schedule".to_string()))?;

        Schedule::try_from(row)
    }

    async fn owned_schedule(&self, hhm: &AuthUser, schedule_id: Uuid) -> AppResult<Schedule> {
        let schedule = self.find_schedule(schedule_id).await?;
        if schedule.hhm_id != hhm.user_id {
            return Err(AppError::Forbidden("Not the owner of this schedule".to_string()));
        }
        Ok(schedule)
    }

    /// Stop accepting applications
    pub async fn close(&self, hhm: &AuthUser, schedule_id: Uuid) -> AppResult<Schedule> {
        self.owned_schedule(hhm, schedule_id).await?;

        let row = sqlx::query_as::<_, ScheduleRow>(&format!(
            r#"
            UPDATE schedules SET status = 'closed'
            WHERE id = $1 AND status = 'open'
            RETURNING {}
            "#,
            SCHEDULE_COLUMNS
        ))
        .bind(schedule_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::InvalidStateTransition("schedule already closed".to_string()))?;

        tracing::info!(schedule_id = %schedule_id, "Schedule closed");
        Schedule::try_from(row)
    }

    // ========================================================================
    // Applications
    // ========================================================================

    /// Worker applies to an open schedule
    pub async fn apply(&self, worker: &AuthUser, schedule_id: Uuid, input: ApplyInput) -> AppResult<Application> {
        worker.require_role(&[UserRole::Worker])?;

        let schedule = self.find_schedule(schedule_id).await?;
        if schedule.status != ScheduleStatus::Open {
            return Err(AppError::InvalidStateTransition("schedule is closed".to_string()));
        }

        if let Some(wage) = input.expected_wage {
            shared::validate_wage(wage)
                .map_err(|msg| AppError::validation("expectedWage", msg))?;
        }

        let existing = sqlx::query_scalar::<_, String>(
            "SELECT status FROM applications WHERE schedule_id = $1 AND worker_id = $2",
        )
        .bind(schedule_id)
        .bind(worker.user_id)
        .fetch_all(&self.db)
        .await?
        .iter()
        .map(|s| parse_stored::<ApplicationStatus>(s))
        .collect::<AppResult<Vec<_>>>()?;
        ensure_no_active(existing)?;

        let skills = match input.worker_skills {
            Some(skills) => normalize_skills(&skills),
            None => {
                let profile = self.users.get_user(worker.user_id).await?.profile;
                normalize_skills(profile.skills())
            }
        };

        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            r#"
            INSERT INTO applications (id, schedule_id, worker_id, application_message, worker_skills,
                                      expected_wage, availability, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending')
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(schedule_id)
        .bind(worker.user_id)
        .bind(input.application_message.map(|m| m.trim().to_string()).filter(|m| !m.is_empty()))
        .bind(&skills)
        .bind(input.expected_wage)
        .bind(input.availability.map(|a| a.trim().to_string()).filter(|a| !a.is_empty()))
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            AppError::from_unique_violation(
                e,
                "application",
                "You have already applied to this schedule",
            )
        })?;

        let application = Application::try_from(row)?;
        tracing::info!(
            application_id = %application.id,
            schedule_id = %schedule_id,
            worker_id = %worker.user_id,
            "Application submitted"
        );

        let worker_name = self.users.display_name(worker.user_id).await;
        self.notifications
            .notify(NewNotification {
                user_id: schedule.hhm_id,
                kind: NotificationKind::ApplicationReceived,
                title: "New job application".to_string(),
                message: format!("{} applied to \"{}\"", worker_name, schedule.title),
                entity: Some(EntityRef::new("application", application.id)),
            })
            .await;

        Ok(application)
    }

    /// Applications to a schedule, for its HHM
    pub async fn applications_for(&self, hhm: &AuthUser, schedule_id: Uuid) -> AppResult<Vec<Application>> {
        self.owned_schedule(hhm, schedule_id).await?;

        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {} FROM applications WHERE schedule_id = $1 ORDER BY created_at",
            APPLICATION_COLUMNS
        ))
        .bind(schedule_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Application::try_from).collect()
    }

    pub async fn my_applications(&self, worker: &AuthUser) -> AppResult<Vec<Application>> {
        worker.require_role(&[UserRole::Worker])?;

        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {} FROM applications WHERE worker_id = $1 ORDER BY created_at DESC",
            APPLICATION_COLUMNS
        ))
        .bind(worker.user_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Application::try_from).collect()
    }

    /// Schedule owner accepts or rejects an application
    pub async fn respond_application(
        &self,
        hhm: &AuthUser,
        application_id: Uuid,
        input: RespondApplicationInput,
    ) -> AppResult<Application> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {} FROM applications WHERE id = $1",
            APPLICATION_COLUMNS
        ))
        .bind(application_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Application".to_string()))?;
        let application = Application::try_from(row)?;

        let schedule = self.find_schedule(application.schedule_id).await?;
        if schedule.hhm_id != hhm.user_id {
            return Err(AppError::Forbidden(
                "Only the schedule's HHM can respond".to_string(),
            ));
        }

        let response = answer(application.status, input.decision, None, Utc::now())?;

        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            r#"
            UPDATE applications
            SET status = $2, responded_at = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        ))
        .bind(application_id)
        .bind(response.status.as_str())
        .bind(response.responded_at)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::InvalidStateTransition("application already responded".to_string()))?;

        let updated = Application::try_from(row)?;
        tracing::info!(application_id = %updated.id, status = %updated.status, "Application responded");

        let verb = if updated.status == ApplicationStatus::accepted() {
            "accepted"
        } else {
            "rejected"
        };
        self.notifications
            .notify(NewNotification {
                user_id: updated.worker_id,
                kind: NotificationKind::ApplicationResponded,
                title: format!("Application {}", verb),
                message: format!("Your application to \"{}\" was {}", schedule.title, verb),
                entity: Some(EntityRef::new("application", updated.id)),
            })
            .await;

        Ok(updated)
    }
}
