use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Application, NewApplication, NewStatusChange, StatusChange};
use crate::schema::{application_status_history, applications};
use crate::tracker::{ApplicationStatus, StatusEntry, TrackedApplication};

pub const MAX_TEXT_LENGTH: usize = 255;

/// Inserts the application and its initial APPLIED entry in one transaction.
pub fn create_application(
    conn: &mut PgConnection,
    user_id: Uuid,
    company: &str,
    role: &str,
) -> AppResult<TrackedApplication> {
    let company = required_text("company", company)?;
    let role = required_text("role", role)?;
    let now = Utc::now().naive_utc();

    let new_application = NewApplication {
        id: Uuid::new_v4(),
        user_id,
        company,
        role,
        created_at: now,
    };

    let (application, history) = conn.transaction::<_, AppError, _>(|conn| {
        diesel::insert_into(applications::table)
            .values(&new_application)
            .execute(conn)?;

        let initial = NewStatusChange {
            application_id: new_application.id,
            status: ApplicationStatus::Applied.as_str().to_string(),
            note: None,
            changed_at: now,
        };
        let change: StatusChange = diesel::insert_into(application_status_history::table)
            .values(&initial)
            .get_result(conn)?;

        let application: Application = applications::table
            .find(new_application.id)
            .first(conn)?;
        Ok((application, vec![change]))
    })?;

    tracing::info!(application_id = %application.id, %user_id, "application created");
    Ok(TrackedApplication::new(application, history)?)
}

/// Appends a status entry to an application owned by `user_id`. The status is
/// validated before the ownership lookup; any status may follow any other.
pub fn record_status(
    conn: &mut PgConnection,
    user_id: Uuid,
    application_id: Uuid,
    status: &str,
    note: Option<&str>,
) -> AppResult<StatusEntry> {
    let status: ApplicationStatus = status.parse()?;
    let note = optional_text("note", note)?;

    let owned = applications::table
        .filter(applications::id.eq(application_id))
        .filter(applications::user_id.eq(user_id))
        .select(applications::id)
        .first::<Uuid>(conn)
        .optional()?;
    if owned.is_none() {
        return Err(AppError::not_found());
    }

    let change: StatusChange = diesel::insert_into(application_status_history::table)
        .values(&NewStatusChange {
            application_id,
            status: status.as_str().to_string(),
            note,
            changed_at: Utc::now().naive_utc(),
        })
        .get_result(conn)?;

    tracing::info!(%application_id, %status, "status recorded");
    Ok(StatusEntry::try_from(change)?)
}

/// Loads one application with its history. Applications owned by someone
/// else are reported as not found.
pub fn load_owned_application(
    conn: &mut PgConnection,
    user_id: Uuid,
    application_id: Uuid,
) -> AppResult<TrackedApplication> {
    let application: Application = applications::table
        .filter(applications::id.eq(application_id))
        .filter(applications::user_id.eq(user_id))
        .first(conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    let history: Vec<StatusChange> = StatusChange::belonging_to(&application)
        .order((
            application_status_history::changed_at.asc(),
            application_status_history::id.asc(),
        ))
        .load(conn)?;

    Ok(TrackedApplication::new(application, history)?)
}

/// Loads every application of `user_id`, oldest first, with histories.
pub fn load_user_applications(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> AppResult<Vec<TrackedApplication>> {
    let owned: Vec<Application> = applications::table
        .filter(applications::user_id.eq(user_id))
        .order((applications::created_at.asc(), applications::id.asc()))
        .load(conn)?;

    if owned.is_empty() {
        return Ok(Vec::new());
    }

    let changes: Vec<StatusChange> = StatusChange::belonging_to(&owned)
        .order((
            application_status_history::changed_at.asc(),
            application_status_history::id.asc(),
        ))
        .load(conn)?;
    let grouped = changes.grouped_by(&owned);

    owned
        .into_iter()
        .zip(grouped)
        .map(|(application, history)| {
            TrackedApplication::new(application, history).map_err(AppError::from)
        })
        .collect()
}

fn required_text(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::bad_request(format!("{field} must not be empty")));
    }
    check_length(field, trimmed)?;
    Ok(trimmed.to_string())
}

fn optional_text(field: &str, value: Option<&str>) -> AppResult<Option<String>> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => {
            check_length(field, value)?;
            Ok(Some(value.to_string()))
        }
        None => Ok(None),
    }
}

fn check_length(field: &str, value: &str) -> AppResult<()> {
    if value.chars().count() > MAX_TEXT_LENGTH {
        return Err(AppError::bad_request(format!(
            "{field} must be at most {MAX_TEXT_LENGTH} characters"
        )));
    }
    Ok(())
}
