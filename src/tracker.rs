use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Application, StatusChange};
use crate::utils::time::to_iso;

pub const DEFAULT_STUCK_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Applied,
    Interview,
    Technical,
    Offer,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::Applied,
        ApplicationStatus::Interview,
        ApplicationStatus::Technical,
        ApplicationStatus::Offer,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "APPLIED",
            ApplicationStatus::Interview => "INTERVIEW",
            ApplicationStatus::Technical => "TECHNICAL",
            ApplicationStatus::Offer => "OFFER",
            ApplicationStatus::Rejected => "REJECTED",
        }
    }

    /// Terminal statuses never count towards the stuck list.
    pub fn is_terminal(self) -> bool {
        matches!(self, ApplicationStatus::Offer | ApplicationStatus::Rejected)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = TrackerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| TrackerError::InvalidStatus(value.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("invalid status '{0}', expected one of APPLIED, INTERVIEW, TECHNICAL, OFFER, REJECTED")]
    InvalidStatus(String),
    #[error("application {0} has no status history")]
    EmptyHistory(Uuid),
    #[error("status history entry {entry_id} holds unknown status '{status}'")]
    UnknownStoredStatus { entry_id: i64, status: String },
    #[error("days must not be negative, got {0}")]
    NegativeWindow(i64),
}

/// A validated history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEntry {
    pub id: i64,
    pub status: ApplicationStatus,
    pub note: Option<String>,
    pub changed_at: NaiveDateTime,
}

impl TryFrom<StatusChange> for StatusEntry {
    type Error = TrackerError;

    fn try_from(row: StatusChange) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|_| TrackerError::UnknownStoredStatus {
                entry_id: row.id,
                status: row.status.clone(),
            })?;
        Ok(Self {
            id: row.id,
            status,
            note: row.note,
            changed_at: row.changed_at,
        })
    }
}

/// Returns the entry with the latest `changed_at`. Entries sharing a timestamp
/// resolve to the one inserted last (highest id).
pub fn current_status(history: &[StatusEntry]) -> Option<&StatusEntry> {
    current_index(history).map(|index| &history[index])
}

fn current_index(history: &[StatusEntry]) -> Option<usize> {
    history
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.changed_at.cmp(&b.changed_at).then(a.id.cmp(&b.id)))
        .map(|(index, _)| index)
}

/// An application together with its full, non-empty status history.
#[derive(Debug, Clone)]
pub struct TrackedApplication {
    application: Application,
    history: Vec<StatusEntry>,
    current: usize,
}

impl TrackedApplication {
    pub fn new(application: Application, changes: Vec<StatusChange>) -> Result<Self, TrackerError> {
        let history = changes
            .into_iter()
            .map(StatusEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let current =
            current_index(&history).ok_or(TrackerError::EmptyHistory(application.id))?;
        Ok(Self {
            application,
            history,
            current,
        })
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    pub fn history(&self) -> &[StatusEntry] {
        &self.history
    }

    pub fn current(&self) -> &StatusEntry {
        &self.history[self.current]
    }

    pub fn summary(&self) -> ApplicationSummary {
        ApplicationSummary {
            id: self.application.id,
            company: self.application.company.clone(),
            role: self.application.role.clone(),
            current_status: self.current().status,
            created_at: to_iso(self.application.created_at),
        }
    }

    pub fn digest(&self) -> ApplicationDigest {
        let current = self.current();
        ApplicationDigest {
            company: self.application.company.clone(),
            role: self.application.role.clone(),
            status: current.status,
            updated: to_iso(current.changed_at),
        }
    }

    pub fn stuck_view(&self) -> StuckApplication {
        let current = self.current();
        StuckApplication {
            id: self.application.id,
            company: self.application.company.clone(),
            role: self.application.role.clone(),
            status: current.status,
            last_update: to_iso(current.changed_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationSummary {
    pub id: Uuid,
    pub company: String,
    pub role: String,
    pub current_status: ApplicationStatus,
    pub created_at: String,
}

/// Compact view handed to the assistant when summarising a job search.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationDigest {
    pub company: String,
    pub role: String,
    pub status: ApplicationStatus,
    pub updated: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StuckApplication {
    pub id: Uuid,
    pub company: String,
    pub role: String,
    pub status: ApplicationStatus,
    pub last_update: String,
}

/// Keeps applications whose current status is non-terminal and older than
/// `now - days`, in input order.
pub fn stuck(
    applications: &[TrackedApplication],
    days: i64,
    now: NaiveDateTime,
) -> Result<Vec<&TrackedApplication>, TrackerError> {
    if days < 0 {
        return Err(TrackerError::NegativeWindow(days));
    }

    // A window reaching past the representable range leaves nothing stale.
    let Some(threshold) = Duration::try_days(days).and_then(|window| now.checked_sub_signed(window))
    else {
        return Ok(Vec::new());
    };

    Ok(applications
        .iter()
        .filter(|app| {
            let current = app.current();
            !current.status.is_terminal() && current.changed_at < threshold
        })
        .collect())
}
