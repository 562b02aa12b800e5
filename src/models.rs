use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Intern,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Intern => "intern",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "intern" => Some(Role::Intern),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub university: Option<String>,
    pub field: Option<String>,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_intern(&self) -> bool {
        self.role == Role::Intern
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub university: Option<String>,
    pub field: Option<String>,
    pub password: Option<String>,
}

/// Profile edit. `None` keeps the current value; an empty string clears it.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub university: Option<String>,
    pub field: Option<String>,
    pub avatar: Option<String>,
}

/// Evidence attached to a report. Older records carry links, newer ones photos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "urls", rename_all = "lowercase")]
pub enum ReportContent {
    Links(Vec<String>),
    Photos(Vec<String>),
}

impl ReportContent {
    pub fn kind(&self) -> &'static str {
        match self {
            ReportContent::Links(_) => "links",
            ReportContent::Photos(_) => "photos",
        }
    }

    pub fn urls(&self) -> &[String] {
        match self {
            ReportContent::Links(urls) | ReportContent::Photos(urls) => urls,
        }
    }

    pub fn from_parts(kind: &str, urls: Vec<String>) -> Option<ReportContent> {
        match kind {
            "links" => Some(ReportContent::Links(urls)),
            "photos" => Some(ReportContent::Photos(urls)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub intern_id: String,
    /// Display-only submission time, e.g. `06/05/2025 11:15:59`.
    pub timestamp: String,
    pub report_date: NaiveDate,
    pub content: ReportContent,
    /// Machine timestamp, RFC 3339 or `YYYY-MM-DDTHH:MM:SS` (read as UTC).
    pub created_at: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("report {0} has no intern id")]
    MissingIntern(String),
    #[error("report {id} has an unreadable created_at {value:?}")]
    BadTimestamp { id: String, value: String },
}

impl Report {
    pub fn created_instant(&self) -> Result<DateTime<Utc>, RecordError> {
        parse_instant(&self.created_at).ok_or_else(|| RecordError::BadTimestamp {
            id: self.id.clone(),
            value: self.created_at.clone(),
        })
    }

    /// Owner and creation instant, or the reason this record cannot be aggregated.
    pub fn checked(&self) -> Result<(&str, DateTime<Utc>), RecordError> {
        if self.intern_id.trim().is_empty() {
            return Err(RecordError::MissingIntern(self.id.clone()));
        }
        Ok((self.intern_id.as_str(), self.created_instant()?))
    }
}

pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InternStats {
    pub total_reports: usize,
    pub submitted_this_week: usize,
    pub last_submission: Option<DateTime<Utc>>,
    pub submission_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InternWithStats {
    pub intern: User,
    pub stats: InternStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionStatus {
    pub intern: User,
    pub has_submitted: bool,
    pub last_submission: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReportCount {
    pub field: String,
    pub report_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_interns: usize,
    pub total_reports: usize,
    pub active_interns: usize,
    pub reports_this_week: usize,
    pub submission_rate: f64,
}
