use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Field, NewUser, ProfileUpdate, Report, ReportContent, Role, User};
use crate::seed;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("invalid email address {0:?}")]
    InvalidEmail(String),
    #[error("email {0} is already registered")]
    DuplicateEmail(String),
    #[error("admin accounts cannot carry a university or field")]
    AdminWithPlacement,
    #[error("interns need both a university and a field")]
    MissingPlacement,
    #[error("no intern with id {0}")]
    UnknownIntern(String),
    #[error("no user with id {0}")]
    UnknownUser(String),
    #[error("a report needs at least one link or photo")]
    EmptyContent,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Access to users and reports. Reports are append-only; users can edit their profile.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    async fn list_reports(&self) -> Result<Vec<Report>, StoreError>;
    async fn list_reports_by_intern(&self, intern_id: &str) -> Result<Vec<Report>, StoreError>;
    async fn list_fields(&self) -> Result<Vec<Field>, StoreError>;
    async fn add_user(&self, user: User, password: Option<String>) -> Result<User, StoreError>;
    async fn add_report(&self, report: Report) -> Result<Report, StoreError>;
    async fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<User, StoreError>;
    async fn password_for(&self, user_id: &str) -> Result<Option<String>, StoreError>;
}

pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    passwords: RwLock<HashMap<String, String>>,
    reports: RwLock<Vec<Report>>,
    fields: Vec<Field>,
}

impl MemoryStore {
    pub fn new(users: Vec<User>, reports: Vec<Report>, fields: Vec<Field>) -> Self {
        Self {
            users: RwLock::new(users),
            passwords: RwLock::new(HashMap::new()),
            reports: RwLock::new(reports),
            fields,
        }
    }

    pub fn seeded() -> anyhow::Result<Self> {
        let users = seed::users()?;
        let passwords = users
            .iter()
            .map(|user| (user.id.clone(), seed::password(user).to_string()))
            .collect();
        let store = Self::new(users, seed::reports()?, seed::fields());
        Ok(Self {
            passwords: RwLock::new(passwords),
            ..store
        })
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.read().await.clone())
    }

    async fn list_reports(&self) -> Result<Vec<Report>, StoreError> {
        Ok(self.reports.read().await.clone())
    }

    async fn list_reports_by_intern(&self, intern_id: &str) -> Result<Vec<Report>, StoreError> {
        Ok(self
            .reports
            .read()
            .await
            .iter()
            .filter(|report| report.intern_id == intern_id)
            .cloned()
            .collect())
    }

    async fn list_fields(&self) -> Result<Vec<Field>, StoreError> {
        Ok(self.fields.clone())
    }

    async fn add_user(&self, user: User, password: Option<String>) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::DuplicateEmail(user.email));
        }
        if let Some(password) = password {
            self.passwords.write().await.insert(user.id.clone(), password);
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn add_report(&self, report: Report) -> Result<Report, StoreError> {
        self.reports.write().await.push(report.clone());
        Ok(report)
    }

    async fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        let index = users
            .iter()
            .position(|user| user.id == user_id)
            .ok_or_else(|| StoreError::UnknownUser(user_id.to_string()))?;
        let updated = apply_profile_update(&users[index], update, &users)?;
        users[index] = updated.clone();
        Ok(updated)
    }

    async fn password_for(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.passwords.read().await.get(user_id).cloned())
    }
}

pub async fn list_interns(store: &dyn ReportStore) -> Result<Vec<User>, StoreError> {
    Ok(store
        .list_users()
        .await?
        .into_iter()
        .filter(User::is_intern)
        .collect())
}

pub async fn find_intern(store: &dyn ReportStore, intern_id: &str) -> Result<Option<User>, StoreError> {
    Ok(list_interns(store)
        .await?
        .into_iter()
        .find(|intern| intern.id == intern_id))
}

pub async fn find_user(store: &dyn ReportStore, user_id: &str) -> Result<Option<User>, StoreError> {
    Ok(store
        .list_users()
        .await?
        .into_iter()
        .find(|user| user.id == user_id))
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_name(name: &str) -> Result<String, StoreError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(StoreError::EmptyName);
    }
    Ok(name)
}

/// Well-formed and not used by anyone other than `owner`.
fn check_email(email: &str, owner: Option<&str>, existing: &[User]) -> Result<String, StoreError> {
    let email = email.trim().to_string();
    let well_formed = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
        .unwrap_or(false);
    if !well_formed {
        return Err(StoreError::InvalidEmail(email));
    }
    if existing
        .iter()
        .any(|user| Some(user.id.as_str()) != owner && user.email.eq_ignore_ascii_case(&email))
    {
        return Err(StoreError::DuplicateEmail(email));
    }
    Ok(email)
}

fn check_placement(
    role: Role,
    university: &Option<String>,
    field: &Option<String>,
) -> Result<(), StoreError> {
    match role {
        Role::Admin if university.is_some() || field.is_some() => Err(StoreError::AdminWithPlacement),
        Role::Intern if university.is_none() || field.is_none() => Err(StoreError::MissingPlacement),
        _ => Ok(()),
    }
}

pub fn validate_new_user(new_user: NewUser, existing: &[User]) -> Result<NewUser, StoreError> {
    let name = check_name(&new_user.name)?;
    let email = check_email(&new_user.email, None, existing)?;
    let university = clean(new_user.university);
    let field = clean(new_user.field);
    check_placement(new_user.role, &university, &field)?;

    Ok(NewUser {
        name,
        email,
        role: new_user.role,
        university,
        field,
        password: new_user.password.filter(|p| !p.is_empty()),
    })
}

/// The user after `update`, checked with the registration rules. The role never changes.
pub fn apply_profile_update(
    user: &User,
    update: ProfileUpdate,
    existing: &[User],
) -> Result<User, StoreError> {
    let name = match update.name {
        Some(name) => check_name(&name)?,
        None => user.name.clone(),
    };
    let email = match update.email {
        Some(email) => check_email(&email, Some(&user.id), existing)?,
        None => user.email.clone(),
    };
    let university = match update.university {
        Some(value) => clean(Some(value)),
        None => user.university.clone(),
    };
    let field = match update.field {
        Some(value) => clean(Some(value)),
        None => user.field.clone(),
    };
    check_placement(user.role, &university, &field)?;
    let avatar = match update.avatar {
        Some(value) => clean(Some(value)),
        None => user.avatar.clone(),
    };

    Ok(User {
        id: user.id.clone(),
        name,
        email,
        role: user.role,
        university,
        field,
        avatar,
        created_at: user.created_at,
    })
}

pub async fn register_user(
    store: &dyn ReportStore,
    new_user: NewUser,
    now: DateTime<Utc>,
) -> Result<User, StoreError> {
    let existing = store.list_users().await?;
    let valid = validate_new_user(new_user, &existing)?;
    let prefix = valid.role.as_str();

    let user = User {
        id: format!("{prefix}-{}", Uuid::new_v4()),
        avatar: Some(format!(
            "https://api.dicebear.com/7.x/avataaars/svg?seed={}",
            valid.name.split_whitespace().next().unwrap_or(prefix)
        )),
        name: valid.name,
        email: valid.email,
        role: valid.role,
        university: valid.university,
        field: valid.field,
        created_at: now,
    };

    let user = store.add_user(user, valid.password).await?;
    info!(user_id = %user.id, role = user.role.as_str(), "registered user");
    Ok(user)
}

/// Mock sign-in: the user whose email and stored password both match exactly.
pub async fn login(
    store: &dyn ReportStore,
    email: &str,
    password: &str,
) -> Result<Option<User>, StoreError> {
    let Some(user) = store
        .list_users()
        .await?
        .into_iter()
        .find(|user| user.email == email.trim())
    else {
        return Ok(None);
    };

    match store.password_for(&user.id).await? {
        Some(stored) if stored == password => {
            info!(user_id = %user.id, "signed in");
            Ok(Some(user))
        }
        _ => Ok(None),
    }
}

/// Display form of a submission instant, e.g. `07/05/2025 0:08:46`.
pub fn display_timestamp(now: DateTime<Utc>, offset: FixedOffset) -> String {
    now.with_timezone(&offset)
        .format("%d/%m/%Y %-H:%M:%S")
        .to_string()
}

pub async fn submit_report(
    store: &dyn ReportStore,
    intern_id: &str,
    report_date: NaiveDate,
    content: ReportContent,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<Report, StoreError> {
    if find_intern(store, intern_id).await?.is_none() {
        return Err(StoreError::UnknownIntern(intern_id.to_string()));
    }
    if content.urls().iter().all(|url| url.trim().is_empty()) {
        return Err(StoreError::EmptyContent);
    }

    let report = Report {
        id: format!("report-{}", Uuid::new_v4()),
        intern_id: intern_id.to_string(),
        timestamp: display_timestamp(now, offset),
        report_date,
        content,
        created_at: now.to_rfc3339(),
    };
    debug!(report_id = %report.id, items = report.content.urls().len(), "storing report");

    let report = store.add_report(report).await?;
    info!(report_id = %report.id, %intern_id, "report submitted");
    Ok(report)
}
