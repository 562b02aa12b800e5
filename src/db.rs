use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::models::{Field, ProfileUpdate, Report, ReportContent, Role, User};
use crate::seed;
use crate::store::{apply_profile_update, ReportStore, StoreError};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let store = PgStore::new(pool.clone());

    for field in seed::fields() {
        sqlx::query(
            r#"
            INSERT INTO magang.fields (id, name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
            "#,
        )
        .bind(&field.id)
        .bind(&field.name)
        .execute(pool)
        .await?;
    }

    for user in seed::users()? {
        sqlx::query(
            r#"
            INSERT INTO magang.users
            (id, name, email, role, university, field, avatar, created_at, password)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name, university = EXCLUDED.university, field = EXCLUDED.field,
                password = COALESCE(magang.users.password, EXCLUDED.password)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.university)
        .bind(&user.field)
        .bind(&user.avatar)
        .bind(user.created_at)
        .bind(seed::password(&user))
        .execute(pool)
        .await?;
    }

    let mut inserted = 0u64;
    for report in seed::reports()? {
        inserted += store.insert_report(&report, true).await?;
    }
    info!(inserted, "seed reports stored");

    Ok(())
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_report(&self, report: &Report, skip_existing: bool) -> Result<u64, StoreError> {
        let created_at = report.created_instant().map_err(|err| StoreError::Corrupt(err.to_string()))?;
        let conflict = if skip_existing {
            " ON CONFLICT (id) DO NOTHING"
        } else {
            ""
        };
        let query = format!(
            "INSERT INTO magang.reports \
             (id, intern_id, display_timestamp, report_date, content_kind, content_urls, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7){conflict}"
        );

        let result = sqlx::query(&query)
            .bind(&report.id)
            .bind(&report.intern_id)
            .bind(&report.timestamp)
            .bind(report.report_date)
            .bind(report.content.kind())
            .bind(report.content.urls().to_vec())
            .bind(created_at)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let role: String = row.get("role");
    let role = Role::parse(&role).ok_or_else(|| StoreError::Corrupt(format!("unknown role {role:?}")))?;

    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        role,
        university: row.get("university"),
        field: row.get("field"),
        avatar: row.get("avatar"),
        created_at: row.get("created_at"),
    })
}

fn report_from_row(row: &PgRow) -> Result<Report, StoreError> {
    let kind: String = row.get("content_kind");
    let urls: Vec<String> = row.get("content_urls");
    let content = ReportContent::from_parts(&kind, urls)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown report content {kind:?}")))?;
    let created_at: DateTime<Utc> = row.get("created_at");
    let report_date: NaiveDate = row.get("report_date");

    Ok(Report {
        id: row.get("id"),
        intern_id: row.get("intern_id"),
        timestamp: row.get("display_timestamp"),
        report_date,
        content,
        created_at: created_at.to_rfc3339(),
    })
}

const REPORT_COLUMNS: &str =
    "id, intern_id, display_timestamp, report_date, content_kind, content_urls, created_at";

#[async_trait]
impl ReportStore for PgStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, email, role, university, field, avatar, created_at \
             FROM magang.users ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    async fn list_reports(&self) -> Result<Vec<Report>, StoreError> {
        let query = format!("SELECT {REPORT_COLUMNS} FROM magang.reports ORDER BY created_at, id");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(report_from_row).collect()
    }

    async fn list_reports_by_intern(&self, intern_id: &str) -> Result<Vec<Report>, StoreError> {
        let query = format!(
            "SELECT {REPORT_COLUMNS} FROM magang.reports WHERE intern_id = $1 ORDER BY created_at, id"
        );
        let rows = sqlx::query(&query)
            .bind(intern_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(report_from_row).collect()
    }

    async fn list_fields(&self) -> Result<Vec<Field>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM magang.fields ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| Field {
                id: row.get("id"),
                name: row.get("name"),
            })
            .collect())
    }

    async fn add_user(&self, user: User, password: Option<String>) -> Result<User, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO magang.users
            (id, name, email, role, university, field, avatar, created_at, password)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.university)
        .bind(&user.field)
        .bind(&user.avatar)
        .bind(user.created_at)
        .bind(password)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::DuplicateEmail(user.email));
        }
        Ok(user)
    }

    async fn add_report(&self, report: Report) -> Result<Report, StoreError> {
        self.insert_report(&report, false).await?;
        Ok(report)
    }

    async fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<User, StoreError> {
        let users = self.list_users().await?;
        let current = users
            .iter()
            .find(|user| user.id == user_id)
            .ok_or_else(|| StoreError::UnknownUser(user_id.to_string()))?;
        let updated = apply_profile_update(current, update, &users)?;

        let result = sqlx::query(
            r#"
            UPDATE magang.users
            SET name = $2, email = $3, university = $4, field = $5, avatar = $6
            WHERE id = $1
            "#,
        )
        .bind(&updated.id)
        .bind(&updated.name)
        .bind(&updated.email)
        .bind(&updated.university)
        .bind(&updated.field)
        .bind(&updated.avatar)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UnknownUser(user_id.to_string()));
        }
        info!(%user_id, "profile updated");
        Ok(updated)
    }

    async fn password_for(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT password FROM magang.users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.and_then(|row| row.get::<Option<String>, _>("password")))
    }
}
