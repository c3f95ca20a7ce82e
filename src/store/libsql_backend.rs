//! libSQL backend — async `AccountDirectory` implementation.
//!
//! Supports local file and in-memory databases. The in-memory form backs the
//! test suites; the file form is what an embedding application would open.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DirectoryError;
use crate::store::migrations;
use crate::store::model::{
    AccountRecord, AccountRole, OrgAdminLink, OrganizationProfile, VolunteerProfile,
};
use crate::store::traits::AccountDirectory;

/// libSQL-backed Account Directory.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlDirectory {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
}

impl LibSqlDirectory {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DirectoryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DirectoryError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DirectoryError::Connection(format!("Failed to open database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DirectoryError::Connection(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        info!(path = %path.display(), "Account directory opened");
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Create an in-memory directory (for tests).
    pub async fn new_memory() -> Result<Self, DirectoryError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DirectoryError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DirectoryError::Connection(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Convert `Option<&str>` to a libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Classify a failed insert: duplicate keys surface as `Constraint`.
fn write_err(op: &str, e: libsql::Error) -> DirectoryError {
    let msg = e.to_string();
    if msg.contains("UNIQUE constraint") || msg.contains("constraint failed") {
        DirectoryError::Constraint(format!("{op}: {msg}"))
    } else {
        DirectoryError::Write(format!("{op}: {msg}"))
    }
}

/// Map a libsql Row to an AccountRecord.
///
/// Column order matches ACCOUNT_COLUMNS:
/// 0:id, 1:name, 2:role, 3:onboarding_complete, 4:created_at, 5:account_type
fn row_to_account(row: &libsql::Row) -> Result<AccountRecord, libsql::Error> {
    let role_str: String = row.get(2)?;
    let complete: i64 = row.get(3)?;
    let created_str: String = row.get(4)?;

    Ok(AccountRecord {
        identity_id: row.get(0)?,
        display_name: row.get(1)?,
        role: role_str.parse().unwrap_or(AccountRole::Volunteer),
        onboarding_complete: complete != 0,
        created_at: parse_datetime(&created_str),
        account_type: row.get(5)?,
    })
}

const ACCOUNT_COLUMNS: &str = "id, name, role, onboarding_complete, created_at, account_type";

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl AccountDirectory for LibSqlDirectory {
    async fn find_account(
        &self,
        identity_id: &str,
    ) -> Result<Option<AccountRecord>, DirectoryError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = ?1"),
                params![identity_id],
            )
            .await
            .map_err(|e| DirectoryError::Query(format!("find_account: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let record = row_to_account(&row)
                    .map_err(|e| DirectoryError::Query(format!("find_account row parse: {e}")))?;
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DirectoryError::Query(format!("find_account: {e}"))),
        }
    }

    async fn insert_account(&self, record: &AccountRecord) -> Result<(), DirectoryError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (id, name, role, onboarding_complete, created_at, account_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.identity_id.clone(),
                record.display_name.clone(),
                record.role.as_str(),
                record.onboarding_complete as i64,
                record.created_at.to_rfc3339(),
                record.account_type.clone(),
            ],
        )
        .await
        .map_err(|e| write_err("insert_account", e))?;

        debug!(identity_id = %record.identity_id, role = %record.role, "Account record inserted");
        Ok(())
    }

    async fn insert_volunteer(&self, profile: &VolunteerProfile) -> Result<(), DirectoryError> {
        let skills = serde_json::to_string(&profile.skills)
            .map_err(|e| DirectoryError::Serialization(e.to_string()))?;
        let now = Utc::now().to_rfc3339();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO volunteers (user_id, display_name, bio, skills, availability, city, region, country, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                profile.identity_id.clone(),
                profile.display_name.clone(),
                profile.bio.clone(),
                skills,
                profile.availability.clone(),
                profile.city.clone(),
                profile.region.clone(),
                profile.country.clone(),
                now,
            ],
        )
        .await
        .map_err(|e| write_err("insert_volunteer", e))?;

        debug!(identity_id = %profile.identity_id, "Volunteer profile inserted");
        Ok(())
    }

    async fn insert_organization(
        &self,
        profile: &OrganizationProfile,
    ) -> Result<(), DirectoryError> {
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO organizations (id, name, description, website, created_by, owner_user_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.to_string(),
                profile.name.clone(),
                profile.description.clone(),
                opt_text(profile.website.as_deref()),
                profile.created_by.clone(),
                profile.owner_identity_id.clone(),
                now,
            ],
        )
        .await
        .map_err(|e| write_err("insert_organization", e))?;

        debug!(organization = %profile.name, created_by = %profile.created_by, "Organization inserted");
        Ok(())
    }

    async fn find_organization_id(&self, created_by: &str) -> Result<Uuid, DirectoryError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT id FROM organizations WHERE created_by = ?1
                 ORDER BY created_at DESC LIMIT 1",
                params![created_by],
            )
            .await
            .map_err(|e| DirectoryError::Query(format!("find_organization_id: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let id_str: String = row
                    .get(0)
                    .map_err(|e| DirectoryError::Query(format!("find_organization_id: {e}")))?;
                Uuid::parse_str(&id_str).map_err(|e| {
                    DirectoryError::Query(format!("find_organization_id uuid parse: {e}"))
                })
            }
            Ok(None) => Err(DirectoryError::NotFound {
                entity: "organization".to_string(),
                key: created_by.to_string(),
            }),
            Err(e) => Err(DirectoryError::Query(format!("find_organization_id: {e}"))),
        }
    }

    async fn insert_org_admin(&self, link: &OrgAdminLink) -> Result<(), DirectoryError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO org_admins (user_id, organization_id) VALUES (?1, ?2)",
            params![link.identity_id.clone(), link.organization_id.to_string()],
        )
        .await
        .map_err(|e| write_err("insert_org_admin", e))?;

        debug!(identity_id = %link.identity_id, organization_id = %link.organization_id, "Org admin link inserted");
        Ok(())
    }
}
