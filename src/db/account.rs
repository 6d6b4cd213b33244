/// Account database models
use crate::error::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row};
use std::fmt;
use std::str::FromStr;

/// Account role. Role checks are flat set membership, there is no ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    Admin,
    ScrumMaster,
    Intern,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::ScrumMaster => "scrum_master",
            Role::Intern => "intern",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "scrum_master" => Ok(Role::ScrumMaster),
            "intern" => Ok(Role::Intern),
            other => Err(ApiError::Validation(format!("Unknown role: {}", other))),
        }
    }
}

/// Account record in the database
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    pub employee_id: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_approved: bool,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    #[serde(skip_serializing)]
    pub external_id: Option<String>,
    pub auth_provider: String,
    #[serde(skip_serializing)]
    pub reset_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub reset_token_used: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Admins count as approved whatever the stored flag says
    pub fn effectively_approved(&self) -> bool {
        self.is_approved || self.role == Role::Admin
    }
}

impl<'r> FromRow<'r, SqliteRow> for Account {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        let role = role.parse().map_err(|e: ApiError| sqlx::Error::ColumnDecode {
            index: "role".to_string(),
            source: Box::new(e),
        })?;

        Ok(Account {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            employee_id: row.try_get("employee_id")?,
            role,
            is_active: row.try_get("is_active")?,
            is_approved: row.try_get("is_approved")?,
            password_hash: row.try_get("password_hash")?,
            external_id: row.try_get("external_id")?,
            auth_provider: row.try_get("auth_provider")?,
            reset_token_hash: row.try_get("reset_token_hash")?,
            reset_token_expires_at: row.try_get("reset_token_expires_at")?,
            reset_token_used: row.try_get("reset_token_used")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Public projection used by the user listing endpoints
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BasicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}
