use super::UnknownVariant;
use anyhow::Result;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction as SqlxTransaction};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Audience,
    Organizer,
    Comedian,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Audience => "audience",
            Role::Organizer => "organizer",
            Role::Comedian => "comedian",
            Role::Admin => "admin",
        }
    }

    /// Organizers and comedians list shows and need admin approval first.
    pub fn is_creator(&self) -> bool {
        matches!(self, Role::Organizer | Role::Comedian)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audience" => Ok(Role::Audience),
            "organizer" => Ok(Role::Organizer),
            "comedian" => Ok(Role::Comedian),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownVariant::new("role", other)),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Approved,
    Pending,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(ApprovalStatus::Approved),
            "pending" => Ok(ApprovalStatus::Pending),
            "rejected" => Ok(ApprovalStatus::Rejected),
            other => Err(UnknownVariant::new("approval status", other)),
        }
    }
}

impl TryFrom<String> for ApprovalStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub email: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[sqlx(try_from = "String")]
    pub approval_status: ApprovalStatus,
    /// Percentage (0-100) overriding the tiered platform fee on this creator's shows.
    pub custom_platform_fee: Option<BigDecimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_approved_creator(&self) -> bool {
        self.role.is_creator() && self.approval_status == ApprovalStatus::Approved
    }
}

#[derive(Debug, Deserialize)]
pub struct OnboardRequest {
    pub display_name: String,
    pub email: Option<String>,
    pub role: Role,
}

impl User {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Insert or re-onboard a user. Existing users keep their approval status
    /// unless their role changes.
    pub async fn upsert(pool: &PgPool, id: Uuid, request: &OnboardRequest) -> Result<Self> {
        let initial_status = if request.role.is_creator() {
            ApprovalStatus::Pending
        } else {
            ApprovalStatus::Approved
        };

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, display_name, email, role, approval_status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            ON CONFLICT (id) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                email = EXCLUDED.email,
                approval_status = CASE
                    WHEN users.role = EXCLUDED.role THEN users.approval_status
                    ELSE EXCLUDED.approval_status
                END,
                role = EXCLUDED.role,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.display_name)
        .bind(&request.email)
        .bind(request.role.as_str())
        .bind(initial_status.as_str())
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_creators(pool: &PgPool, status: Option<ApprovalStatus>) -> Result<Vec<Self>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE role IN ('organizer', 'comedian')
            AND ($1::VARCHAR IS NULL OR approval_status = $1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    pub async fn set_approval_status_in_tx(
        tx: &mut SqlxTransaction<'_, Postgres>,
        id: Uuid,
        status: ApprovalStatus,
    ) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET approval_status = $1, updated_at = NOW()
            WHERE id = $2 AND role IN ('organizer', 'comedian')
            RETURNING *
            "#,
        )
        .bind(status.as_str())
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(user)
    }

    pub async fn set_custom_platform_fee_in_tx(
        tx: &mut SqlxTransaction<'_, Postgres>,
        id: Uuid,
        percent: Option<&BigDecimal>,
    ) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET custom_platform_fee = $1, updated_at = NOW()
            WHERE id = $2 AND role IN ('organizer', 'comedian')
            RETURNING *
            "#,
        )
        .bind(percent)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(user)
    }
}
