use crate::errors::{AppError, ResultExt};
use crate::models::{
    Classification, Lead, LeadAnalysis, LeadStatus, NewLead, NewUser, UpdateLeadDto,
    UpdateUserDto, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

pub const DUPLICATE_EMAIL: &str = "Email already exists";

/// Persistence for leads.
///
/// Implementations must keep `score`, `classification`, `score_reason` and
/// `analyzed_at` in step: they are only ever written by `save_analysis`.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// All leads, highest score first (unscored last), then newest first.
    async fn list(&self) -> Result<Vec<Lead>, AppError>;

    async fn find(&self, id: Uuid) -> Result<Option<Lead>, AppError>;

    async fn insert(&self, lead: NewLead) -> Result<Lead, AppError>;

    /// Applies the present fields of `changes`. `None` when the lead does not exist.
    async fn update(&self, id: Uuid, changes: &UpdateLeadDto) -> Result<Option<Lead>, AppError>;

    async fn save_analysis(
        &self,
        id: Uuid,
        analysis: &LeadAnalysis,
        analyzed_at: DateTime<Utc>,
    ) -> Result<Option<Lead>, AppError>;

    /// Returns false when no lead had this id.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Row count, optionally restricted to one classification.
    async fn count(&self, classification: Option<Classification>) -> Result<i64, AppError>;

    /// Mean of the non-null scores, `None` when no lead is scored.
    async fn average_score(&self) -> Result<Option<f64>, AppError>;
}

/// Persistence for users. Email is unique.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list(&self) -> Result<Vec<User>, AppError>;

    async fn find(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Fails with `Conflict` on a duplicate email.
    async fn insert(&self, user: NewUser) -> Result<User, AppError>;

    /// Fails with `Conflict` on a duplicate email. `None` when missing.
    async fn update(&self, id: Uuid, changes: &UpdateUserDto) -> Result<Option<User>, AppError>;

    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

/// Raw `leads` row. Enums are stored as text.
#[derive(Debug, Clone, FromRow)]
struct LeadRow {
    id: Uuid,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    message: String,
    origin: String,
    response_time: Option<f64>,
    interactions: i32,
    score: Option<i32>,
    classification: Option<String>,
    score_reason: Option<String>,
    status: String,
    analyzed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LeadRow> for Lead {
    type Error = AppError;

    fn try_from(row: LeadRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<LeadStatus>()
            .map_err(AppError::InternalError)?;
        let classification = row
            .classification
            .as_deref()
            .map(str::parse::<Classification>)
            .transpose()
            .map_err(AppError::InternalError)?;

        Ok(Lead {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            message: row.message,
            origin: row.origin,
            response_time: row.response_time,
            interactions: row.interactions,
            score: row.score,
            classification,
            score_reason: row.score_reason,
            status,
            analyzed_at: row.analyzed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const LEAD_COLUMNS: &str = "id, name, email, phone, message, origin, response_time, interactions, \
     score, classification, score_reason, status, analyzed_at, created_at, updated_at";

/// Postgres-backed lead storage.
pub struct PgLeadStore {
    pool: PgPool,
}

impl PgLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadStore for PgLeadStore {
    async fn list(&self) -> Result<Vec<Lead>, AppError> {
        let rows = sqlx::query_as::<_, LeadRow>(&format!(
            "SELECT {} FROM leads ORDER BY score DESC NULLS LAST, created_at DESC",
            LEAD_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list leads")?;

        rows.into_iter().map(Lead::try_from).collect()
    }

    async fn find(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            "SELECT {} FROM leads WHERE id = $1",
            LEAD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to load lead {}", id))?;

        row.map(Lead::try_from).transpose()
    }

    async fn insert(&self, lead: NewLead) -> Result<Lead, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            r#"
            INSERT INTO leads (id, name, email, phone, message, origin, response_time, interactions, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            LEAD_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.message)
        .bind(&lead.origin)
        .bind(lead.response_time)
        .bind(lead.interactions)
        .bind(lead.status.as_str())
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert lead")?;

        Lead::try_from(row)
    }

    async fn update(&self, id: Uuid, changes: &UpdateLeadDto) -> Result<Option<Lead>, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            r#"
            UPDATE leads SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                message = COALESCE($5, message),
                origin = COALESCE($6, origin),
                response_time = COALESCE($7, response_time),
                interactions = COALESCE($8, interactions),
                status = COALESCE($9, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            LEAD_COLUMNS
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(&changes.message)
        .bind(&changes.origin)
        .bind(changes.response_time)
        .bind(changes.interactions)
        .bind(changes.status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to update lead {}", id))?;

        row.map(Lead::try_from).transpose()
    }

    async fn save_analysis(
        &self,
        id: Uuid,
        analysis: &LeadAnalysis,
        analyzed_at: DateTime<Utc>,
    ) -> Result<Option<Lead>, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            r#"
            UPDATE leads SET
                score = $2,
                classification = $3,
                score_reason = $4,
                analyzed_at = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            LEAD_COLUMNS
        ))
        .bind(id)
        .bind(analysis.score)
        .bind(analysis.classification.as_str())
        .bind(&analysis.reason)
        .bind(analyzed_at)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to store analysis for lead {}", id))?;

        row.map(Lead::try_from).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete lead {}", id))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, classification: Option<Classification>) -> Result<i64, AppError> {
        let count: i64 = match classification {
            Some(c) => sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leads WHERE classification = $1")
                .bind(c.as_str())
                .fetch_one(&self.pool)
                .await,
            None => sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leads")
                .fetch_one(&self.pool)
                .await,
        }
        .context("Failed to count leads")?;

        Ok(count)
    }

    async fn average_score(&self) -> Result<Option<f64>, AppError> {
        let avg = sqlx::query_scalar::<_, Option<f64>>("SELECT AVG(score)::float8 FROM leads")
            .fetch_one(&self.pool)
            .await
            .context("Failed to average lead scores")?;

        Ok(avg)
    }
}

/// Postgres-backed user storage.
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn list(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, name, email, created_at, updated_at FROM users ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users")?;

        Ok(users)
    }

    async fn find(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to load user {}", id))?;

        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_EMAIL))
    }

    async fn update(&self, id: Uuid, changes: &UpdateUserDto) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_EMAIL))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete user {}", id))?;

        Ok(result.rows_affected() > 0)
    }
}
