use crate::db_storage::{LeadStore, UserStore};
use crate::errors::AppError;
use crate::lead_analysis::{LeadAnalysisInput, LeadAnalyzer};
use crate::models::*;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub const LEAD_NOT_FOUND: &str = "Lead not found";
pub const USER_NOT_FOUND: &str = "User not found";

/// Lead CRUD plus automatic scoring.
///
/// Create and update are two sequential writes (row, then analysis) with no
/// transaction around them: a failure in between leaves an unscored lead.
#[derive(Clone)]
pub struct LeadService {
    store: Arc<dyn LeadStore>,
    analyzer: LeadAnalyzer,
}

impl LeadService {
    pub fn new(store: Arc<dyn LeadStore>, analyzer: LeadAnalyzer) -> Self {
        Self { store, analyzer }
    }

    pub async fn find_all(&self) -> Result<Vec<Lead>, AppError> {
        self.store.list().await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        self.store.find(id).await
    }

    /// Persists a new lead and scores it before returning.
    pub async fn create(&self, dto: CreateLeadDto) -> Result<Lead, AppError> {
        let new_lead = dto.validate().map_err(AppError::BadRequest)?;
        let lead = self.store.insert(new_lead).await?;
        tracing::info!("Lead {} created (origin: {})", lead.id, lead.origin);

        self.analyze_lead(lead.id).await
    }

    /// Applies a partial update, re-scoring only when message or
    /// interactions were part of it.
    pub async fn update(&self, id: Uuid, dto: UpdateLeadDto) -> Result<Lead, AppError> {
        dto.validate().map_err(AppError::BadRequest)?;

        let lead = self
            .store
            .update(id, &dto)
            .await?
            .ok_or_else(|| AppError::NotFound(LEAD_NOT_FOUND.to_string()))?;

        if dto.touches_analysis_inputs() {
            tracing::info!("Lead {} analysis inputs changed, re-analyzing", id);
            return self.analyze_lead(id).await;
        }

        Ok(lead)
    }

    /// Moves a lead to another board column. No write when it is already there.
    pub async fn change_status(&self, id: Uuid, status: LeadStatus) -> Result<Lead, AppError> {
        let lead = self
            .store
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(LEAD_NOT_FOUND.to_string()))?;

        if lead.status == status {
            tracing::debug!("Lead {} already in status {}", id, status);
            return Ok(lead);
        }

        self.update(id, UpdateLeadDto::status_only(status)).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let deleted = self.store.delete(id).await?;
        if deleted {
            tracing::info!("Lead {} deleted", id);
        }
        Ok(deleted)
    }

    /// Scores the stored lead and persists the result.
    pub async fn analyze_lead(&self, id: Uuid) -> Result<Lead, AppError> {
        let lead = self
            .store
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(LEAD_NOT_FOUND.to_string()))?;

        let analysis = self.analyzer.analyze(&LeadAnalysisInput::from(&lead)).await?;
        tracing::info!(
            "Lead {} scored {} ({})",
            id,
            analysis.score,
            analysis.classification
        );

        self.store
            .save_analysis(id, &analysis, Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound(LEAD_NOT_FOUND.to_string()))
    }

    /// Counts per classification and the rounded mean score. The average
    /// is only queried when there is at least one lead.
    pub async fn get_stats(&self) -> Result<LeadStats, AppError> {
        let total = self.store.count(None).await?;
        let quente = self.store.count(Some(Classification::Quente)).await?;
        let morno = self.store.count(Some(Classification::Morno)).await?;
        let frio = self.store.count(Some(Classification::Frio)).await?;

        let average_score = if total > 0 {
            self.store
                .average_score()
                .await?
                .map(|avg| avg.round() as i64)
                .unwrap_or(0)
        } else {
            0
        };

        Ok(LeadStats {
            total,
            quente,
            morno,
            frio,
            average_score,
        })
    }
}

/// Plain user CRUD.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn find_all(&self) -> Result<Vec<User>, AppError> {
        self.store.list().await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        self.store.find(id).await
    }

    pub async fn create(&self, dto: CreateUserDto) -> Result<User, AppError> {
        let new_user = dto.validate().map_err(AppError::BadRequest)?;
        let user = self.store.insert(new_user).await?;
        tracing::info!("User {} created", user.id);
        Ok(user)
    }

    pub async fn update(&self, id: Uuid, dto: UpdateUserDto) -> Result<User, AppError> {
        self.store
            .update(id, &dto)
            .await?
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        self.store.delete(id).await
    }
}
