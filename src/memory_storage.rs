//! In-memory stores, used when no database is configured and in tests.

use crate::db_storage::{LeadStore, UserStore, DUPLICATE_EMAIL};
use crate::errors::AppError;
use crate::models::{
    Classification, Lead, LeadAnalysis, NewLead, NewUser, UpdateLeadDto, UpdateUserDto, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryLeadStore {
    leads: RwLock<Vec<Lead>>,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with existing leads.
    pub fn with_leads(leads: Vec<Lead>) -> Self {
        Self {
            leads: RwLock::new(leads),
        }
    }
}

/// Score descending with unscored leads last, then newest first.
fn lead_order(a: &Lead, b: &Lead) -> Ordering {
    match (a.score, b.score) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| b.created_at.cmp(&a.created_at))
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn list(&self) -> Result<Vec<Lead>, AppError> {
        let mut leads = self.leads.read().await.clone();
        leads.sort_by(lead_order);
        Ok(leads)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        Ok(self.leads.read().await.iter().find(|l| l.id == id).cloned())
    }

    async fn insert(&self, lead: NewLead) -> Result<Lead, AppError> {
        let now = Utc::now();
        let lead = Lead {
            id: Uuid::new_v4(),
            name: lead.name,
            email: lead.email,
            phone: lead.phone,
            message: lead.message,
            origin: lead.origin,
            response_time: lead.response_time,
            interactions: lead.interactions,
            score: None,
            classification: None,
            score_reason: None,
            status: lead.status,
            analyzed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.leads.write().await.push(lead.clone());
        Ok(lead)
    }

    async fn update(&self, id: Uuid, changes: &UpdateLeadDto) -> Result<Option<Lead>, AppError> {
        let mut leads = self.leads.write().await;
        let Some(lead) = leads.iter_mut().find(|l| l.id == id) else {
            return Ok(None);
        };

        if let Some(ref name) = changes.name {
            lead.name = name.clone();
        }
        if let Some(ref email) = changes.email {
            lead.email = Some(email.clone());
        }
        if let Some(ref phone) = changes.phone {
            lead.phone = Some(phone.clone());
        }
        if let Some(ref message) = changes.message {
            lead.message = message.clone();
        }
        if let Some(ref origin) = changes.origin {
            lead.origin = origin.clone();
        }
        if let Some(response_time) = changes.response_time {
            lead.response_time = Some(response_time);
        }
        if let Some(interactions) = changes.interactions {
            lead.interactions = interactions;
        }
        if let Some(status) = changes.status {
            lead.status = status;
        }
        lead.updated_at = Utc::now();

        Ok(Some(lead.clone()))
    }

    async fn save_analysis(
        &self,
        id: Uuid,
        analysis: &LeadAnalysis,
        analyzed_at: DateTime<Utc>,
    ) -> Result<Option<Lead>, AppError> {
        let mut leads = self.leads.write().await;
        let Some(lead) = leads.iter_mut().find(|l| l.id == id) else {
            return Ok(None);
        };

        lead.score = Some(analysis.score);
        lead.classification = Some(analysis.classification);
        lead.score_reason = Some(analysis.reason.clone());
        lead.analyzed_at = Some(analyzed_at);
        lead.updated_at = Utc::now();

        Ok(Some(lead.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut leads = self.leads.write().await;
        let before = leads.len();
        leads.retain(|l| l.id != id);
        Ok(leads.len() < before)
    }

    async fn count(&self, classification: Option<Classification>) -> Result<i64, AppError> {
        let leads = self.leads.read().await;
        let count = match classification {
            Some(c) => leads.iter().filter(|l| l.classification == Some(c)).count(),
            None => leads.len(),
        };
        Ok(count as i64)
    }

    async fn average_score(&self) -> Result<Option<f64>, AppError> {
        let leads = self.leads.read().await;
        let scores: Vec<i32> = leads.iter().filter_map(|l| l.score).collect();
        if scores.is_empty() {
            return Ok(None);
        }
        let sum: i64 = scores.iter().map(|&s| s as i64).sum();
        Ok(Some(sum as f64 / scores.len() as f64))
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list(&self) -> Result<Vec<User>, AppError> {
        let mut users = self.users.read().await.clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn find(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(AppError::Conflict(DUPLICATE_EMAIL.to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: &UpdateUserDto) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        if let Some(ref email) = changes.email {
            if users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(AppError::Conflict(DUPLICATE_EMAIL.to_string()));
            }
        }

        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(ref name) = changes.name {
            user.name = name.clone();
        }
        if let Some(ref email) = changes.email {
            user.email = email.clone();
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() < before)
    }
}
