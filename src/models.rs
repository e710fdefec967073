use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============ Domain Enums ============

/// Position of a lead in the three-column sales pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    EmAtendimento,
    Finalizado,
    Travado,
}

impl LeadStatus {
    /// All statuses in board order.
    pub const ALL: [LeadStatus; 3] = [
        LeadStatus::EmAtendimento,
        LeadStatus::Finalizado,
        LeadStatus::Travado,
    ];

    /// Storage/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::EmAtendimento => "em_atendimento",
            LeadStatus::Finalizado => "finalizado",
            LeadStatus::Travado => "travado",
        }
    }

    /// Human-readable label used by charts.
    pub fn label(&self) -> &'static str {
        match self {
            LeadStatus::EmAtendimento => "Em Atendimento",
            LeadStatus::Finalizado => "Finalizado",
            LeadStatus::Travado => "Travado",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "em_atendimento" => Ok(LeadStatus::EmAtendimento),
            "finalizado" => Ok(LeadStatus::Finalizado),
            "travado" => Ok(LeadStatus::Travado),
            other => Err(format!("unknown lead status '{}'", other)),
        }
    }
}

/// Temperature label summarizing lead quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Frio,
    Morno,
    Quente,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Frio => "Frio",
            Classification::Morno => "Morno",
            Classification::Quente => "Quente",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = String;

    /// Strict parse of the stored label. Lenient normalization of LLM output
    /// lives in `lead_analysis::normalize_classification`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Frio" => Ok(Classification::Frio),
            "Morno" => Ok(Classification::Morno),
            "Quente" => Ok(Classification::Quente),
            other => Err(format!("unknown classification '{}'", other)),
        }
    }
}

// ============ Leads ============

/// A sales prospect tracked through the pipeline.
///
/// `score`, `classification` and `analyzed_at` are written together by the
/// analysis pipeline: either all are present or none are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: String,
    /// Free-form channel, e.g. "WhatsApp" or "Formulário".
    pub origin: String,
    /// Response time in hours.
    pub response_time: Option<f64>,
    pub interactions: i32,
    pub score: Option<i32>,
    pub classification: Option<Classification>,
    pub score_reason: Option<String>,
    pub status: LeadStatus,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/leads`.
///
/// Required fields are optional here so that a missing field is reported
/// as a 400 with a static message instead of a deserialization rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadDto {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub origin: Option<String>,
    pub response_time: Option<f64>,
    pub interactions: Option<i32>,
    pub status: Option<LeadStatus>,
}

/// A validated lead ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLead {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: String,
    pub origin: String,
    pub response_time: Option<f64>,
    pub interactions: i32,
    pub status: LeadStatus,
}

impl CreateLeadDto {
    /// Checks required fields and applies defaults (`interactions = 0`,
    /// `status = em_atendimento`).
    pub fn validate(self) -> Result<NewLead, String> {
        let required = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let (Some(name), Some(message), Some(origin)) = (
            required(self.name),
            required(self.message),
            required(self.origin),
        ) else {
            return Err("Name, message and origin are required".to_string());
        };

        let interactions = self.interactions.unwrap_or(0);
        if interactions < 0 {
            return Err("Interactions must be a non-negative integer".to_string());
        }

        Ok(NewLead {
            name,
            email: self.email,
            phone: self.phone,
            message,
            origin,
            response_time: self.response_time,
            interactions,
            status: self.status.unwrap_or_default(),
        })
    }
}

/// Body of `PUT /api/leads/:id`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeadDto {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub origin: Option<String>,
    pub response_time: Option<f64>,
    pub interactions: Option<i32>,
    pub status: Option<LeadStatus>,
}

impl UpdateLeadDto {
    /// Only message and interactions changes re-trigger scoring. Response
    /// time and origin changes deliberately do not.
    pub fn touches_analysis_inputs(&self) -> bool {
        self.message.is_some() || self.interactions.is_some()
    }

    /// Fields that are required on creation may be omitted here but not blanked.
    pub fn validate(&self) -> Result<(), String> {
        let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
        if blank(&self.name) || blank(&self.message) || blank(&self.origin) {
            return Err("Name, message and origin cannot be empty".to_string());
        }
        if self.interactions.is_some_and(|i| i < 0) {
            return Err("Interactions must be a non-negative integer".to_string());
        }
        Ok(())
    }

    pub fn status_only(status: LeadStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Body of `PATCH /api/leads/:id/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusChangeRequest {
    pub status: LeadStatus,
}

/// Output of the analysis pipeline, persisted onto a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadAnalysis {
    pub score: i32,
    pub classification: Classification,
    pub reason: String,
}

/// Aggregate counters over the lead table. Derived, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadStats {
    pub total: i64,
    pub quente: i64,
    pub morno: i64,
    pub frio: i64,
    pub average_score: i64,
}

// ============ Users ============

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateUserDto {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

impl CreateUserDto {
    pub fn validate(self) -> Result<NewUser, String> {
        match (
            self.name.filter(|s| !s.trim().is_empty()),
            self.email.filter(|s| !s.trim().is_empty()),
        ) {
            (Some(name), Some(email)) => Ok(NewUser { name, email }),
            _ => Err("Name and email are required".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserDto {
    pub name: Option<String>,
    pub email: Option<String>,
}
