use crate::analytics::{KanbanBoard, LeadAnalytics};
use crate::config::Config;
use crate::db::Database;
use crate::db_storage::{LeadStore, PgLeadStore, PgUserStore, UserStore};
use crate::errors::AppError;
use crate::groq_client::{ChatCompletion, ChatCompletionRequest, ChatMessage, GroqClient};
use crate::lead_analysis::LeadAnalyzer;
use crate::memory_storage::{MemoryLeadStore, MemoryUserStore};
use crate::models::*;
use crate::services::{LeadService, UserService, LEAD_NOT_FOUND, USER_NOT_FOUND};
use axum::{
    extract::{FromRequest, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub leads: LeadService,
    pub users: UserService,
    /// Raw gateway behind `/api/groq/*`.
    pub groq: GroqClient,
}

impl AppState {
    pub fn new(
        lead_store: Arc<dyn LeadStore>,
        user_store: Arc<dyn UserStore>,
        groq: GroqClient,
    ) -> Self {
        Self {
            leads: LeadService::new(lead_store, LeadAnalyzer::new(groq.clone())),
            users: UserService::new(user_store),
            groq,
        }
    }

    /// Wires the Groq client and the Postgres stores, or in-memory stores
    /// when no database is configured.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let groq = GroqClient::new(
            config.groq_api_key.clone(),
            config.groq_base_url.clone(),
            config.groq_model.clone(),
        )?;
        tracing::info!("Groq client initialized: {}", config.groq_base_url);

        let state = match config.database_url {
            Some(ref url) => {
                let db = Database::new(url).await?;
                tracing::info!("Database connection pool established");
                Self::new(
                    Arc::new(PgLeadStore::new(db.pool.clone())),
                    Arc::new(PgUserStore::new(db.pool)),
                    groq,
                )
            }
            None => {
                tracing::warn!("Running with in-memory storage, data is lost on restart");
                Self::new(
                    Arc::new(MemoryLeadStore::new()),
                    Arc::new(MemoryUserStore::new()),
                    groq,
                )
            }
        };

        Ok(state)
    }
}

/// JSON body extractor whose rejections use the API's `{"error": ...}` shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Ids that are not valid UUIDs cannot exist, so they are reported as not found.
fn parse_id(raw: &str, not_found: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(not_found.to_string()))
}

/// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

// ============ Leads ============

/// GET /api/leads
pub async fn list_leads(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Lead>>, AppError> {
    Ok(Json(state.leads.find_all().await?))
}

/// GET /api/leads/:id
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Lead>, AppError> {
    let id = parse_id(&id, LEAD_NOT_FOUND)?;
    let lead = state
        .leads
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(LEAD_NOT_FOUND.to_string()))?;

    Ok(Json(lead))
}

/// POST /api/leads
///
/// Creates the lead and scores it before responding.
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    AppJson(dto): AppJson<CreateLeadDto>,
) -> Result<(StatusCode, Json<Lead>), AppError> {
    tracing::info!("POST /leads - origin: {:?}", dto.origin);
    let lead = state.leads.create(dto).await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

/// PUT /api/leads/:id
pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(dto): AppJson<UpdateLeadDto>,
) -> Result<Json<Lead>, AppError> {
    let id = parse_id(&id, LEAD_NOT_FOUND)?;
    tracing::info!("PUT /leads/{}", id);
    Ok(Json(state.leads.update(id, dto).await?))
}

/// PATCH /api/leads/:id/status
///
/// Board column move. A move onto the current column is a no-op.
pub async fn change_lead_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(body): AppJson<StatusChangeRequest>,
) -> Result<Json<Lead>, AppError> {
    let id = parse_id(&id, LEAD_NOT_FOUND)?;
    Ok(Json(state.leads.change_status(id, body.status).await?))
}

/// DELETE /api/leads/:id
pub async fn delete_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id, LEAD_NOT_FOUND)?;
    if state.leads.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(LEAD_NOT_FOUND.to_string()))
    }
}

/// POST /api/leads/:id/analyze
pub async fn analyze_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Lead>, AppError> {
    let id = parse_id(&id, LEAD_NOT_FOUND)?;
    tracing::info!("POST /leads/{}/analyze", id);
    Ok(Json(state.leads.analyze_lead(id).await?))
}

/// GET /api/leads/stats
pub async fn lead_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LeadStats>, AppError> {
    Ok(Json(state.leads.get_stats().await?))
}

/// GET /api/leads/analytics
///
/// Dashboard series computed from the current lead list and stats.
pub async fn lead_analytics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LeadAnalytics>, AppError> {
    let leads = state.leads.find_all().await?;
    let stats = state.leads.get_stats().await?;
    Ok(Json(LeadAnalytics::derive(&leads, Some(&stats), Utc::now())))
}

/// GET /api/leads/board
pub async fn lead_board(
    State(state): State<Arc<AppState>>,
) -> Result<Json<KanbanBoard>, AppError> {
    let leads = state.leads.find_all().await?;
    Ok(Json(KanbanBoard::from_leads(&leads)))
}

// ============ Users ============

/// GET /api/users
pub async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.users.find_all().await?))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let id = parse_id(&id, USER_NOT_FOUND)?;
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

    Ok(Json(user))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AppJson(dto): AppJson<CreateUserDto>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state.users.create(dto).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/users/:id
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(dto): AppJson<UpdateUserDto>,
) -> Result<Json<User>, AppError> {
    let id = parse_id(&id, USER_NOT_FOUND)?;
    Ok(Json(state.users.update(id, dto).await?))
}

/// DELETE /api/users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id, USER_NOT_FOUND)?;
    if state.users.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(USER_NOT_FOUND.to_string()))
    }
}

// ============ Groq passthrough ============

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub messages: Option<Vec<ChatMessage>>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionBody {
    pub prompt: Option<String>,
    pub model: Option<String>,
}

/// POST /api/groq/chat
pub async fn groq_chat(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<ChatBody>,
) -> Result<Json<ChatCompletion>, AppError> {
    let messages = body
        .messages
        .filter(|m| !m.is_empty())
        .ok_or_else(|| {
            AppError::BadRequest("Messages é obrigatório e deve ser um array não vazio".to_string())
        })?;

    let completion = state
        .groq
        .chat_completion(ChatCompletionRequest {
            messages,
            model: body.model,
            temperature: body.temperature,
            max_tokens: body.max_tokens,
        })
        .await?;

    Ok(Json(completion))
}

/// POST /api/groq/completion
pub async fn groq_completion(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<CompletionBody>,
) -> Result<Json<ChatCompletion>, AppError> {
    let prompt = body
        .prompt
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            AppError::BadRequest("Prompt é obrigatório e deve ser uma string".to_string())
        })?;

    Ok(Json(state.groq.simple_completion(&prompt, body.model).await?))
}
