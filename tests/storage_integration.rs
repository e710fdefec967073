use std::env;

use lead_scoring_api::db::Database;
use lead_scoring_api::db_storage::{LeadStore, PgLeadStore, PgUserStore, UserStore};
use lead_scoring_api::errors::AppError;
use lead_scoring_api::models::{
    Classification, CreateLeadDto, CreateUserDto, LeadAnalysis, LeadStatus, UpdateLeadDto,
};
use uuid::Uuid;

async fn database() -> anyhow::Result<Database> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;
    Database::new(&db_url).await
}

/// Smoke test for lead persistence against a real Postgres.
/// Marked ignored to avoid touching a shared database by accident; set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn lead_store_smoke_test() -> anyhow::Result<()> {
    let db = database().await?;
    let store = PgLeadStore::new(db.pool.clone());

    let new_lead = CreateLeadDto {
        name: Some("Smoke Test".to_string()),
        message: Some("Teste de integração".to_string()),
        origin: Some(format!("smoke-{}", Uuid::new_v4())),
        response_time: Some(1.5),
        ..Default::default()
    }
    .validate()
    .map_err(|e| anyhow::anyhow!(e))?;

    let lead = store.insert(new_lead).await?;
    assert_eq!(lead.interactions, 0);
    assert_eq!(lead.status, LeadStatus::EmAtendimento);
    assert!(lead.score.is_none());

    let scored = store
        .save_analysis(
            lead.id,
            &LeadAnalysis {
                score: 77,
                classification: Classification::Quente,
                reason: "smoke".to_string(),
            },
            chrono::Utc::now(),
        )
        .await?
        .ok_or_else(|| anyhow::anyhow!("lead vanished"))?;
    assert_eq!(scored.score, Some(77));
    assert_eq!(scored.classification, Some(Classification::Quente));

    let moved = store
        .update(lead.id, &UpdateLeadDto::status_only(LeadStatus::Travado))
        .await?
        .ok_or_else(|| anyhow::anyhow!("lead vanished"))?;
    assert_eq!(moved.status, LeadStatus::Travado);
    assert_eq!(moved.score, Some(77));
    assert_eq!(moved.response_time, Some(1.5));

    assert!(store.count(Some(Classification::Quente)).await? >= 1);
    assert!(store.average_score().await?.is_some());

    assert!(store.delete(lead.id).await?);
    assert!(!store.delete(lead.id).await?);
    assert!(store.find(lead.id).await?.is_none());

    Ok(())
}

#[tokio::test]
#[ignore]
async fn user_store_rejects_duplicate_email() -> anyhow::Result<()> {
    let db = database().await?;
    let store = PgUserStore::new(db.pool.clone());

    let email = format!("smoke-{}@example.com", Uuid::new_v4());
    let new_user = || {
        CreateUserDto {
            name: Some("Smoke".to_string()),
            email: Some(email.clone()),
        }
        .validate()
        .map_err(|e| anyhow::anyhow!(e))
    };

    let user = store.insert(new_user()?).await?;
    let duplicate = store.insert(new_user()?).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    assert!(store.delete(user.id).await?);
    Ok(())
}
