//! Script to re-run lead scoring over the stored leads.
//!
//! Usage: `reanalyze_leads [--only-missing]`
//!
//! With `--only-missing`, leads that already carry a score are skipped.

use lead_scoring_api::config::Config;
use lead_scoring_api::handlers::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let only_missing = std::env::args().any(|arg| arg == "--only-missing");

    let config = Config::from_env()?;
    if config.database_url.is_none() {
        anyhow::bail!("DATABASE_URL must be set to re-analyze stored leads");
    }

    let state = AppState::from_config(&config).await?;
    let leads = state.leads.find_all().await?;

    let targets: Vec<_> = leads
        .into_iter()
        .filter(|lead| !only_missing || lead.analyzed_at.is_none())
        .collect();
    let total = targets.len();
    tracing::info!("Re-analyzing {} lead(s) (only missing: {})", total, only_missing);

    let mut success_count = 0;
    let mut fail_count = 0;

    // Sequential on purpose: one LLM call in flight at a time
    for (idx, lead) in targets.iter().enumerate() {
        match state.leads.analyze_lead(lead.id).await {
            Ok(updated) => {
                success_count += 1;
                tracing::info!(
                    "[{}/{}] {} -> {:?} ({:?})",
                    idx + 1,
                    total,
                    lead.id,
                    updated.score,
                    updated.classification
                );
            }
            Err(e) => {
                fail_count += 1;
                tracing::error!("[{}/{}] {} failed: {}", idx + 1, total, lead.id, e);
            }
        }
    }

    tracing::info!(
        "Re-analysis complete. {} succeeded, {} failed.",
        success_count,
        fail_count
    );

    Ok(())
}
