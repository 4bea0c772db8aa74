use agora_persist::{Repository, ThreadStatus};
use agora_service::{config::Config, logging::init_logging, AppState};

/// Verifies a deployment: loads configuration, reaches storage and reports
/// row counts per table.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config.logging);

    tracing::info!("Connecting to {}", config.storage_url);
    let state = AppState::connect(config)?;
    let persist = &state.persist;

    let threads = persist.threads().count(&[]).await?;
    let active = persist.threads().count_by_status(ThreadStatus::Active).await?;
    let messages = persist.messages().count(&[]).await?;
    let participants = persist.participants().count(&[]).await?;

    tracing::info!(threads, active, messages, participants, "Storage reachable");
    println!("threads:      {} ({} active)", threads, active);
    println!("messages:     {}", messages);
    println!("participants: {}", participants);

    Ok(())
}
