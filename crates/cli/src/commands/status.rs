//! `questkeeper status` — resolved configuration and world counts.

use questkeeper_config::AppConfig;
use questkeeper_providers::OllamaClient;
use questkeeper_store::QuestStore;

pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    let store = QuestStore::new(&config.database.path).await?;
    let counts = store.counts().await?;

    let reachable = match OllamaClient::new(&config.endpoint) {
        Ok(client) => client.health_check().await.unwrap_or(false),
        Err(_) => false,
    };

    println!();
    println!("  Questkeeper status");
    println!();
    println!("  Model:           {}", config.model);
    println!("  Endpoint:        {}  ({})", config.endpoint, if reachable { "reachable" } else { "unreachable" });
    println!("  Temperature:     {}", config.temperature);
    println!("  Context window:  {}", config.num_ctx);
    println!("  Max iterations:  {}", config.max_iterations);
    println!("  Database:        {}", config.database.path);
    println!();
    println!("  NPCs:            {}", counts.npcs);
    println!("  Quests:          {}", counts.quests);
    println!("  Relationships:   {}", counts.relationships);
    println!();

    Ok(())
}
