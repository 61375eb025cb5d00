//! `questkeeper tools` — list the tool catalog.

use questkeeper_config::AppConfig;
use questkeeper_store::QuestStore;

pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let store = QuestStore::new(&config.database.path).await?;
    let registry = questkeeper_tools::default_registry(store);

    println!();
    println!("  Available tools:");
    for descriptor in registry.descriptors() {
        println!("    {:<22} {}", descriptor.name, descriptor.description);
    }
    println!();

    Ok(())
}
