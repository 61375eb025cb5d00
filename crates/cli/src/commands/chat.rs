//! `questkeeper chat` — interactive or single-message mode.
//!
//! The interactive session owns the cross-request tool-call history. The
//! per-request transcript is rebuilt inside every run; `reset` only clears
//! the history the stuck detector reads.

use std::sync::Arc;

use questkeeper_agent::{QuestAgent, ToolCallHistory};
use questkeeper_config::AppConfig;
use questkeeper_providers::OllamaClient;
use questkeeper_store::QuestStore;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(message: Option<String>) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    config.validate()?;
    tracing::debug!(model = %config.model, endpoint = %config.endpoint, "Configuration loaded");

    let store = QuestStore::new(&config.database.path).await?;
    let registry = Arc::new(questkeeper_tools::default_registry(store));
    let model = Arc::new(OllamaClient::new(&config.endpoint)?);

    let agent = QuestAgent::new(model, registry, &config.model, config.system_prompt())
        .with_temperature(config.temperature)
        .with_num_ctx(config.num_ctx)
        .with_max_iterations(config.max_iterations);

    // Outlives every run; cleared only by the `reset` command
    let mut history = ToolCallHistory::new();

    if let Some(msg) = message {
        let reply = agent.run(&msg, &mut history).await?;
        println!("{reply}");
        return Ok(());
    }

    println!();
    println!("  Questkeeper — campaign assistant");
    println!();
    println!("  Model:     {}", config.model);
    println!("  Endpoint:  {}", config.endpoint);
    println!("  Database:  {}", config.database.path);
    println!();
    println!("  Type your request and press Enter.");
    println!("  Type 'reset' to clear the tool-call history, 'exit' to quit.");
    println!();

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    print_prompt();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();

        if input.is_empty() {
            print_prompt();
            continue;
        }

        if input.eq_ignore_ascii_case("exit") {
            break;
        }

        if input.eq_ignore_ascii_case("reset") {
            history.reset();
            println!();
            println!("  Tool-call history cleared");
            println!();
            print_prompt();
            continue;
        }

        match agent.run(input, &mut history).await {
            Ok(reply) => {
                println!();
                for line in reply.lines() {
                    println!("  Keeper > {line}");
                }
                println!();
            }
            Err(e) => {
                eprintln!();
                eprintln!("  [Error] {e}");
                println!();
            }
        }

        print_prompt();
    }

    println!();
    println!("  Farewell, adventurer.");
    println!();

    Ok(())
}

fn print_prompt() {
    use std::io::Write;
    print!("  You > ");
    let _ = std::io::stdout().flush();
}
