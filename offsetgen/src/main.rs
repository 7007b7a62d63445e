use std::collections::HashMap;
use std::env;
use std::error::Error;

use offsetgen_core::{OffsetPlanner, PlannerConfig};
use offsetgen_kafka::{KafkaFetcher, KafkaFetcherConfig};
use tracing::{error, info};

mod cmdline;
mod setup_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    setup_tracing::register();

    if let Err(e) = run().await {
        error!("{e:?}");
        return Err(e);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn Error>> {
    let matches = cmdline::root_cli().get_matches();
    let Some(("plan", args)) = matches.subcommand() else {
        return Err("unknown subcommand".into());
    };

    let topic = args
        .get_one::<String>("topic")
        .ok_or("--topic is required")?;
    let checkpoint = args.get_one::<String>("checkpoint").map(String::as_str);
    let source_limit = args
        .get_one::<i64>("source-limit")
        .copied()
        .unwrap_or(i64::MAX);

    let env_vars: HashMap<String, String> = env::vars().collect();
    let planner_config = PlannerConfig::load(&env_vars)?;
    let kafka_config = KafkaFetcherConfig::load(&env_vars)?;
    info!(
        topic,
        brokers = ?kafka_config.brokers,
        reset_strategy = %planner_config.reset_strategy,
        "Planning next cycle"
    );

    let fetcher = KafkaFetcher::connect(kafka_config)?;
    let planner = OffsetPlanner::new(topic.as_str(), planner_config, fetcher);
    let plan = planner.next_offset_ranges(checkpoint, source_limit).await?;

    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
