use std::env;

use log::debug;

use recipe_analyzer::config::AnalyzerConfig;
use recipe_analyzer::Analyzer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let input = args
        .get(1)
        .ok_or("Please provide a recipe URL or dish name as an argument")?;

    let config = AnalyzerConfig::load()?;
    let analyzer = Analyzer::from_config(config)?;

    let result = analyzer.analyze(input).await;
    debug!("telemetry: {:?}", analyzer.telemetry());

    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
