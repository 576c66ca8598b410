use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use web_explorer::brain::OpenAiNarrator;
use web_explorer::config::NarratorConfig;
use web_explorer::face;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let config = NarratorConfig::parse();

    let level = if config.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let narrator = OpenAiNarrator::new(&config)?;
    info!(model = narrator.model(), "narrator ready");

    face::serve(&config, Arc::new(narrator)).await
}
