use super::{dashboard, ui};
use crate::core::clock::SystemClock;
use crate::core::config::AppConfig;
use crate::core::pipeline::{Pipeline, PipelineRun, PipelineSettings};
use crate::providers::CoinGeckoProvider;
use anyhow::Result;
use tracing::debug;

/// Runs the pipeline once against the configured provider.
pub async fn run_pipeline(config: &AppConfig) -> Result<PipelineRun> {
    let provider = CoinGeckoProvider::new(&config.provider.base_url, config.provider.timeout())?;
    let clock = SystemClock::new(config.tz()?);
    let pipeline = Pipeline::new(&provider, &clock, PipelineSettings::from(config));

    let pb = ui::new_spinner("Running ETL...");
    let result = pipeline.run().await;
    pb.finish_and_clear();

    debug!(run = ?result, "Pipeline finished");
    Ok(result)
}

pub async fn run(config: &AppConfig) -> Result<()> {
    let result = run_pipeline(config).await?;

    if result.has_data() {
        println!(
            "{}",
            ui::style_text("ETL run completed", ui::StyleType::Success)
        );
        println!("Rows: {}", result.table().len());
    } else {
        println!(
            "{}",
            ui::style_text("ETL run failed or returned no data!", ui::StyleType::Error)
        );
    }
    ui::print_separator();

    dashboard::run(config, None, false)
}
