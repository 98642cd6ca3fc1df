use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use std::path::Path;

pub const EXAMPLE_CONFIG: &str = include_str!("../../docs/example_config.yaml");
pub const EXAMPLE_RATES: &str = include_str!("../../docs/exchange_rate.csv");

fn write_new(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        anyhow::bail!("File already exists at {}", path.display());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write file to {}", path.display()))
}

/// Creates a default configuration file at the default location, plus a
/// sample exchange rate file if none exists yet.
pub fn setup() -> Result<()> {
    let path = AppConfig::default_config_path()?;
    setup_at_path(&path)?;

    let config = AppConfig::load_from_path(&path)?;
    if !config.paths.rates_file.exists() {
        write_rates_at_path(&config.paths.rates_file)?;
    }
    Ok(())
}

/// Creates a default configuration file with example content at the specified path
pub fn setup_at_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    write_new(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Configuration file not created at {}", path.display()))?;
    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}

/// Writes the sample exchange rate table
pub fn write_rates_at_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    write_new(path, EXAMPLE_RATES)?;
    tracing::info!("Created sample exchange rates at {}", path.display());
    Ok(())
}
