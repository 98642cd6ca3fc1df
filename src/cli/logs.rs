use super::ui;
use anyhow::{Context, Result};
use std::path::Path;

/// Returns the log file contents, `None` when nothing has been logged yet.
pub fn read_logs(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    std::fs::read_to_string(path)
        .map(Some)
        .with_context(|| format!("Failed to read log file: {}", path.display()))
}

pub fn run(path: &Path) -> Result<()> {
    match read_logs(path)? {
        Some(content) => {
            println!("{}", ui::style_text("ETL Logs", ui::StyleType::Title));
            print!("{content}");
        }
        None => println!("No logs found yet."),
    }
    Ok(())
}
