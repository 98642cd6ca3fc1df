//! Extract -> Transform -> Load orchestration
//!
//! Every stage degrades to the best table it has instead of failing, so
//! [`Pipeline::run`] always hands a table back to the caller.

use crate::core::clock::Clock;
use crate::core::error::EtlError;
use crate::core::price::QuoteFetcher;
use crate::core::rates::RateTable;
use crate::core::table::Table;
use crate::core::transform::{self, TransformOutcome};
use crate::store::SqliteStore;
use std::path::PathBuf;
use tracing::{error, info};

/// Inputs of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub assets: Vec<String>,
    pub currencies: Vec<String>,
    pub base_currency: String,
    pub rates_file: PathBuf,
    pub database: PathBuf,
    pub table: String,
}

impl From<&crate::core::config::AppConfig> for PipelineSettings {
    fn from(config: &crate::core::config::AppConfig) -> Self {
        PipelineSettings {
            assets: config.assets.clone(),
            currencies: config.currencies.clone(),
            base_currency: config.base_currency.clone(),
            rates_file: config.paths.rates_file.clone(),
            database: config.paths.database.clone(),
            table: config.paths.table.clone(),
        }
    }
}

#[derive(Debug)]
pub enum LoadOutcome {
    Replaced { rows: usize },
    Skipped(EtlError),
    Failed(EtlError),
}

/// What happened during one run.
#[derive(Debug)]
pub struct PipelineRun {
    pub extract_error: Option<EtlError>,
    pub transform: TransformOutcome,
    pub load: LoadOutcome,
}

impl PipelineRun {
    pub fn table(&self) -> &Table {
        self.transform.table()
    }

    pub fn has_data(&self) -> bool {
        !self.table().is_empty()
    }
}

pub struct Pipeline<'a> {
    fetcher: &'a dyn QuoteFetcher,
    clock: &'a dyn Clock,
    settings: PipelineSettings,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        fetcher: &'a dyn QuoteFetcher,
        clock: &'a dyn Clock,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            fetcher,
            clock,
            settings,
        }
    }

    /// Fetches the quote table. On any failure the table is empty.
    pub async fn extract(&self) -> (Table, Option<EtlError>) {
        info!("Extract: started");
        match self
            .fetcher
            .fetch_quotes(&self.settings.assets, &self.settings.currencies)
            .await
        {
            Ok(quotes) => {
                let table = Table::from_quotes(&quotes, &self.settings.currencies);
                info!("Extract: completed successfully");
                (table, None)
            }
            Err(e) => {
                error!("Extract: failed - {:#}", e);
                (Table::default(), Some(EtlError::Network(format!("{e:#}"))))
            }
        }
    }

    /// Converts `table`. The rate file is only read when there is data to convert.
    pub fn transform(&self, table: Table) -> TransformOutcome {
        transform::transform(
            table,
            || RateTable::load(&self.settings.rates_file),
            &self.settings.base_currency,
            self.clock,
        )
    }

    /// Replaces the stored snapshot with `table`. An empty table leaves the
    /// store untouched.
    pub fn load(&self, table: &Table) -> LoadOutcome {
        info!("Load: started");
        if table.is_empty() {
            error!("Load: aborted (empty table)");
            return LoadOutcome::Skipped(EtlError::EmptyInput);
        }

        let result = SqliteStore::open(&self.settings.database, &self.settings.table)
            .and_then(|mut store| store.replace(table));
        match result {
            Ok(rows) => {
                info!(
                    "Load: completed. Data written to {} -> {}",
                    self.settings.database.display(),
                    self.settings.table
                );
                LoadOutcome::Replaced { rows }
            }
            Err(e) => {
                error!("Load: failed - {:#}", e);
                LoadOutcome::Failed(EtlError::Persistence(format!("{e:#}")))
            }
        }
    }

    pub async fn run(&self) -> PipelineRun {
        let (table, extract_error) = self.extract().await;
        let transform = self.transform(table);
        let load = self.load(transform.table());
        PipelineRun {
            extract_error,
            transform,
            load,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::FixedClock;
    use crate::core::log::{file_layer, open_log_file};
    use crate::core::table::{AssetQuote, Cell};
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tracing_subscriber::prelude::*;

    struct StaticFetcher(Option<Vec<AssetQuote>>);

    #[async_trait]
    impl QuoteFetcher for StaticFetcher {
        async fn fetch_quotes(
            &self,
            _assets: &[String],
            _currencies: &[String],
        ) -> Result<Vec<AssetQuote>> {
            self.0.clone().ok_or_else(|| anyhow!("connection refused"))
        }
    }

    fn bitcoin() -> StaticFetcher {
        StaticFetcher(Some(vec![AssetQuote {
            asset: "bitcoin".to_string(),
            prices: [("pkr".to_string(), Some(1_000_000.0))].into(),
        }]))
    }

    fn clock() -> FixedClock {
        FixedClock(
            chrono_tz::Asia::Karachi
                .with_ymd_and_hms(2024, 1, 15, 12, 0, 0)
                .unwrap(),
        )
    }

    fn settings(dir: &TempDir) -> PipelineSettings {
        PipelineSettings {
            assets: vec!["bitcoin".to_string()],
            currencies: vec!["pkr".to_string()],
            base_currency: "pkr".to_string(),
            rates_file: dir.path().join("input").join("exchange_rate.csv"),
            database: dir.path().join("crypto_data.db"),
            table: "crypto_prices".to_string(),
        }
    }

    fn write_rates(settings: &PipelineSettings, content: &str) {
        fs::create_dir_all(settings.rates_file.parent().unwrap()).unwrap();
        fs::write(&settings.rates_file, content).unwrap();
    }

    fn stored(settings: &PipelineSettings) -> Option<Table> {
        SqliteStore::open(&settings.database, &settings.table)
            .unwrap()
            .read()
            .unwrap()
    }

    /// Runs the pipeline with the log file layer installed and returns the lines written.
    async fn logged_run(fetcher: &StaticFetcher, settings: PipelineSettings) -> Vec<String> {
        let path = settings.database.with_file_name("code_log.txt");
        let subscriber = tracing_subscriber::registry()
            .with(file_layer(open_log_file(&path).unwrap(), Arc::new(clock())));
        let _guard = tracing::subscriber::set_default(subscriber);

        let clock = clock();
        Pipeline::new(fetcher, &clock, settings).run().await;

        fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn stamped(lines: &[&str]) -> Vec<String> {
        lines
            .iter()
            .map(|line| format!("2024-01-15 12:00:00: {line}"))
            .collect()
    }

    #[tokio::test]
    async fn test_log_lines_for_successful_run() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        write_rates(&settings, "Currency,Rate\nUSD,0.0036\n");
        let loaded = format!(
            "Load: completed. Data written to {} -> crypto_prices",
            settings.database.display()
        );

        let lines = logged_run(&bitcoin(), settings).await;

        assert_eq!(
            lines,
            stamped(&[
                "Extract: started",
                "Extract: completed successfully",
                "Transform: started",
                "Transform: completed",
                "Load: started",
                loaded.as_str(),
            ])
        );
    }

    #[tokio::test]
    async fn test_log_lines_for_failed_extract() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        write_rates(&settings, "Currency,Rate\nusd,abc\neur,0.0033\n");

        let lines = logged_run(&StaticFetcher(None), settings).await;

        assert_eq!(
            lines,
            stamped(&[
                "Extract: started",
                "Extract: failed - connection refused",
                "Transform: started",
                "Transform: aborted (empty table)",
                "Load: started",
                "Load: aborted (empty table)",
            ])
        );
    }

    #[tokio::test]
    async fn test_log_lines_for_invalid_rate() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        write_rates(&settings, "Currency,Rate\nusd,abc\neur,0.0033\n");
        let loaded = format!(
            "Load: completed. Data written to {} -> crypto_prices",
            settings.database.display()
        );

        let lines = logged_run(&bitcoin(), settings).await;

        assert_eq!(
            lines,
            stamped(&[
                "Extract: started",
                "Extract: completed successfully",
                "Transform: started",
                "Transform: skipping invalid rate for usd",
                "Transform: completed",
                "Load: started",
                loaded.as_str(),
            ])
        );
    }

    #[tokio::test]
    async fn test_end_to_end_conversion() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        write_rates(&settings, "Currency,Rate\nUSD,0.0036\n");

        let fetcher = bitcoin();
        let clock = clock();
        let run = Pipeline::new(&fetcher, &clock, settings.clone()).run().await;

        assert!(run.has_data());
        assert!(run.extract_error.is_none());
        assert!(run.transform.is_converted());
        assert!(matches!(run.load, LoadOutcome::Replaced { rows: 1 }));

        let expected = Table::new(
            vec![
                "crypto".to_string(),
                "pkr".to_string(),
                "price_in_USD".to_string(),
                "last_updated".to_string(),
            ],
            vec![vec![
                Cell::Text("bitcoin".into()),
                Cell::Real(1_000_000.0),
                Cell::Real(3600.0),
                Cell::Text("2024-01-15T12:00:00+05:00".into()),
            ]],
        )
        .unwrap();
        assert_eq!(run.table(), &expected);
        assert_eq!(stored(&settings), Some(expected));
    }

    #[tokio::test]
    async fn test_extract_failure_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        write_rates(&settings, "Currency,Rate\nUSD,0.0036\n");

        let clock = clock();
        Pipeline::new(&bitcoin(), &clock, settings.clone())
            .run()
            .await;
        let before = stored(&settings);

        let failing = StaticFetcher(None);
        let run = Pipeline::new(&failing, &clock, settings.clone()).run().await;

        assert!(!run.has_data());
        assert!(matches!(run.extract_error, Some(EtlError::Network(_))));
        assert!(matches!(
            run.transform,
            TransformOutcome::Unchanged {
                reason: EtlError::EmptyInput,
                ..
            }
        ));
        assert!(matches!(run.load, LoadOutcome::Skipped(EtlError::EmptyInput)));
        assert_eq!(stored(&settings), before);
    }

    #[tokio::test]
    async fn test_missing_rate_file_stores_raw_quotes() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);

        let fetcher = bitcoin();
        let clock = clock();
        let run = Pipeline::new(&fetcher, &clock, settings.clone()).run().await;

        assert!(matches!(
            run.transform,
            TransformOutcome::Unchanged {
                reason: EtlError::RateFileMissing(_),
                ..
            }
        ));
        assert_eq!(run.table().columns(), &["crypto", "pkr"]);
        assert!(matches!(run.load, LoadOutcome::Replaced { rows: 1 }));
        assert_eq!(stored(&settings).unwrap().columns(), &["crypto", "pkr"]);
    }

    #[tokio::test]
    async fn test_invalid_rate_row_is_skipped() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        write_rates(&settings, "Currency,Rate\nusd,abc\neur,0.0033\n");

        let fetcher = bitcoin();
        let clock = clock();
        let run = Pipeline::new(&fetcher, &clock, settings).run().await;

        let columns = run.table().columns();
        assert!(columns.contains(&"price_in_EUR".to_string()));
        assert!(!columns.contains(&"price_in_USD".to_string()));
        match &run.transform {
            TransformOutcome::Converted(converted) => {
                assert_eq!(converted.skipped[0].currency, "usd");
                assert_eq!(converted.skipped[0].raw, "abc");
            }
            other => panic!("Expected converted table, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unwritable_database_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings(&dir);
        // A directory cannot be opened as a database file.
        settings.database = dir.path().to_path_buf();

        let fetcher = bitcoin();
        let clock = clock();
        let run = Pipeline::new(&fetcher, &clock, settings).run().await;

        assert!(run.has_data());
        assert!(matches!(run.load, LoadOutcome::Failed(EtlError::Persistence(_))));
    }
}
