//! Exchange-rate table loaded from a two-column CSV file

use crate::core::error::EtlError;
use csv::ReaderBuilder;
use std::path::Path;
use tracing::{debug, warn};

/// Header of the multiplier column.
pub const RATE_COLUMN: &str = "Rate";

/// One unit of the base currency expressed in `currency`.
#[derive(Debug, Clone, PartialEq)]
pub struct RateEntry {
    pub currency: String,
    pub multiplier: f64,
}

/// A row whose multiplier could not be used.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRate {
    pub currency: String,
    pub raw: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    entries: Vec<RateEntry>,
    rejected: Vec<RejectedRate>,
}

impl RateTable {
    pub fn load(path: &Path) -> Result<Self, EtlError> {
        if !path.exists() {
            return Err(EtlError::RateFileMissing(path.to_path_buf()));
        }
        let malformed = |reason: String| EtlError::RateFileMalformed {
            path: path.to_path_buf(),
            reason,
        };

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| malformed(e.to_string()))?;

        let headers = rdr.headers().map_err(|e| malformed(e.to_string()))?.clone();
        if headers.len() < 2 {
            return Err(malformed(format!(
                "expected at least 2 columns, found {}",
                headers.len()
            )));
        }
        let rate_idx = headers
            .iter()
            .skip(1)
            .position(|h| h.trim() == RATE_COLUMN)
            .map(|i| i + 1)
            .ok_or_else(|| malformed(format!("column '{RATE_COLUMN}' not found")))?;

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| malformed(e.to_string()))?;
            let currency = record.get(0).unwrap_or_default().trim().to_lowercase();
            let raw = record.get(rate_idx).unwrap_or_default().trim().to_string();
            rows.push((currency, raw));
        }

        let table = Self::from_rows(rows);
        debug!(
            "Loaded {} exchange rates from {} ({} rejected)",
            table.entries.len(),
            path.display(),
            table.rejected.len()
        );
        Ok(table)
    }

    /// Builds the table from `(currency, raw multiplier)` pairs. Keys are
    /// lowercased; a repeated key keeps its first position and the last value.
    pub fn from_rows<I, C, R>(rows: I) -> Self
    where
        I: IntoIterator<Item = (C, R)>,
        C: AsRef<str>,
        R: AsRef<str>,
    {
        let mut merged: Vec<(String, String)> = Vec::new();
        for (currency, raw) in rows {
            let currency = currency.as_ref().trim().to_lowercase();
            let raw = raw.as_ref().trim().to_string();
            match merged.iter_mut().find(|(c, _)| *c == currency) {
                Some(existing) => existing.1 = raw,
                None => merged.push((currency, raw)),
            }
        }

        let mut table = Self::default();
        for (currency, raw) in merged {
            match raw.parse::<f64>() {
                Ok(multiplier) if multiplier.is_finite() => {
                    table.entries.push(RateEntry {
                        currency,
                        multiplier,
                    });
                }
                _ => {
                    warn!("Transform: skipping invalid rate for {}", currency);
                    table.rejected.push(RejectedRate { currency, raw });
                }
            }
        }
        table
    }

    pub fn entries(&self) -> &[RateEntry] {
        &self.entries
    }

    pub fn rejected(&self) -> &[RejectedRate] {
        &self.rejected
    }
}

#[cfg(test)]
impl RateTable {
    pub(crate) fn get(&self, currency: &str) -> Option<f64> {
        let currency = currency.to_lowercase();
        self.entries
            .iter()
            .find(|e| e.currency == currency)
            .map(|e| e.multiplier)
    }
}
