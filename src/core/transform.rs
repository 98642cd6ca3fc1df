//! Conversion of the base-currency price into every configured rate

use crate::core::clock::Clock;
use crate::core::error::EtlError;
use crate::core::rates::{RateTable, RejectedRate};
use crate::core::table::{ASSET_COLUMN, CONVERTED_PREFIX, Cell, LAST_UPDATED_COLUMN, Table};
use tracing::{debug, info};

/// Number of decimal places kept on converted prices.
pub const CONVERTED_DECIMALS: i32 = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedTable {
    pub table: Table,
    pub last_updated: String,
    /// Rate rows that were dropped instead of producing a column.
    pub skipped: Vec<RejectedRate>,
}

#[derive(Debug)]
pub enum TransformOutcome {
    Converted(ConvertedTable),
    Unchanged { table: Table, reason: EtlError },
}

impl TransformOutcome {
    pub fn table(&self) -> &Table {
        match self {
            TransformOutcome::Converted(converted) => &converted.table,
            TransformOutcome::Unchanged { table, .. } => table,
        }
    }

    pub fn into_table(self) -> Table {
        match self {
            TransformOutcome::Converted(converted) => converted.table,
            TransformOutcome::Unchanged { table, .. } => table,
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self, TransformOutcome::Converted(_))
    }
}

/// Rounds half to even at the given number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

pub fn converted_column_name(currency: &str) -> String {
    format!("{CONVERTED_PREFIX}{}", currency.to_uppercase())
}

/// First non-identifier column whose name equals or contains `base_currency`,
/// compared case-insensitively.
pub fn find_base_column<'a>(table: &'a Table, base_currency: &str) -> Option<&'a str> {
    let base = base_currency.to_lowercase();
    table
        .columns()
        .iter()
        .filter(|c| c.as_str() != ASSET_COLUMN)
        .find(|c| {
            let lower = c.to_lowercase();
            lower == base || lower.contains(&base)
        })
        .map(String::as_str)
}

/// Converts `table` with the rates returned by `load_rates`. The rates are
/// only loaded once the table is known to have rows.
pub fn transform<F>(
    table: Table,
    load_rates: F,
    base_currency: &str,
    clock: &dyn Clock,
) -> TransformOutcome
where
    F: FnOnce() -> Result<RateTable, EtlError>,
{
    info!("Transform: started");

    let outcome = convert(table, load_rates, base_currency, clock);
    match &outcome {
        TransformOutcome::Converted(converted) => {
            debug!(
                columns = converted.table.columns().len(),
                skipped = converted.skipped.len(),
                "Converted quote table"
            );
            info!("Transform: completed");
        }
        TransformOutcome::Unchanged { reason, .. } => {
            info!("Transform: aborted ({})", reason);
        }
    }
    outcome
}

fn convert<F>(
    mut table: Table,
    load_rates: F,
    base_currency: &str,
    clock: &dyn Clock,
) -> TransformOutcome
where
    F: FnOnce() -> Result<RateTable, EtlError>,
{
    if table.is_empty() {
        return TransformOutcome::Unchanged {
            table,
            reason: EtlError::EmptyInput,
        };
    }

    let rates = match load_rates() {
        Ok(rates) => rates,
        Err(reason) => return TransformOutcome::Unchanged { table, reason },
    };

    let Some(base_column) = find_base_column(&table, base_currency).map(str::to_string) else {
        return TransformOutcome::Unchanged {
            table,
            reason: EtlError::MissingBaseColumn(base_currency.to_uppercase()),
        };
    };
    let base_prices: Vec<Option<f64>> = table
        .column(&base_column)
        .unwrap_or_default()
        .into_iter()
        .map(Cell::as_f64)
        .collect();

    for entry in rates.entries() {
        let cells = base_prices
            .iter()
            .map(|price| {
                Cell::from(price.map(|p| round_to(p * entry.multiplier, CONVERTED_DECIMALS)))
            })
            .collect();
        table.set_column(&converted_column_name(&entry.currency), cells);
    }

    let last_updated = clock.now().to_rfc3339();
    table.set_column(
        LAST_UPDATED_COLUMN,
        vec![Cell::Text(last_updated.clone()); table.len()],
    );

    TransformOutcome::Converted(ConvertedTable {
        table,
        last_updated,
        skipped: rates.rejected().to_vec(),
    })
}
