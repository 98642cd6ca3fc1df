//! Tabular values passed between the pipeline stages

use std::collections::BTreeMap;
use std::fmt::Display;

/// Name of the asset identifier column.
pub const ASSET_COLUMN: &str = "crypto";

/// Name of the column stamped by the transform stage.
pub const LAST_UPDATED_COLUMN: &str = "last_updated";

/// Prefix of every derived conversion column.
pub const CONVERTED_PREFIX: &str = "price_in_";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Real(f64),
    Text(String),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Real(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Null, Cell::Real)
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Null => write!(f, "N/A"),
            Cell::Real(v) => write!(f, "{v}"),
            Cell::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Prices for one tracked asset, keyed by lowercase currency code.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetQuote {
    pub asset: String,
    pub prices: BTreeMap<String, Option<f64>>,
}

/// Column-named rows. Every row has exactly one cell per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> anyhow::Result<Self> {
        if let Some(row) = rows.iter().find(|r| r.len() != columns.len()) {
            anyhow::bail!(
                "Row has {} cells but table has {} columns",
                row.len(),
                columns.len()
            );
        }
        Ok(Self { columns, rows })
    }

    /// Builds the quote table: one row per quote in the given order, the
    /// identifier column first, then `currencies` in order followed by any
    /// other code present in the quotes, alphabetically.
    pub fn from_quotes(quotes: &[AssetQuote], currencies: &[String]) -> Self {
        if quotes.is_empty() {
            return Self::default();
        }

        let mut codes: Vec<String> = Vec::new();
        for code in currencies.iter().map(|c| c.to_lowercase()) {
            if !codes.contains(&code) && quotes.iter().any(|q| q.prices.contains_key(&code)) {
                codes.push(code);
            }
        }
        let requested = codes.len();
        for quote in quotes {
            for code in quote.prices.keys() {
                if !codes.contains(code) {
                    codes.push(code.clone());
                }
            }
        }
        codes[requested..].sort();

        let rows = quotes
            .iter()
            .map(|quote| {
                std::iter::once(Cell::Text(quote.asset.clone()))
                    .chain(
                        codes
                            .iter()
                            .map(|code| Cell::from(quote.prices.get(code).copied().flatten())),
                    )
                    .collect()
            })
            .collect();

        let columns = std::iter::once(ASSET_COLUMN.to_string())
            .chain(codes)
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// True when the column holds at least one number and no text.
    pub fn is_numeric(&self, name: &str) -> bool {
        self.column(name).is_some_and(|cells| {
            cells.iter().any(|c| matches!(c, Cell::Real(_)))
                && !cells.iter().any(|c| matches!(c, Cell::Text(_)))
        })
    }

    /// Assigns a column, replacing it in place when the name already exists
    /// and appending it otherwise.
    pub fn set_column(&mut self, name: &str, cells: Vec<Cell>) {
        debug_assert_eq!(cells.len(), self.rows.len());
        match self.column_index(name) {
            Some(idx) => {
                for (row, cell) in self.rows.iter_mut().zip(cells) {
                    row[idx] = cell;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, cell) in self.rows.iter_mut().zip(cells) {
                    row.push(cell);
                }
            }
        }
    }
}
