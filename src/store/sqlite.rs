//! Single-table snapshot store backed by SQLite

use crate::core::table::{Cell, Table};
use anyhow::{Context, Result};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, params, params_from_iter};
use std::path::Path;
use tracing::debug;

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Cell::Null => ToSqlOutput::Owned(Value::Null),
            Cell::Real(v) => ToSqlOutput::from(*v),
            Cell::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

impl From<ValueRef<'_>> for Cell {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Cell::Null,
            ValueRef::Integer(i) => Cell::Real(i as f64),
            ValueRef::Real(f) => Cell::Real(f),
            ValueRef::Text(t) | ValueRef::Blob(t) => {
                Cell::Text(String::from_utf8_lossy(t).into_owned())
            }
        }
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_type(table: &Table, idx: usize) -> &'static str {
    if table.rows().iter().any(|row| matches!(row[idx], Cell::Text(_))) {
        "TEXT"
    } else {
        "REAL"
    }
}

pub struct SqliteStore {
    conn: Connection,
    table: String,
}

impl SqliteStore {
    /// Opens (or creates) the database file, creating parent directories.
    pub fn open(path: &Path, table: &str) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }

    pub fn open_in_memory(table: &str) -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to create in-memory database")?;
        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }

    pub fn table_exists(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![self.table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Drops the table and recreates it with exactly the given columns and
    /// rows, inside one transaction.
    pub fn replace(&mut self, table: &Table) -> Result<usize> {
        let name = quote_ident(&self.table);
        let column_defs = table
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, c)| format!("{} {}", quote_ident(c), column_type(table, idx)))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=table.columns().len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");

        let tx = self.conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {name}"), [])
            .context("Failed to drop previous snapshot")?;
        tx.execute(&format!("CREATE TABLE {name} ({column_defs})"), [])
            .context("Failed to create snapshot table")?;
        {
            let mut stmt = tx.prepare(&format!("INSERT INTO {name} VALUES ({placeholders})"))?;
            for row in table.rows() {
                stmt.execute(params_from_iter(row.iter()))
                    .context("Failed to insert row")?;
            }
        }
        tx.commit()?;

        debug!(rows = table.len(), table = %self.table, "Replaced snapshot");
        Ok(table.len())
    }

    /// Reads the whole table, `None` when it has never been written.
    pub fn read(&self) -> Result<Option<Table>> {
        if !self.table_exists()? {
            return Ok(None);
        }

        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {}", quote_ident(&self.table)))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(Cell::from))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(Table::new(columns, rows)?))
    }
}
