use super::{logs, ui};
use crate::core::config::AppConfig;
use crate::core::table::{ASSET_COLUMN, CONVERTED_PREFIX, LAST_UPDATED_COLUMN, Table};
use crate::store::SqliteStore;
use anyhow::Result;
use comfy_table::Cell;
use std::cmp::Ordering;

const BAR_WIDTH: usize = 40;

/// Columns offered for charting: the converted prices when there are any,
/// otherwise every numeric column.
pub fn chart_options(table: &Table) -> Vec<&str> {
    let converted: Vec<&str> = table
        .columns()
        .iter()
        .filter(|c| c.starts_with(CONVERTED_PREFIX) && table.is_numeric(c))
        .map(String::as_str)
        .collect();
    if !converted.is_empty() {
        return converted;
    }
    table
        .columns()
        .iter()
        .filter(|c| table.is_numeric(c))
        .map(String::as_str)
        .collect()
}

/// `(asset, value)` pairs sorted by value, largest first, missing values last.
pub fn chart_bars(table: &Table, column: &str) -> Vec<(String, Option<f64>)> {
    let Some(values) = table.column(column) else {
        return Vec::new();
    };
    let labels: Vec<String> = match table.column(ASSET_COLUMN) {
        Some(cells) => cells.iter().map(|c| c.to_string()).collect(),
        None => (0..table.len()).map(|i| i.to_string()).collect(),
    };

    let mut bars: Vec<(String, Option<f64>)> = labels
        .into_iter()
        .zip(values.into_iter().map(|c| c.as_f64()))
        .collect();
    bars.sort_by(|(_, a), (_, b)| match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    bars
}

pub fn render_bar_chart(column: &str, bars: &[(String, Option<f64>)], width: usize) -> String {
    let label_width = bars.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);
    let max = bars
        .iter()
        .filter_map(|(_, v)| *v)
        .fold(0.0_f64, f64::max);

    let mut output = format!("{}\n", ui::style_text(column, ui::StyleType::Title));
    for (label, value) in bars {
        let (bar, text) = match value {
            Some(v) if max > 0.0 && *v > 0.0 => {
                let len = ((v / max) * width as f64).round().max(1.0) as usize;
                ("█".repeat(len), format!("{v}"))
            }
            Some(v) => (String::new(), format!("{v}")),
            None => (String::new(), "N/A".to_string()),
        };
        output.push_str(&format!("{label:<label_width$} │{bar} {text}\n"));
    }
    output
}

pub fn render_table(table: &Table) -> String {
    let mut view = ui::new_styled_table();
    view.set_header(
        table
            .columns()
            .iter()
            .map(|c| ui::header_cell(c))
            .collect::<Vec<Cell>>(),
    );
    for row in table.rows() {
        view.add_row(row.iter().map(ui::value_cell).collect::<Vec<Cell>>());
    }
    view.to_string()
}

/// Reads the persisted snapshot. Problems are reported and yield an empty table.
pub fn load_snapshot(config: &AppConfig) -> Table {
    let database = &config.paths.database;
    if !database.exists() {
        println!(
            "{}",
            ui::style_text(
                &format!(
                    "Database '{}' not found. Run ETL first.",
                    database.display()
                ),
                ui::StyleType::Warning
            )
        );
        return Table::default();
    }

    match SqliteStore::open(database, &config.paths.table).and_then(|store| store.read()) {
        Ok(table) => table.unwrap_or_default(),
        Err(e) => {
            println!(
                "{}",
                ui::style_text(
                    &format!("Failed to load data from DB: {e:#}"),
                    ui::StyleType::Error
                )
            );
            Table::default()
        }
    }
}

pub fn run(config: &AppConfig, column: Option<&str>, show_logs: bool) -> Result<()> {
    let table = load_snapshot(config);

    if table.is_empty() {
        println!("No data available. Run 'crypto-etl run' to fetch data.");
    } else {
        println!("{}", ui::style_text("Data Table", ui::StyleType::Title));
        println!("{}", render_table(&table));

        let options = chart_options(&table);
        let chosen = match column {
            Some(c) if table.is_numeric(c) => Some(c),
            Some(c) => anyhow::bail!(
                "Column '{}' cannot be charted. Choose one of: {}",
                c,
                options.join(", ")
            ),
            None => options.first().copied(),
        };
        if let Some(chosen) = chosen {
            println!();
            print!(
                "{}",
                render_bar_chart(chosen, &chart_bars(&table, chosen), BAR_WIDTH)
            );
        }

        if let Some(first) = table
            .column(LAST_UPDATED_COLUMN)
            .and_then(|cells| cells.first().map(|c| c.to_string()))
        {
            println!("\nLast updated (first row): {first}");
        }
    }

    if show_logs {
        ui::print_separator();
        logs::run(&config.paths.log_file)?;
    }
    Ok(())
}
