//! Report rendering

use unicode_width::UnicodeWidthStr;

use crate::detector::scanner::DriftReport;

const HEADER: [&str; 4] = ["USING", "REPO/NAME", "CURRENT VERSION", "LATEST VERSION"];
const MISSING: &str = "-";

/// Output encoding of the report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub fn render(report: &DriftReport, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Table => Ok(render_table(report)),
        OutputFormat::Json => render_json(report),
    }
}

/// Bordered table, one row per result
pub fn render_table(report: &DriftReport) -> String {
    let rows: Vec<[&str; 4]> = report
        .results
        .iter()
        .map(|r| {
            [
                r.status().label(),
                r.name.as_str(),
                r.current_version.as_str(),
                r.latest_version.as_deref().unwrap_or(MISSING),
            ]
        })
        .collect();

    let mut widths = HEADER.map(|h| h.width());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.width());
        }
    }

    let separator = separator_line(&widths);
    let mut out = String::new();
    out.push_str(&separator);
    out.push_str(&row_line(&HEADER, &widths));
    out.push_str(&separator);
    for row in &rows {
        out.push_str(&row_line(row, &widths));
    }
    if !rows.is_empty() {
        out.push_str(&separator);
    }
    out
}

pub fn render_json(report: &DriftReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report).map(|mut json| {
        json.push('\n');
        json
    })
}

fn separator_line(widths: &[usize; 4]) -> String {
    let mut line = String::from("+");
    for width in widths {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line.push('\n');
    line
}

fn row_line(cells: &[&str; 4], widths: &[usize; 4]) -> String {
    let mut line = String::from("|");
    for (cell, width) in cells.iter().zip(widths) {
        line.push(' ');
        line.push_str(cell);
        line.push_str(&" ".repeat(width - cell.width() + 1));
        line.push('|');
    }
    line.push('\n');
    line
}
