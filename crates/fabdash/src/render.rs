use std::fmt::Write;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Table};
use fabdash_core::{
    AlertSummary, DataOverview, HourlyAggregate, OperatingGroup, OperationsOverview,
    SensorReading, SummaryMetrics,
};
use serde::Serialize;

/// Panels selected for one invocation. Unselected panels stay `None` and are
/// left out of the JSON output.
#[derive(Debug, Default, Serialize)]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<DataOverview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operations: Option<OperationsOverview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly: Option<HourlyAggregate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts: Option<AlertSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent: Option<Vec<SensorReading>>,
}

impl Report {
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(overview) = &self.overview {
            section(&mut out, "Data Overview", overview_table(overview));
        }
        if let Some(summary) = &self.summary {
            section(&mut out, "Overview KPIs", summary_table(summary));
        }
        if let Some(operations) = &self.operations {
            section(&mut out, "Operations Overview", operations_table(operations));
        }
        if let Some(hourly) = &self.hourly {
            section(&mut out, "Hourly Trends", hourly_table(hourly));
        }
        if let Some(alerts) = &self.alerts {
            section(&mut out, "Quick Alerts", alert_lines(alerts));
        }
        if let Some(recent) = &self.recent {
            section(
                &mut out,
                &format!("Recent Readings (last {})", recent.len()),
                recent_table(recent),
            );
        }
        out
    }
}

fn section(out: &mut String, title: &str, body: impl std::fmt::Display) {
    let _ = writeln!(out, "{title}\n{body}\n");
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header);
    table
}

fn right(value: String) -> Cell {
    Cell::new(value).set_alignment(CellAlignment::Right)
}

fn missing(value: Option<f64>, precision: usize) -> Cell {
    match value {
        Some(v) => right(format!("{v:.precision$}")),
        None => right("n/a".to_string()),
    }
}

pub fn overview_table(overview: &DataOverview) -> Table {
    let mut table = new_table(vec!["Total Records", "Date Range"]);
    table.add_row(vec![
        Cell::new(overview.total_records),
        Cell::new(format!(
            "{} to {}",
            overview.start.format("%Y-%m-%d"),
            overview.end.format("%Y-%m-%d")
        )),
    ]);
    table
}

pub fn summary_table(summary: &SummaryMetrics) -> Table {
    let mut table = new_table(vec![
        "Avg Production Quality",
        "Avg Machine Speed (RPM)",
        "Avg Energy (kWh)",
        "Optimal Conditions %",
    ]);
    table.add_row(vec![
        right(format!("{:.2}", summary.avg_quality)),
        right(format!("{:.0}", summary.avg_speed)),
        right(format!("{:.2}", summary.avg_energy)),
        right(format!("{:.1}%", summary.optimal_pct)),
    ]);
    table
}

pub fn operations_table(operations: &OperationsOverview) -> Table {
    let mut table = new_table(vec![
        "Conditions",
        "Readings",
        "Avg Speed (RPM)",
        "Speed Range (RPM)",
        "Avg Quality",
        "Avg Energy (kWh)",
    ]);
    for group in [&operations.optimal, &operations.off_nominal] {
        table.add_row(operations_row(group));
    }
    table
}

fn operations_row(group: &OperatingGroup) -> Vec<Cell> {
    let label = if group.optimal { "Optimal" } else { "Off-nominal" };
    let range = match group.speed_range {
        Some((lo, hi)) => right(format!("{lo:.0} to {hi:.0}")),
        None => right("n/a".to_string()),
    };
    vec![
        Cell::new(label),
        right(group.readings.to_string()),
        missing(group.avg_speed, 0),
        range,
        missing(group.avg_quality, 2),
        missing(group.avg_energy, 2),
    ]
}

pub fn hourly_table(hourly: &HourlyAggregate) -> Table {
    let mut table = new_table(vec![
        "Hour",
        "Readings",
        "Machine Speed",
        "Quality",
        "Vibration",
        "Energy",
        "Temperature",
    ]);
    for bucket in hourly.buckets() {
        let means = bucket.means;
        table.add_row(vec![
            Cell::new(bucket.start.format("%Y-%m-%d %H:00")),
            right(bucket.readings.to_string()),
            missing(means.map(|m| m.machine_speed), 0),
            missing(means.map(|m| m.production_quality_score), 2),
            missing(means.map(|m| m.vibration_level), 2),
            missing(means.map(|m| m.energy_consumption), 2),
            missing(means.map(|m| m.temperature), 1),
        ]);
    }
    table
}

pub fn alert_lines(alerts: &AlertSummary) -> String {
    alerts
        .entries()
        .iter()
        .map(|entry| {
            if entry.count > 0 {
                format!("⚠️ {}: {} occurrences", entry.kind, entry.count)
            } else {
                format!("✅ {}: No issues", entry.kind)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn recent_table(readings: &[SensorReading]) -> Table {
    let mut table = new_table(vec![
        "DateTime",
        "Vibration (mm/s)",
        "Speed (RPM)",
        "Quality",
        "Optimal",
        "Energy (kWh)",
        "Temperature (°C)",
    ]);
    for reading in readings {
        table.add_row(vec![
            Cell::new(reading.timestamp.format("%Y-%m-%d %H:%M:%S")),
            right(format!("{:.2}", reading.vibration_level)),
            right(format!("{:.0}", reading.machine_speed)),
            right(format!("{:.2}", reading.production_quality_score)),
            Cell::new(reading.optimal_conditions),
            right(format!("{:.2}", reading.energy_consumption)),
            right(format!("{:.1}", reading.temperature)),
        ]);
    }
    table
}
