use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::model::SensorTable;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub avg_quality: f64,
    pub avg_speed: f64,
    pub avg_energy: f64,
    /// Share of readings under optimal conditions in percent. Unrounded, so it
    /// only reaches 0 or 100 when no or every reading is optimal.
    pub optimal_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataOverview {
    pub total_records: usize,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

pub fn summary_metrics(table: &SensorTable) -> Result<SummaryMetrics> {
    let rows = require_rows(table, "summary_metrics")? as f64;

    let mut quality = 0.0;
    let mut speed = 0.0;
    let mut energy = 0.0;
    let mut optimal = 0usize;
    for reading in table {
        quality += reading.production_quality_score;
        speed += reading.machine_speed;
        energy += reading.energy_consumption;
        if reading.optimal_conditions {
            optimal += 1;
        }
    }

    Ok(SummaryMetrics {
        avg_quality: quality / rows,
        avg_speed: speed / rows,
        avg_energy: energy / rows,
        optimal_pct: optimal as f64 * 100.0 / rows,
    })
}

/// Speed, quality and energy for one side of the optimal-conditions split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OperatingGroup {
    pub optimal: bool,
    pub readings: usize,
    pub avg_speed: Option<f64>,
    pub avg_quality: Option<f64>,
    pub avg_energy: Option<f64>,
    pub speed_range: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OperationsOverview {
    pub optimal: OperatingGroup,
    pub off_nominal: OperatingGroup,
}

/// Machine speed against production quality, split by the optimal flag and
/// carrying mean energy for each side.
pub fn operations_overview(table: &SensorTable) -> Result<OperationsOverview> {
    require_rows(table, "operations_overview")?;
    Ok(OperationsOverview {
        optimal: operating_group(table, true),
        off_nominal: operating_group(table, false),
    })
}

fn operating_group(table: &SensorTable, optimal: bool) -> OperatingGroup {
    let rows: Vec<_> = table
        .readings()
        .iter()
        .filter(|reading| reading.optimal_conditions == optimal)
        .collect();
    let speed_range = rows.iter().map(|r| r.machine_speed).fold(None, |range, speed| {
        Some(match range {
            None => (speed, speed),
            Some((lo, hi)) => (f64::min(lo, speed), f64::max(hi, speed)),
        })
    });

    OperatingGroup {
        optimal,
        readings: rows.len(),
        avg_speed: mean(rows.iter().map(|r| r.machine_speed)),
        avg_quality: mean(rows.iter().map(|r| r.production_quality_score)),
        avg_energy: mean(rows.iter().map(|r| r.energy_consumption)),
        speed_range,
    }
}

pub fn data_overview(table: &SensorTable) -> Result<DataOverview> {
    let (start, end) = table.time_span().ok_or(PipelineError::EmptyInput {
        operation: "data_overview",
    })?;
    Ok(DataOverview {
        total_records: table.len(),
        start,
        end,
    })
}

pub(crate) fn require_rows(table: &SensorTable, operation: &'static str) -> Result<usize> {
    if table.is_empty() {
        return Err(PipelineError::EmptyInput { operation });
    }
    Ok(table.len())
}

pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}
