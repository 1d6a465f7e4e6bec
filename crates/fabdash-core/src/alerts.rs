//! Relative-outlier alerts. Each threshold is a percentile of the table being
//! inspected, so on non-degenerate data roughly 5% of rows trip each alert.

use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::metrics::require_rows;
use crate::model::{SensorField, SensorReading, SensorTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AlertKind {
    HighVibration,
    LowQuality,
    HighEnergy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Above,
    Below,
}

impl AlertKind {
    pub const ALL: [AlertKind; 3] = [
        AlertKind::HighVibration,
        AlertKind::LowQuality,
        AlertKind::HighEnergy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AlertKind::HighVibration => "High Vibration",
            AlertKind::LowQuality => "Low Quality",
            AlertKind::HighEnergy => "High Energy",
        }
    }

    pub fn field(&self) -> SensorField {
        match self {
            AlertKind::HighVibration => SensorField::VibrationLevel,
            AlertKind::LowQuality => SensorField::ProductionQualityScore,
            AlertKind::HighEnergy => SensorField::EnergyConsumption,
        }
    }

    pub fn quantile(&self) -> f64 {
        match self {
            AlertKind::HighVibration | AlertKind::HighEnergy => 0.95,
            AlertKind::LowQuality => 0.05,
        }
    }

    fn direction(&self) -> Direction {
        match self {
            AlertKind::HighVibration | AlertKind::HighEnergy => Direction::Above,
            AlertKind::LowQuality => Direction::Below,
        }
    }

    fn value(&self, reading: &SensorReading) -> f64 {
        match self {
            AlertKind::HighVibration => reading.vibration_level,
            AlertKind::LowQuality => reading.production_quality_score,
            AlertKind::HighEnergy => reading.energy_consumption,
        }
    }

    /// Whether `value` breaches `threshold` for this alert. Ties never trigger.
    pub fn triggers(&self, value: f64, threshold: f64) -> bool {
        match self.direction() {
            Direction::Above => value > threshold,
            Direction::Below => value < threshold,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlertCount {
    pub kind: AlertKind,
    pub threshold: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertSummary {
    entries: Vec<AlertCount>,
}

impl AlertSummary {
    pub fn entries(&self) -> &[AlertCount] {
        &self.entries
    }

    pub fn get(&self, kind: AlertKind) -> Option<&AlertCount> {
        self.entries.iter().find(|entry| entry.kind == kind)
    }

    pub fn count(&self, kind: AlertKind) -> usize {
        self.get(kind).map(|entry| entry.count).unwrap_or(0)
    }

    pub fn by_name(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|entry| entry.kind.name() == name)
            .map(|entry| entry.count)
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|entry| entry.count).sum()
    }
}

/// Quantile with linear interpolation between closest ranks
/// (`h = (n - 1) * q`). Returns `None` for empty input or `q` outside `[0, 1]`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(interpolate_sorted(&sorted, q))
}

/// `sorted` must be non-empty and ascending; `q` is clamped to `[0, 1]`.
fn interpolate_sorted(sorted: &[f64], q: f64) -> f64 {
    let last = sorted.len() - 1;
    let h = last as f64 * q.clamp(0.0, 1.0);
    let lo = (h.floor() as usize).min(last);
    let hi = (lo + 1).min(last);
    let frac = h - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

pub fn alert_summary(table: &SensorTable) -> Result<AlertSummary> {
    require_rows(table, "alert_summary")?;

    let entries = AlertKind::ALL
        .into_iter()
        .map(|kind| {
            let mut values: Vec<f64> = table.readings().iter().map(|r| kind.value(r)).collect();
            values.sort_by(f64::total_cmp);
            // Non-empty: require_rows rejected empty tables above.
            let threshold = interpolate_sorted(&values, kind.quantile());
            let count = values
                .iter()
                .filter(|value| kind.triggers(**value, threshold))
                .count();
            tracing::debug!(alert = kind.name(), threshold, count, "computed alert threshold");
            AlertCount {
                kind,
                threshold,
                count,
            }
        })
        .collect();

    Ok(AlertSummary { entries })
}
