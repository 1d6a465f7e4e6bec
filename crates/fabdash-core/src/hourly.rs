use chrono::{NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::model::{SensorField, SensorReading, SensorTable};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketMeans {
    pub vibration_level: f64,
    pub machine_speed: f64,
    pub production_quality_score: f64,
    /// Fraction of readings in the bucket flagged optimal.
    pub optimal_conditions: f64,
    pub energy_consumption: f64,
    pub temperature: f64,
}

impl BucketMeans {
    pub fn get(&self, field: SensorField) -> Option<f64> {
        match field {
            SensorField::Timestamp => None,
            SensorField::VibrationLevel => Some(self.vibration_level),
            SensorField::MachineSpeed => Some(self.machine_speed),
            SensorField::ProductionQualityScore => Some(self.production_quality_score),
            SensorField::OptimalConditions => Some(self.optimal_conditions),
            SensorField::EnergyConsumption => Some(self.energy_consumption),
            SensorField::Temperature => Some(self.temperature),
        }
    }
}

/// One wall-clock hour `[start, start + 1h)`. `means` is `None` when the hour
/// had no readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourlyBucket {
    pub start: NaiveDateTime,
    pub readings: usize,
    pub means: Option<BucketMeans>,
}

impl HourlyBucket {
    pub fn is_gap(&self) -> bool {
        self.means.is_none()
    }

    pub fn end(&self) -> NaiveDateTime {
        self.start + TimeDelta::hours(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyAggregate {
    buckets: Vec<HourlyBucket>,
}

impl HourlyAggregate {
    pub fn buckets(&self) -> &[HourlyBucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn gap_count(&self) -> usize {
        self.buckets.iter().filter(|bucket| bucket.is_gap()).count()
    }

    /// Trend line for one field; gaps stay `None`.
    pub fn series(&self, field: SensorField) -> Vec<(NaiveDateTime, Option<f64>)> {
        self.buckets
            .iter()
            .map(|bucket| {
                (
                    bucket.start,
                    bucket.means.and_then(|means| means.get(field)),
                )
            })
            .collect()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct BucketSums {
    count: usize,
    vibration_level: f64,
    machine_speed: f64,
    production_quality_score: f64,
    optimal_conditions: f64,
    energy_consumption: f64,
    temperature: f64,
}

impl BucketSums {
    fn push(&mut self, reading: &SensorReading) {
        self.count += 1;
        self.vibration_level += reading.vibration_level;
        self.machine_speed += reading.machine_speed;
        self.production_quality_score += reading.production_quality_score;
        self.optimal_conditions += if reading.optimal_conditions { 1.0 } else { 0.0 };
        self.energy_consumption += reading.energy_consumption;
        self.temperature += reading.temperature;
    }

    fn means(&self) -> Option<BucketMeans> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(BucketMeans {
            vibration_level: self.vibration_level / n,
            machine_speed: self.machine_speed / n,
            production_quality_score: self.production_quality_score / n,
            optimal_conditions: self.optimal_conditions / n,
            energy_consumption: self.energy_consumption / n,
            temperature: self.temperature / n,
        })
    }
}

/// Twenty years of hourly buckets. Wider spans almost always mean a stray
/// timestamp rather than real history.
pub const MAX_HOURLY_BUCKETS: usize = 24 * 366 * 20;

pub fn floor_hour(ts: NaiveDateTime) -> NaiveDateTime {
    let hour = NaiveTime::from_hms_opt(ts.hour(), 0, 0).unwrap_or(NaiveTime::MIN);
    ts.date().and_time(hour)
}

/// Means per wall-clock hour from the hour holding the first reading through
/// the hour holding the last one.
pub fn hourly_aggregates(table: &SensorTable) -> Result<HourlyAggregate> {
    let (min_ts, max_ts) = table.time_span().ok_or(PipelineError::EmptyInput {
        operation: "hourly_aggregates",
    })?;
    let first = floor_hour(min_ts);
    let buckets = (floor_hour(max_ts) - first).num_hours() + 1;
    if buckets > MAX_HOURLY_BUCKETS as i64 {
        return Err(PipelineError::SpanTooLarge {
            operation: "hourly_aggregates",
            buckets,
            limit: MAX_HOURLY_BUCKETS,
        });
    }
    let bucket_count = buckets as usize;

    let mut sums = vec![BucketSums::default(); bucket_count];
    for reading in table {
        let idx = (floor_hour(reading.timestamp) - first).num_hours() as usize;
        sums[idx].push(reading);
    }

    let buckets = sums
        .iter()
        .enumerate()
        .map(|(idx, sum)| HourlyBucket {
            start: first + TimeDelta::hours(idx as i64),
            readings: sum.count,
            means: sum.means(),
        })
        .collect();

    Ok(HourlyAggregate { buckets })
}
