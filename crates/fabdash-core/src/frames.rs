use chrono::NaiveDateTime;
use polars::prelude::*;

use crate::error::Result;
use crate::hourly::HourlyAggregate;
use crate::model::{SensorField, SensorReading, SensorTable};

fn micros(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_micros()
}

fn datetime_column(name: &str, values: Vec<i64>) -> Result<Column> {
    let series = Series::new(name.into(), values)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
    Ok(series.into())
}

fn float_column(table: &SensorTable, field: SensorField, value: fn(&SensorReading) -> f64) -> Column {
    Series::new(field.canonical_name().into(), table.column(value)).into()
}

/// The full table with internal column names and a naive datetime index column.
pub fn table_frame(table: &SensorTable) -> Result<DataFrame> {
    let timestamps: Vec<i64> = table.readings().iter().map(|r| micros(r.timestamp)).collect();
    let optimal: Vec<bool> = table.readings().iter().map(|r| r.optimal_conditions).collect();

    let columns = vec![
        datetime_column(SensorField::Timestamp.canonical_name(), timestamps)?,
        float_column(table, SensorField::VibrationLevel, |r| r.vibration_level),
        float_column(table, SensorField::MachineSpeed, |r| r.machine_speed),
        float_column(table, SensorField::ProductionQualityScore, |r| {
            r.production_quality_score
        }),
        Series::new(SensorField::OptimalConditions.canonical_name().into(), optimal).into(),
        float_column(table, SensorField::EnergyConsumption, |r| r.energy_consumption),
        float_column(table, SensorField::Temperature, |r| r.temperature),
    ];

    Ok(DataFrame::new(columns)?)
}

/// Hourly means, one row per bucket. Empty hours are nulls.
pub fn hourly_frame(hourly: &HourlyAggregate) -> Result<DataFrame> {
    let starts: Vec<i64> = hourly.buckets().iter().map(|b| micros(b.start)).collect();
    let readings: Vec<i64> = hourly.buckets().iter().map(|b| b.readings as i64).collect();

    let mut columns = vec![
        datetime_column("bucket_start", starts)?,
        Series::new("readings".into(), readings).into(),
    ];
    for field in &SensorField::ALL[1..] {
        let values: Vec<Option<f64>> = hourly
            .series(*field)
            .into_iter()
            .map(|(_, value)| value)
            .collect();
        columns.push(Series::new(field.canonical_name().into(), values).into());
    }

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hourly::hourly_aggregates;
    use chrono::NaiveDate;

    fn table() -> SensorTable {
        let base = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        SensorTable::from_readings(
            [0i64, 20, 150]
                .into_iter()
                .map(|minutes| SensorReading {
                    timestamp: base + chrono::TimeDelta::minutes(minutes),
                    vibration_level: 1.0,
                    machine_speed: 1000.0 + minutes as f64,
                    production_quality_score: 90.0,
                    optimal_conditions: minutes < 100,
                    energy_consumption: 3.0,
                    temperature: 40.0,
                })
                .collect(),
        )
    }

    #[test]
    fn table_frame_uses_internal_names() -> Result<()> {
        let df = table_frame(&table())?;
        let expected: Vec<&str> = SensorField::ALL.iter().map(|f| f.canonical_name()).collect();
        assert_eq!(df.get_column_names(), expected);
        assert_eq!(df.height(), 3);
        assert_eq!(df.column("machine_speed")?.f64()?.get(2), Some(1150.0));
        Ok(())
    }

    #[test]
    fn hourly_frame_marks_gaps_as_null() -> Result<()> {
        let hourly = hourly_aggregates(&table())?;
        let df = hourly_frame(&hourly)?;
        assert_eq!(df.height(), 3);

        let speed = df.column("machine_speed")?.f64()?;
        assert_eq!(speed.get(0), Some(1010.0));
        assert_eq!(speed.get(1), None);
        assert_eq!(speed.get(2), Some(1150.0));
        assert_eq!(df.column("readings")?.i64()?.get(1), Some(0));
        Ok(())
    }
}
