use std::fmt;

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// Columns every input file must carry, in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorField {
    Timestamp,
    VibrationLevel,
    MachineSpeed,
    ProductionQualityScore,
    OptimalConditions,
    EnergyConsumption,
    Temperature,
}

impl SensorField {
    pub const ALL: [SensorField; 7] = [
        SensorField::Timestamp,
        SensorField::VibrationLevel,
        SensorField::MachineSpeed,
        SensorField::ProductionQualityScore,
        SensorField::OptimalConditions,
        SensorField::EnergyConsumption,
        SensorField::Temperature,
    ];

    pub fn canonical_name(&self) -> &'static str {
        match self {
            SensorField::Timestamp => "timestamp",
            SensorField::VibrationLevel => "vibration_level",
            SensorField::MachineSpeed => "machine_speed",
            SensorField::ProductionQualityScore => "production_quality_score",
            SensorField::OptimalConditions => "optimal_conditions",
            SensorField::EnergyConsumption => "energy_consumption",
            SensorField::Temperature => "temperature",
        }
    }

    /// Header used by the plant export.
    pub fn source_header(&self) -> &'static str {
        match self {
            SensorField::Timestamp => "Timestamp",
            SensorField::VibrationLevel => "Vibration Level (mm/s)",
            SensorField::MachineSpeed => "Machine Speed (RPM)",
            SensorField::ProductionQualityScore => "Production Quality Score",
            SensorField::OptimalConditions => "Optimal Conditions",
            SensorField::EnergyConsumption => "Energy Consumption (kWh)",
            SensorField::Temperature => "Temperature (°C)",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            SensorField::Timestamp => &["DateTime"],
            _ => &[],
        }
    }

    /// Resolves a header cell through the static mapping. Internal names are
    /// accepted too, so a file that was already renamed maps to the same field.
    pub fn from_header(header: &str) -> Option<Self> {
        let trimmed = header.trim().trim_start_matches('\u{feff}').trim();
        Self::ALL.into_iter().find(|field| {
            trimmed == field.source_header()
                || trimmed == field.canonical_name()
                || field.aliases().iter().any(|alias| trimmed == *alias)
        })
    }

    pub fn is_non_negative(&self) -> bool {
        matches!(
            self,
            SensorField::VibrationLevel
                | SensorField::MachineSpeed
                | SensorField::EnergyConsumption
        )
    }
}

impl fmt::Display for SensorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub timestamp: NaiveDateTime,
    /// mm/s
    pub vibration_level: f64,
    /// RPM
    pub machine_speed: f64,
    pub production_quality_score: f64,
    pub optimal_conditions: bool,
    /// kWh
    pub energy_consumption: f64,
    /// °C
    pub temperature: f64,
}

/// Readings ordered by timestamp. Duplicate timestamps are kept in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorTable {
    readings: Vec<SensorReading>,
}

impl SensorTable {
    pub fn from_readings(mut readings: Vec<SensorReading>) -> Self {
        readings.sort_by_key(|reading| reading.timestamp);
        Self { readings }
    }

    pub fn readings(&self) -> &[SensorReading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn first(&self) -> Option<&SensorReading> {
        self.readings.first()
    }

    pub fn last(&self) -> Option<&SensorReading> {
        self.readings.last()
    }

    pub fn time_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((self.first()?.timestamp, self.last()?.timestamp))
    }

    pub fn duration(&self) -> Option<TimeDelta> {
        self.time_span().map(|(start, end)| end - start)
    }

    /// Every reading recorded at exactly `timestamp`.
    pub fn readings_at(&self, timestamp: NaiveDateTime) -> &[SensorReading] {
        let lo = self.readings.partition_point(|r| r.timestamp < timestamp);
        let hi = self.readings.partition_point(|r| r.timestamp <= timestamp);
        &self.readings[lo..hi]
    }

    /// Readings with `start <= timestamp < end`.
    pub fn range(&self, start: NaiveDateTime, end: NaiveDateTime) -> &[SensorReading] {
        if end <= start {
            return &[];
        }
        let lo = self.readings.partition_point(|r| r.timestamp < start);
        let hi = self.readings.partition_point(|r| r.timestamp < end);
        &self.readings[lo..hi]
    }

    /// The last `rows` readings.
    pub fn tail(&self, rows: usize) -> &[SensorReading] {
        let skip = self.readings.len().saturating_sub(rows);
        &self.readings[skip..]
    }

    pub fn is_sorted(&self) -> bool {
        self.readings
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp)
    }

    pub(crate) fn column(&self, field: fn(&SensorReading) -> f64) -> Vec<f64> {
        self.readings.iter().map(field).collect()
    }
}

impl<'a> IntoIterator for &'a SensorTable {
    type Item = &'a SensorReading;
    type IntoIter = std::slice::Iter<'a, SensorReading>;

    fn into_iter(self) -> Self::IntoIter {
        self.readings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn reading(hour: u32, minute: u32) -> SensorReading {
        SensorReading {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(hour, minute, 0)
                .unwrap(),
            vibration_level: f64::from(minute),
            machine_speed: 1200.0,
            production_quality_score: 90.0,
            optimal_conditions: true,
            energy_consumption: 4.0,
            temperature: 60.0,
        }
    }

    #[test]
    fn header_mapping_accepts_source_and_internal_names() {
        for field in SensorField::ALL {
            assert_eq!(SensorField::from_header(field.source_header()), Some(field));
            assert_eq!(SensorField::from_header(field.canonical_name()), Some(field));
        }
        assert_eq!(
            SensorField::from_header("\u{feff}Timestamp "),
            Some(SensorField::Timestamp)
        );
        assert_eq!(
            SensorField::from_header("DateTime"),
            Some(SensorField::Timestamp)
        );
        assert_eq!(SensorField::from_header("Humidity (%)"), None);
    }

    #[test]
    fn from_readings_sorts_stably() {
        let mut dup = reading(9, 0);
        dup.vibration_level = 99.0;
        let table = SensorTable::from_readings(vec![reading(10, 0), reading(9, 0), dup]);

        assert!(table.is_sorted());
        let at_nine = table.readings_at(reading(9, 0).timestamp);
        assert_eq!(at_nine.len(), 2);
        assert_eq!(at_nine[0].vibration_level, 0.0);
        assert_eq!(at_nine[1].vibration_level, 99.0);
    }

    #[test]
    fn lookup_at_the_end_of_time() {
        let mut last = reading(9, 0);
        last.timestamp = NaiveDateTime::MAX;
        let table = SensorTable::from_readings(vec![reading(9, 0), last.clone(), last]);

        assert_eq!(table.readings_at(NaiveDateTime::MAX).len(), 2);
        assert_eq!(table.readings_at(reading(9, 0).timestamp).len(), 1);
        assert!(table.readings_at(reading(9, 1).timestamp).is_empty());
    }

    #[test]
    fn range_and_tail_slice_the_table() {
        let table = SensorTable::from_readings(
            (0..6).map(|idx| reading(8 + idx, 15)).collect(),
        );

        let slice = table.range(reading(9, 0).timestamp, reading(11, 15).timestamp);
        assert_eq!(slice.len(), 2);
        assert_eq!(table.tail(2).len(), 2);
        assert_eq!(table.tail(2)[1].timestamp, reading(13, 15).timestamp);
        assert_eq!(table.tail(100).len(), 6);
        assert!(table.range(reading(11, 0).timestamp, reading(9, 0).timestamp).is_empty());
    }
}
