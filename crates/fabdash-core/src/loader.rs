use std::fs;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use csv::StringRecord;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::model::{SensorField, SensorReading, SensorTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Reads a sensor export from disk with default options.
pub fn load(path: impl AsRef<Path>) -> Result<SensorTable> {
    load_with_options(path, &LoadOptions::default())
}

pub fn load_with_options(path: impl AsRef<Path>, options: &LoadOptions) -> Result<SensorTable> {
    let path = path.as_ref();
    let content = fs::read(path).map_err(|err| PipelineError::io(path, err))?;
    let table = parse_bytes(&content, options)?;
    info!(
        path = %path.display(),
        rows = table.len(),
        "loaded sensor table"
    );
    Ok(table)
}

pub fn load_from_reader<R: Read>(reader: R, options: &LoadOptions) -> Result<SensorTable> {
    let mut csv_reader = reader_builder(options).from_reader(reader);
    parse_records(&mut csv_reader)
}

pub(crate) fn parse_bytes(content: &[u8], options: &LoadOptions) -> Result<SensorTable> {
    load_from_reader(content, options)
}

fn reader_builder(options: &LoadOptions) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .flexible(true)
        .delimiter(options.delimiter);
    builder
}

fn parse_records<R: Read>(reader: &mut csv::Reader<R>) -> Result<SensorTable> {
    let header = reader.headers()?.clone();
    let columns = ColumnIndex::from_header(&header)?;

    let mut readings = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let line = record.position().map(|pos| pos.line()).unwrap_or(0);
        let row = RowContext { row: idx + 1, line };
        readings.push(columns.parse_row(&record, row)?);
    }
    debug!(rows = readings.len(), "parsed sensor rows");

    Ok(SensorTable::from_readings(readings))
}

#[derive(Debug, Clone, Copy)]
struct RowContext {
    row: usize,
    line: u64,
}

impl RowContext {
    fn error(&self, message: impl Into<String>) -> PipelineError {
        PipelineError::Parse {
            row: self.row,
            line: self.line,
            message: message.into(),
        }
    }
}

/// Position of each required field within the header row.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    positions: [usize; SensorField::ALL.len()],
}

impl ColumnIndex {
    fn from_header(header: &StringRecord) -> Result<Self> {
        let mut positions = [usize::MAX; SensorField::ALL.len()];
        for (position, cell) in header.iter().enumerate() {
            let Some(field) = SensorField::from_header(cell) else {
                continue;
            };
            let slot = &mut positions[field as usize];
            if *slot == usize::MAX {
                *slot = position;
            }
        }

        if let Some(missing) = SensorField::ALL
            .into_iter()
            .find(|field| positions[*field as usize] == usize::MAX)
        {
            return Err(PipelineError::Schema {
                column: missing.source_header().to_string(),
            });
        }

        Ok(Self { positions })
    }

    fn cell<'r>(&self, record: &'r StringRecord, field: SensorField, row: RowContext) -> Result<&'r str> {
        record
            .get(self.positions[field as usize])
            .ok_or_else(|| row.error(format!("missing value for column '{field}'")))
    }

    fn number(&self, record: &StringRecord, field: SensorField, row: RowContext) -> Result<f64> {
        parse_number(self.cell(record, field, row)?, field, row)
    }

    fn parse_row(&self, record: &StringRecord, row: RowContext) -> Result<SensorReading> {
        Ok(SensorReading {
            timestamp: parse_timestamp(self.cell(record, SensorField::Timestamp, row)?, row)?,
            vibration_level: self.number(record, SensorField::VibrationLevel, row)?,
            machine_speed: self.number(record, SensorField::MachineSpeed, row)?,
            production_quality_score: self.number(
                record,
                SensorField::ProductionQualityScore,
                row,
            )?,
            optimal_conditions: parse_flag(
                self.cell(record, SensorField::OptimalConditions, row)?,
                row,
            )?,
            energy_consumption: self.number(record, SensorField::EnergyConsumption, row)?,
            temperature: self.number(record, SensorField::Temperature, row)?,
        })
    }
}

fn parse_timestamp(value: &str, row: RowContext) -> Result<NaiveDateTime> {
    static FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    let trimmed = value.trim();
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_utc());
    }
    Err(row.error(format!("invalid timestamp '{trimmed}'")))
}

fn parse_number(value: &str, field: SensorField, row: RowContext) -> Result<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Err(row.error(format!("missing value for column '{field}'")));
    }

    let parsed = trimmed.parse::<f64>().map_err(|err| {
        row.error(format!(
            "failed to parse column '{field}' value '{trimmed}' as number: {err}"
        ))
    })?;

    if !parsed.is_finite() {
        return Err(row.error(format!("column '{field}' value '{trimmed}' is not finite")));
    }
    if field.is_non_negative() && parsed < 0.0 {
        return Err(row.error(format!(
            "column '{field}' must be non-negative, found {parsed}"
        )));
    }
    Ok(parsed)
}

fn parse_flag(value: &str, row: RowContext) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "1.0" => Ok(true),
        "false" | "f" | "no" | "n" | "0" | "0.0" => Ok(false),
        other => Err(row.error(format!(
            "column '{}' value '{other}' is not a boolean",
            SensorField::OptimalConditions
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Timestamp,Vibration Level (mm/s),Machine Speed (RPM),Production Quality Score,Optimal Conditions,Energy Consumption (kWh),Temperature (°C)";

    fn parse(body: &str) -> Result<SensorTable> {
        let content = format!("{HEADER}\n{body}");
        parse_bytes(content.as_bytes(), &LoadOptions::default())
    }

    #[test]
    fn parses_and_sorts_rows() {
        let table = parse(
            "2024-03-01 10:30:00,2.5,1500,88.1,True,4.2,61.0\n\
             2024-03-01 09:15:00,1.5,1450,91.0,False,3.9,59.5\n",
        )
        .expect("parse failed");

        assert_eq!(table.len(), 2);
        let first = &table.readings()[0];
        assert_eq!(first.vibration_level, 1.5);
        assert!(!first.optimal_conditions);
        assert!(table.readings()[1].optimal_conditions);
    }

    #[test]
    fn accepts_iso_and_rfc3339_timestamps() {
        let table = parse(
            "2024-03-01T10:30:00,2.5,1500,88.1,1,4.2,61.0\n\
             2024-03-01T08:00:00+02:00,2.5,1500,88.1,0,4.2,61.0\n\
             2024-03-01 11:00,2.5,1500,88.1,yes,4.2,61.0\n",
        )
        .expect("parse failed");

        let hours: Vec<String> = table
            .readings()
            .iter()
            .map(|r| r.timestamp.format("%H:%M").to_string())
            .collect();
        assert_eq!(hours, ["06:00", "10:30", "11:00"]);
    }

    #[test]
    fn reports_row_position_for_bad_timestamp() {
        let err = parse(
            "2024-03-01 10:30:00,2.5,1500,88.1,True,4.2,61.0\n\
             not-a-date,2.5,1500,88.1,True,4.2,61.0\n",
        )
        .expect_err("bad timestamp accepted");

        match err {
            PipelineError::Parse { row, line, message } => {
                assert_eq!(row, 2);
                assert_eq!(line, 3);
                assert!(message.contains("not-a-date"), "{message}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_non_numeric_and_negative_values() {
        let err = parse("2024-03-01 10:30:00,fast,1500,88.1,True,4.2,61.0\n")
            .expect_err("non-numeric accepted");
        assert_eq!(err.row(), Some(1));

        let err = parse("2024-03-01 10:30:00,2.5,1500,88.1,True,-4.2,61.0\n")
            .expect_err("negative energy accepted");
        assert!(err.to_string().contains("non-negative"));

        let err = parse("2024-03-01 10:30:00,2.5,1500,88.1,True,4.2,\n")
            .expect_err("missing temperature accepted");
        assert!(err.to_string().contains("temperature"));

        let table = parse("2024-03-01 10:30:00,2.5,1500,88.1,True,4.2,-12.0\n")
            .expect("negative temperature is allowed");
        assert_eq!(table.readings()[0].temperature, -12.0);
    }

    #[test]
    fn rejects_unrecognized_flag() {
        let err = parse("2024-03-01 10:30:00,2.5,1500,88.1,maybe,4.2,61.0\n")
            .expect_err("bad flag accepted");
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn missing_column_names_the_source_header() {
        let content = "Timestamp,Vibration Level (mm/s),Machine Speed (RPM),Optimal Conditions,Energy Consumption (kWh),Temperature (°C)\n";
        let err = parse_bytes(content.as_bytes(), &LoadOptions::default())
            .expect_err("schema error expected");
        match err {
            PipelineError::Schema { column } => assert_eq!(column, "Production Quality Score"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn honours_delimiter_and_extra_columns() {
        let content = "Line;timestamp;vibration_level;machine_speed;production_quality_score;optimal_conditions;energy_consumption;temperature\n\
                       A;2024-03-01 10:30:00;2.5;1500;88.1;true;4.2;61.0\n";
        let table = parse_bytes(content.as_bytes(), &LoadOptions { delimiter: b';' })
            .expect("parse failed");
        assert_eq!(table.len(), 1);
        assert_eq!(table.readings()[0].machine_speed, 1500.0);
    }

    #[test]
    fn header_only_file_is_an_empty_table() {
        let table = parse("").expect("parse failed");
        assert!(table.is_empty());
    }
}
