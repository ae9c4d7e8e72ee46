use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use csv::{ReaderBuilder, Trim};
use thiserror::Error;
use tracing::warn;

use crate::constants::{
    CSV_DATE_FORMAT, CSV_TIMESTAMP_COLUMN, DERIVED_DATETIME_COLUMN, LEADING_METADATA_COLUMNS,
    MIN_TABLE_COLUMNS, TRAILING_METADATA_COLUMNS,
};

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Table has no 'date' column")]
    MissingTimestampColumn,

    #[error("Table has too few columns ({found}) to hold ensemble members")]
    TooFewColumns { found: usize },

    #[error("Table has no valid timestamps")]
    NoValidTimestamps,
}

/// A plume CSV with its timestamp column resolved into the target zone.
///
/// `columns` is the CSV header followed by the derived `datetime` column, so
/// positional member selection sees the same layout the source files assume.
#[derive(Clone, Debug)]
pub struct NormalizedTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    timestamps: Vec<Option<DateTime<Tz>>>,
}

/// Ensemble member values, one row per time step and one column per member.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemberMatrix {
    pub names: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl MemberMatrix {
    pub fn member_count(&self) -> usize {
        self.names.len()
    }

    pub fn step_count(&self) -> usize {
        self.values.len()
    }

    pub fn member_series(&self, member: usize) -> impl Iterator<Item = Option<f64>> + '_ {
        self.values
            .iter()
            .map(move |row| row.get(member).copied().flatten())
    }

    /// Truncates or pads (with all-missing steps) to `steps` rows.
    pub fn aligned_to(&self, steps: usize) -> MemberMatrix {
        let mut values = self.values.clone();
        values.resize(steps, vec![None; self.member_count()]);
        MemberMatrix {
            names: self.names.clone(),
            values,
        }
    }
}

pub fn normalize(text: &str, tz: Tz) -> Result<NormalizedTable, TableError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    let date_idx = columns
        .iter()
        .position(|column| column == CSV_TIMESTAMP_COLUMN)
        .ok_or(TableError::MissingTimestampColumn)?;

    let timestamps = parse_timestamp_column(
        rows.iter()
            .map(|row| row.get(date_idx).map(String::as_str).unwrap_or_default()),
        tz,
    );

    if !columns.iter().any(|column| column == DERIVED_DATETIME_COLUMN) {
        columns.push(DERIVED_DATETIME_COLUMN.to_string());
    }

    Ok(NormalizedTable {
        columns,
        rows,
        timestamps,
    })
}

/// All-or-nothing: one bad cell invalidates the whole column.
fn parse_timestamp_column<'a>(
    cells: impl Iterator<Item = &'a str>,
    tz: Tz,
) -> Vec<Option<DateTime<Tz>>> {
    let cells: Vec<&str> = cells.collect();
    let parsed: Option<Vec<DateTime<Tz>>> = cells
        .iter()
        .map(|cell| parse_csv_timestamp(cell, tz))
        .collect();

    match parsed {
        Some(timestamps) => timestamps.into_iter().map(Some).collect(),
        None => {
            warn!(
                "Could not convert '{CSV_TIMESTAMP_COLUMN}' column; marking {} timestamps invalid",
                cells.len()
            );
            vec![None; cells.len()]
        }
    }
}

/// Parses `month-day-year:hour` as UTC wall-clock time.
pub fn parse_csv_timestamp(value: &str, tz: Tz) -> Option<DateTime<Tz>> {
    let (date, hour) = value.trim().rsplit_once(':')?;
    let date = NaiveDate::parse_from_str(date, CSV_DATE_FORMAT).ok()?;
    let hour = hour.trim().parse::<u32>().ok()?;
    let naive = date.and_hms_opt(hour, 0, 0)?;
    Some(Utc.from_utc_datetime(&naive).with_timezone(&tz))
}

fn coerce_numeric(cell: &str) -> Option<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| !value.is_nan())
}

impl NormalizedTable {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn timestamps(&self) -> &[Option<DateTime<Tz>>] {
        &self.timestamps
    }

    pub fn has_valid_timestamps(&self) -> bool {
        self.timestamps.iter().any(Option::is_some)
    }

    pub fn member_columns(&self) -> Result<Vec<String>, TableError> {
        let found = self.columns.len();
        if found < MIN_TABLE_COLUMNS {
            return Err(TableError::TooFewColumns { found });
        }
        Ok(self.columns[LEADING_METADATA_COLUMNS..found - TRAILING_METADATA_COLUMNS].to_vec())
    }

    pub fn members(&self) -> Result<MemberMatrix, TableError> {
        let names = self.member_columns()?;
        let range = LEADING_METADATA_COLUMNS..LEADING_METADATA_COLUMNS + names.len();
        let values = self
            .rows
            .iter()
            .map(|row| {
                range
                    .clone()
                    .map(|idx| row.get(idx).and_then(|cell| coerce_numeric(cell)))
                    .collect()
            })
            .collect();
        Ok(MemberMatrix { names, values })
    }
}
