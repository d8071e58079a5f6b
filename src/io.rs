//! Price series loading from delimited text files

use crate::data::{Observation, Series};
use crate::error::{LoadError, LpplError, SkipReason};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Layout of a price CSV file
///
/// Defaults match the historical data export of CoinMarketCap: semicolon-delimited, a header
/// row, quoted ISO-8601 timestamps with milliseconds in the first column and the price in the
/// seventh one.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CsvFormat {
    pub delimiter: u8,
    pub has_headers: bool,
    /// Zero-based
    pub time_column: usize,
    /// Zero-based
    pub price_column: usize,
    /// [chrono::format::strftime] format, a date-only format gives midnight UTC
    pub time_format: String,
}

impl CsvFormat {
    #[inline]
    pub fn default_delimiter() -> u8 {
        b';'
    }

    #[inline]
    pub fn default_time_format() -> String {
        "%Y-%m-%dT%H:%M:%S%.3fZ".to_owned()
    }
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            delimiter: Self::default_delimiter(),
            has_headers: true,
            time_column: 0,
            price_column: 6,
            time_format: Self::default_time_format(),
        }
    }
}

/// Row which couldn't be converted into an [Observation]
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedRow {
    /// One-based line number in the input
    pub line: u64,
    pub reason: SkipReason,
}

/// Observations sorted by time and the rows which were skipped
#[derive(Clone, Debug)]
pub struct LoadedSeries {
    pub observations: Vec<Observation>,
    pub skipped: Vec<SkippedRow>,
}

impl LoadedSeries {
    pub fn series(&self) -> Result<Series<'_>, LpplError> {
        Series::new(&self.observations[..])
    }
}

/// Load observations from CSV
///
/// Malformed rows are not fatal, they are collected into [LoadedSeries::skipped]. Loaded
/// observations are sorted by timestamp, exports often go newest first. Fails if the input
/// cannot be read or if no row is valid.
pub fn load_observations<R: Read>(reader: R, format: &CsvFormat) -> Result<LoadedSeries, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter)
        .has_headers(format.has_headers)
        .flexible(true)
        .from_reader(reader);

    let mut observations = vec![];
    let mut skipped = vec![];
    for record in csv_reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                skipped.push(SkippedRow {
                    line: err.position().map_or(0, |pos| pos.line()),
                    reason: SkipReason::Malformed(err.to_string()),
                });
                continue;
            }
        };
        match parse_record(&record, format) {
            Ok(obs) => observations.push(obs),
            Err(reason) => skipped.push(SkippedRow {
                line: record.position().map_or(0, |pos| pos.line()),
                reason,
            }),
        }
    }

    if observations.is_empty() {
        return Err(LoadError::NoRows {
            skipped: skipped.len(),
        });
    }
    observations.sort_by_key(|obs| obs.timestamp);
    Ok(LoadedSeries {
        observations,
        skipped,
    })
}

pub fn load_observations_from_path(
    path: impl AsRef<Path>,
    format: &CsvFormat,
) -> Result<LoadedSeries, LoadError> {
    let file = File::open(path)?;
    load_observations(file, format)
}

fn parse_record(record: &csv::StringRecord, format: &CsvFormat) -> Result<Observation, SkipReason> {
    let field = |column: usize| {
        record
            .get(column)
            .map(|s| s.trim().trim_matches('"'))
            .ok_or(SkipReason::MissingColumn(column))
    };

    let time = field(format.time_column)?;
    let timestamp = parse_timestamp(time, &format.time_format).map_err(|err| {
        SkipReason::InvalidTimestamp {
            value: time.to_owned(),
            message: err.to_string(),
        }
    })?;

    let price_field = field(format.price_column)?;
    let price: f64 = price_field
        .parse()
        .map_err(|_| SkipReason::InvalidPrice(price_field.to_owned()))?;

    let obs = Observation::new(timestamp, price);
    if !obs.is_price_valid() {
        return Err(SkipReason::NonPositivePrice(price));
    }
    Ok(obs)
}

fn parse_timestamp(s: &str, fmt: &str) -> chrono::ParseResult<chrono::DateTime<chrono::Utc>> {
    NaiveDateTime::parse_from_str(s, fmt)
        .or_else(|err| {
            NaiveDate::parse_from_str(s, fmt)
                .map(|date| date.and_time(NaiveTime::MIN))
                .map_err(|_| err)
        })
        .map(|dt| dt.and_utc())
}
