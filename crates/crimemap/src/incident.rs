//! Incident records and the cleaning pipeline that produces them.
//!
//! Raw CSV rows become [`Incident`]s only when they carry a usable ZIP code,
//! a category, and a timestamp at or after the configured cutoff. Anything
//! else is dropped without an error.

use std::fmt;
use std::io::Read;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use crate::config::CleaningConfig;
use crate::error::{Error, Result};

/// Integer ZIP, optionally rendered as a float (`8101.0`) or with a `+4` suffix.
static ZIP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,5})(?:\.0*|-\d{4})?$").expect("ZIP pattern is valid")
});

/// Timestamp layouts seen in incident exports, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %I:%M:%S %p",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// A five-digit ZIP code.
///
/// Only constructed through [`ZipCode::normalize`], so every value is exactly
/// five ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ZipCode(String);

impl ZipCode {
    /// Normalize a raw ZIP value, left-padding with zeros to five digits.
    ///
    /// Accepts numeric renderings that lost leading zeros (`8101`,
    /// `8101.0`) and ZIP+4 (`98101-1234`). Returns `None` for anything that
    /// cannot be reduced to five digits.
    #[must_use]
    pub fn normalize(raw: &str) -> Option<Self> {
        let caps = ZIP_PATTERN.captures(raw.trim())?;
        let digits = caps.get(1)?.as_str();
        Some(Self(format!("{digits:0>5}")))
    }

    /// The ZIP as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZipCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A calendar month bucket, ordered chronologically and shown as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthYear {
    year: i32,
    month: u32,
}

impl MonthYear {
    /// Create a month bucket. Returns `None` if `month` is not 1 through 12.
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The calendar year.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// The calendar month, 1 through 12.
    #[must_use]
    pub fn month(&self) -> u32 {
        self.month
    }
}

impl From<NaiveDateTime> for MonthYear {
    fn from(ts: NaiveDateTime) -> Self {
        Self {
            year: ts.year(),
            month: ts.month(),
        }
    }
}

impl fmt::Display for MonthYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthYear {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidMonth(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for MonthYear {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthYear {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A cleaned crime incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Incident {
    /// Normalized five-digit ZIP code.
    pub zip: ZipCode,
    /// NIBRS category name.
    pub category: String,
    /// When the incident occurred (local wall-clock time).
    pub timestamp: NaiveDateTime,
    /// Month bucket derived from `timestamp`.
    pub month: MonthYear,
    /// Hour of day derived from `timestamp`, 0 through 23.
    pub hour: u8,
}

impl Incident {
    /// Build an incident, deriving the month bucket and hour of day.
    #[must_use]
    pub fn new(zip: ZipCode, category: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            zip,
            category: category.into(),
            timestamp,
            month: MonthYear::from(timestamp),
            // hour() is always < 24
            hour: u8::try_from(timestamp.hour()).unwrap_or_default(),
        }
    }
}

/// Parse an incident timestamp, returning `None` when no known layout fits.
///
/// UTC offsets are discarded and the local wall-clock time is kept. Bare
/// dates resolve to midnight.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Column positions of the fields cleaning needs.
#[derive(Debug, Clone, Copy)]
struct Columns {
    zip: usize,
    category: usize,
    timestamp: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord, config: &CleaningConfig) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| Error::missing_column(name))
        };
        Ok(Self {
            zip: find(&config.zip_column)?,
            category: find(&config.category_column)?,
            timestamp: find(&config.timestamp_column)?,
        })
    }
}

/// Clean a single raw row. `None` means the row is dropped.
fn clean_row(
    record: &csv::StringRecord,
    columns: Columns,
    cutoff: NaiveDateTime,
) -> Option<Incident> {
    let timestamp = parse_timestamp(record.get(columns.timestamp)?)?;
    if timestamp < cutoff {
        return None;
    }

    let category = record.get(columns.category)?.trim();
    if category.is_empty() {
        return None;
    }

    let zip = ZipCode::normalize(record.get(columns.zip)?)?;
    Some(Incident::new(zip, category, timestamp))
}

/// Read incident CSV data and return the cleaned incidents.
///
/// # Errors
///
/// Returns an error if the CSV is malformed or a required column is missing.
/// Individual rows with missing or unparseable values are dropped silently.
pub fn clean<R: Read>(reader: R, config: &CleaningConfig) -> Result<Vec<Incident>> {
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let columns = Columns::locate(csv.headers()?, config)?;
    let cutoff = config.cutoff.and_time(chrono::NaiveTime::MIN);

    let mut incidents = Vec::new();
    let mut dropped = 0usize;
    for record in csv.records() {
        match clean_row(&record?, columns, cutoff) {
            Some(incident) => incidents.push(incident),
            None => dropped += 1,
        }
    }

    debug!(
        kept = incidents.len(),
        dropped,
        cutoff = %config.cutoff,
        "Cleaned incident rows"
    );
    Ok(incidents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn clean_str(csv: &str) -> Vec<Incident> {
        clean(csv.as_bytes(), &CleaningConfig::default()).unwrap()
    }

    #[test]
    fn test_zip_five_digits_unchanged() {
        assert_eq!(ZipCode::normalize("98101").unwrap().as_str(), "98101");
    }

    #[test]
    fn test_zip_leading_zero_restored() {
        assert_eq!(ZipCode::normalize("8101").unwrap().as_str(), "08101");
        assert_eq!(ZipCode::normalize("501").unwrap().as_str(), "00501");
    }

    #[test]
    fn test_zip_float_rendering() {
        assert_eq!(ZipCode::normalize("98101.0").unwrap().as_str(), "98101");
        assert_eq!(ZipCode::normalize(" 8101.0 ").unwrap().as_str(), "08101");
    }

    #[test]
    fn test_zip_plus_four() {
        assert_eq!(ZipCode::normalize("98101-1234").unwrap().as_str(), "98101");
    }

    #[test]
    fn test_zip_rejects_garbage() {
        assert!(ZipCode::normalize("").is_none());
        assert!(ZipCode::normalize("UNKNOWN").is_none());
        assert!(ZipCode::normalize("981011").is_none());
        assert!(ZipCode::normalize("98101.5").is_none());
    }

    #[test]
    fn test_month_year_display_and_parse() {
        let month = MonthYear::new(2021, 3).unwrap();
        assert_eq!(month.to_string(), "2021-03");
        assert_eq!("2021-03".parse::<MonthYear>().unwrap(), month);
    }

    #[test]
    fn test_month_year_rejects_invalid() {
        assert!("2021-13".parse::<MonthYear>().is_err());
        assert!("2021-3".parse::<MonthYear>().is_err());
        assert!("March 2021".parse::<MonthYear>().is_err());
        assert!(MonthYear::new(2021, 0).is_none());
    }

    #[test]
    fn test_month_year_orders_chronologically() {
        let dec = MonthYear::new(2020, 12).unwrap();
        let jan = MonthYear::new(2021, 1).unwrap();
        assert!(dec < jan);
    }

    #[test]
    fn test_month_year_serde() {
        let month = MonthYear::new(2022, 7).unwrap();
        let json = serde_json::to_string(&month).unwrap();
        assert_eq!(json, "\"2022-07\"");
        let back: MonthYear = serde_json::from_str(&json).unwrap();
        assert_eq!(back, month);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = ts("2021-05-04 15:30:00");
        for raw in [
            "2021-05-04T15:30:00",
            "2021-05-04T15:30:00.000",
            "2021-05-04 15:30:00",
            "2021-05-04T15:30:00-07:00",
            "2021/05/04 03:30:00 PM",
            "05/04/2021 03:30:00 PM",
            "05/04/2021 15:30",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "format: {raw}");
        }
    }

    #[test]
    fn test_parse_timestamp_date_only_is_midnight() {
        assert_eq!(
            parse_timestamp("2020-01-01"),
            Some(ts("2020-01-01 00:00:00"))
        );
    }

    #[test]
    fn test_parse_timestamp_invalid() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2021-02-30").is_none());
    }

    #[test]
    fn test_incident_derives_month_and_hour() {
        let incident = Incident::new(
            ZipCode::normalize("98101").unwrap(),
            "ROBBERY",
            ts("2021-11-30 23:59:59"),
        );
        assert_eq!(incident.month.to_string(), "2021-11");
        assert_eq!(incident.hour, 23);
    }

    #[test]
    fn test_clean_cutoff_boundary() {
        let incidents = clean_str(
            "zip,nibrs_code_name,incident_datetime\n\
             98101,ROBBERY,2019-12-31\n\
             98101,ROBBERY,2019-12-31T23:59:59\n\
             98101,ROBBERY,2020-01-01T00:00:00\n",
        );
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].timestamp, ts("2020-01-01 00:00:00"));
    }

    #[test]
    fn test_clean_drops_incomplete_rows() {
        let incidents = clean_str(
            "zip,nibrs_code_name,incident_datetime\n\
             ,ROBBERY,2021-01-01T10:00:00\n\
             98101,,2021-01-01T10:00:00\n\
             98101,ROBBERY,\n\
             98101,ROBBERY,not a date\n\
             98101,ROBBERY,2021-01-01T10:00:00\n",
        );
        assert_eq!(incidents.len(), 1);
    }

    #[test]
    fn test_clean_invariants_hold() {
        let cutoff = ts("2020-01-01 00:00:00");
        let incidents = clean_str(
            "incident_datetime,zip,nibrs_code_name,extra\n\
             2020-03-01T08:00:00,8101,ASSAULT,x\n\
             2018-03-01T08:00:00,98101,ASSAULT,x\n\
             2022-07-15 17:45:00,98052.0,LARCENY/THEFT,x\n\
             2022-07-15 17:45:00,98052-0001,LARCENY/THEFT\n",
        );
        assert_eq!(incidents.len(), 3);
        for incident in &incidents {
            assert!(incident.timestamp >= cutoff);
            assert_eq!(incident.zip.as_str().len(), 5);
        }
        assert_eq!(incidents[0].zip.as_str(), "08101");
    }

    #[test]
    fn test_clean_custom_columns() {
        let config = CleaningConfig {
            zip_column: "ZipCode".to_string(),
            category_column: "Offense".to_string(),
            timestamp_column: "When".to_string(),
            ..CleaningConfig::default()
        };
        let incidents = clean(
            "ZipCode,Offense,When\n98004,BURGLARY,2023-02-02T02:02:02\n".as_bytes(),
            &config,
        )
        .unwrap();
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].category, "BURGLARY");
        assert_eq!(incidents[0].hour, 2);
    }

    #[test]
    fn test_clean_missing_column_is_error() {
        let result = clean(
            "zip,incident_datetime\n98101,2021-01-01\n".as_bytes(),
            &CleaningConfig::default(),
        );
        assert!(matches!(result, Err(Error::MissingColumn { column }) if column == "nibrs_code_name"));
    }

    #[test]
    fn test_clean_empty_body() {
        let incidents = clean_str("zip,nibrs_code_name,incident_datetime\n");
        assert!(incidents.is_empty());
    }
}
