//! Column decoding helpers. Ids, timestamps and enums are stored as text.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

use flock_types::models::ParseEnumError;

/// Same layout SQLite's `datetime('now')` produces, so stored values sort as text.
const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// Midnight at the start of `date`, in stored timestamp layout.
pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d 00:00:00").to_string()
}

pub fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TS_FORMAT)
        .map(|ndt| ndt.and_utc())
        .or_else(|_| raw.parse::<DateTime<Utc>>())
        .ok()
}

fn conversion_err<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

#[derive(Debug, thiserror::Error)]
#[error("invalid timestamp '{0}'")]
struct BadTimestamp(String);

pub(crate) fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_err(idx, e))
}

pub(crate) fn opt_uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|r| r.parse().map_err(|e| conversion_err(idx, e))).transpose()
}

pub(crate) fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw).ok_or_else(|| conversion_err(idx, BadTimestamp(raw)))
}

pub(crate) fn opt_ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|r| parse_ts(&r).ok_or_else(|| conversion_err(idx, BadTimestamp(r))))
        .transpose()
}

pub(crate) fn date_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| conversion_err(idx, e))
}

pub(crate) fn enum_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_err(idx, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_round_trip_at_second_precision() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(format_ts(&ts), "2026-03-14 09:26:53");
        assert_eq!(parse_ts("2026-03-14 09:26:53"), Some(ts));
        assert_eq!(parse_ts("2026-03-14T09:26:53Z"), Some(ts));
        assert_eq!(parse_ts("yesterday"), None);
    }
}
