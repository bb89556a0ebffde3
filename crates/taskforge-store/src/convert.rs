//! Column conversion helpers shared by the entity modules.
//!
//! SQLite stores dates and timestamps as TEXT; these helpers parse them back
//! while reporting failures through `rusqlite`'s conversion error so the
//! offending column index survives into the error message.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;

pub(crate) fn timestamp(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn opt_timestamp(
    idx: usize,
    s: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    s.map(|v| timestamp(idx, &v)).transpose()
}

pub(crate) fn date(idx: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn opt_date(idx: usize, s: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    s.map(|v| date(idx, &v)).transpose()
}
