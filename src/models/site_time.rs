use chrono::{DateTime as ChronoDateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use mongodb::bson::DateTime;

use crate::error::{AppError, AppResult};

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

pub fn to_bson(value: ChronoDateTime<Utc>) -> DateTime {
    DateTime::from_millis(value.timestamp_millis())
}

pub fn to_site(value: &DateTime, offset: FixedOffset) -> Option<ChronoDateTime<FixedOffset>> {
    Utc.timestamp_millis_opt(value.timestamp_millis())
        .single()
        .map(|utc| utc.with_timezone(&offset))
}

fn from_naive(value: NaiveDateTime, offset: FixedOffset) -> Option<DateTime> {
    offset
        .from_local_datetime(&value)
        .single()
        .map(|local| to_bson(local.with_timezone(&Utc)))
}

/// Parses a form date. Values carrying an offset keep it; wall-clock values
/// are read in the site's offset.
pub fn parse(value: &str, offset: FixedOffset) -> AppResult<DateTime> {
    let value = value.trim();
    if let Ok(parsed) = ChronoDateTime::parse_from_rfc3339(value) {
        return Ok(to_bson(parsed.with_timezone(&Utc)));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return from_naive(naive, offset)
                .ok_or_else(|| AppError::Validation(format!("date out of range: {value}")));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0).and_then(|m| from_naive(m, offset)) {
            return Ok(midnight);
        }
    }
    Err(AppError::Validation(format!("unparseable date: {value}")))
}

/// Instant range a search term names: a whole site-local day for a bare
/// date, a single millisecond for a full timestamp.
pub fn search_range(value: &str, offset: FixedOffset) -> Option<(DateTime, DateTime)> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let start = from_naive(date.and_hms_opt(0, 0, 0)?, offset)?;
        let end = from_naive(date.succ_opt()?.and_hms_opt(0, 0, 0)?, offset)?;
        return Some((start, end));
    }
    let instant = parse(value, offset).ok()?;
    let end = DateTime::from_millis(instant.timestamp_millis() + 1);
    Some((instant, end))
}
