//!
//! src/validate.rs  Andrew Belles  Oct 12th, 2026
//!
//! Checks a batch before anything is written: primary key uniqueness,
//! no empty fields, and every date inside the trailing window
//!

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use tracing::{debug, info};

use crate::errors::EtlError;
use crate::types::PlayRecord;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validates against today's UTC date and the default window
#[cfg(test)]
pub fn validate(records: &[PlayRecord]) -> Result<bool, EtlError> {
    use crate::config::VALIDATION_WINDOW_DAYS;
    validate_as_of(records, chrono::Utc::now().date_naive(), VALIDATION_WINDOW_DAYS)
}

/// Ok(false) for an empty batch, Ok(true) when every check passes,
/// otherwise the error of the first failing check
pub fn validate_as_of(records: &[PlayRecord], today: NaiveDate, window_days: i64) ->
    Result<bool, EtlError> {
    if records.is_empty() {
        info!("validate.empty");
        return Ok(false);
    }

    check_unique_played_at(records)?;
    check_no_nulls(records)?;
    check_within_window(records, today, window_days)?;

    debug!(records = records.len(), "validate.ok");
    Ok(true)
}

fn check_unique_played_at(records: &[PlayRecord]) -> Result<(), EtlError> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.played_at.as_str()) {
            return Err(EtlError::DuplicateKey(record.played_at.clone()));
        }
    }
    Ok(())
}

fn check_no_nulls(records: &[PlayRecord]) -> Result<(), EtlError> {
    for (index, record) in records.iter().enumerate() {
        let fields = [
            ("song_name", &record.song_name),
            ("artist_name", &record.artist_name),
            ("played_at", &record.played_at),
            ("date", &record.date),
        ];
        if let Some(&(field, _)) = fields.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(EtlError::NullValue { index, field });
        }
    }
    Ok(())
}

fn check_within_window(records: &[PlayRecord], today: NaiveDate, window_days: i64) ->
    Result<(), EtlError> {
    let start = Duration::try_days(window_days)
        .and_then(|d| today.checked_sub_signed(d))
        .ok_or_else(|| EtlError::Config(format!("window of {window_days} days is out of range")))?;
    for record in records {
        let in_window = NaiveDate::parse_from_str(&record.date, DATE_FORMAT)
            .map(|d| start <= d && d <= today)
            .unwrap_or(false);
        if !in_window {
            return Err(EtlError::TimestampOutOfRange(record.date.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{played_at_days_ago, record};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn recent(song: &str, days_ago: i64) -> PlayRecord {
        record(song, "Artist", &played_at_days_ago(today(), days_ago))
    }

    #[test]
    fn empty_batch_is_false_not_error() {
        assert!(!validate_as_of(&[], today(), 60).unwrap());
        assert!(!validate(&[]).unwrap());
    }

    #[test]
    fn clean_batch_passes() {
        let batch = vec![recent("a", 0), recent("b", 30), recent("c", 60)];
        assert!(validate_as_of(&batch, today(), 60).unwrap());
    }

    #[test]
    fn repeated_played_at_is_duplicate_key() {
        let mut batch = vec![recent("a", 1), recent("b", 2)];
        batch.push(PlayRecord { song_name: "other".into(), ..batch[0].clone() });
        match validate_as_of(&batch, today(), 60) {
            Err(EtlError::DuplicateKey(k)) => assert_eq!(k, batch[0].played_at),
            other => panic!("expected duplicate key, got {other:?}"),
        }
    }

    #[test]
    fn empty_field_is_null_value() {
        for field in ["song_name", "artist_name"] {
            let mut bad = recent("b", 2);
            match field {
                "song_name" => bad.song_name.clear(),
                _ => bad.artist_name = "  ".into(),
            }
            let batch = vec![recent("a", 1), bad];
            match validate_as_of(&batch, today(), 60) {
                Err(EtlError::NullValue { index, field: f }) => {
                    assert_eq!(index, 1);
                    assert_eq!(f, field);
                }
                other => panic!("expected null value, got {other:?}"),
            }
        }
    }

    #[test]
    fn window_edges_are_inclusive() {
        assert!(validate_as_of(&[recent("a", 60)], today(), 60).unwrap());
        assert!(validate_as_of(&[recent("a", 0)], today(), 60).unwrap());
    }

    #[test]
    fn too_old_or_future_is_out_of_range() {
        for days_ago in [61, 100, -1] {
            let batch = vec![recent("ok", 3), recent("bad", days_ago)];
            match validate_as_of(&batch, today(), 60) {
                Err(EtlError::TimestampOutOfRange(ts)) => assert_eq!(ts, batch[1].date),
                other => panic!("expected out of range for {days_ago}, got {other:?}"),
            }
        }
    }

    #[test]
    fn unparsable_date_is_out_of_range() {
        let batch = vec![record("a", "b", "yesterday-ish")];
        assert!(matches!(
            validate_as_of(&batch, today(), 60),
            Err(EtlError::TimestampOutOfRange(_))
        ));
    }

    #[test]
    fn absurd_window_is_config_error_not_panic() {
        let batch = vec![recent("a", 1)];
        assert!(matches!(
            validate_as_of(&batch, today(), i64::MAX),
            Err(EtlError::Config(_))
        ));
    }

    #[test]
    fn duplicate_check_runs_before_null_check() {
        let mut a = recent("", 1);
        a.artist_name.clear();
        let batch = vec![a.clone(), a];
        assert!(matches!(
            validate_as_of(&batch, today(), 60),
            Err(EtlError::DuplicateKey(_))
        ));
    }
}
