//! Progress ledger rules: one row per (user, task), last write wins.

use chrono::{DateTime, NaiveDate, Utc};

use super::error::{OnboardingError, OnboardingResult};
use super::types::{ProgressEntry, TaskId, UserId};

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Accepts RFC 3339, `YYYY-MM-DD` or the US locale `M/D/YYYY`; dates map to midnight UTC.
pub fn parse_completed_at(raw: &str) -> OnboardingResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| OnboardingError::validation(format!("invalid completed_at '{raw}'")))
}

/// `completed_at` is set iff `completed`; a supplied stamp on an uncomplete is discarded.
pub fn resolve_completed_at(
    completed: bool,
    supplied: Option<&str>,
    now: DateTime<Utc>,
) -> OnboardingResult<Option<DateTime<Utc>>> {
    if !completed {
        return Ok(None);
    }
    match supplied.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_completed_at(raw).map(Some),
        None => Ok(Some(now)),
    }
}

pub fn entry(
    user_id: UserId,
    task_id: TaskId,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
) -> ProgressEntry {
    ProgressEntry {
        user_id,
        task_id,
        completed,
        completed_at: if completed { completed_at } else { None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_uncomplete_discards_timestamp() {
        let stamp = resolve_completed_at(false, Some("2026-01-01T00:00:00Z"), now()).unwrap();
        assert_eq!(stamp, None);
    }

    #[test]
    fn test_complete_defaults_to_now() {
        assert_eq!(resolve_completed_at(true, None, now()).unwrap(), Some(now()));
        assert_eq!(resolve_completed_at(true, Some("  "), now()).unwrap(), Some(now()));
    }

    #[test]
    fn test_caller_supplied_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 7, 4, 0, 0, 0).unwrap();
        assert_eq!(parse_completed_at("7/4/2026").unwrap(), expected);
        assert_eq!(parse_completed_at("07/04/2026").unwrap(), expected);
        assert_eq!(parse_completed_at("2026-07-04").unwrap(), expected);
        assert_eq!(
            parse_completed_at("2026-07-04T02:00:00+02:00").unwrap(),
            expected
        );
    }

    #[test]
    fn test_rejects_garbage_timestamp() {
        let err = resolve_completed_at(true, Some("yesterday"), now()).unwrap_err();
        assert!(matches!(err, OnboardingError::Validation(_)));
    }

    #[test]
    fn test_entry_enforces_invariant() {
        let e = entry(1, 2, false, Some(now()));
        assert!(!e.completed);
        assert_eq!(e.completed_at, None);
    }
}
