//! Cron expression evaluation
//!
//! Expressions have exactly five whitespace-separated fields: minute, hour,
//! day-of-month, month and day-of-week (0 = Sunday, 7 is also Sunday).
//! Each field is `*`, a number, a `start-end` range, a `*/step`, or a comma
//! list of those. Everything is evaluated in UTC.
//!
//! [`next_run_at`] is a simplified resolver. It picks the earliest matching
//! time of day, then resolves the day with this priority: a restricted
//! day-of-week, else a restricted day-of-month, else today-or-tomorrow. When
//! both day fields are restricted only day-of-week is honoured. This is a
//! known limitation of the scheduling contract and differs from POSIX cron,
//! which would accept either day.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, TimeZone, Timelike, Utc};
use thiserror::Error;

const FIELD_COUNT: usize = 5;

/// How far ahead `next_run_at` searches before giving up (covers Feb 29)
const MAX_LOOKAHEAD_DAYS: i64 = 366 * 4;

const FIELDS: [(&str, u32, u32); FIELD_COUNT] = [
    ("minute", 0, 59),
    ("hour", 0, 23),
    ("day-of-month", 1, 31),
    ("month", 1, 12),
    ("day-of-week", 0, 7),
];

/// Malformed cron expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronError {
    #[error("expected 5 fields, found {0}")]
    FieldCount(usize),
    #[error("invalid {field} field '{value}'")]
    InvalidField { field: &'static str, value: String },
}

/// Returns true if `value` satisfies a single cron field
///
/// `*/N` matches when `value mod N == 0`; a zero step never matches.
pub fn match_field(field: &str, value: u32) -> bool {
    field.split(',').any(|part| match_part(part.trim(), value))
}

/// True iff all five fields match the components of `at`
///
/// Malformed expressions never match.
pub fn matches(expression: &str, at: DateTime<Utc>) -> bool {
    let Ok([minute, hour, day_of_month, month, day_of_week]) = parse_fields(expression) else {
        return false;
    };

    match_field(minute, at.minute())
        && match_field(hour, at.hour())
        && match_field(day_of_month, at.day())
        && match_field(month, at.month())
        && match_weekday(day_of_week, at.weekday().num_days_from_sunday())
}

/// [`matches`] against the current instant
pub fn matches_now(expression: &str) -> bool {
    matches(expression, Utc::now())
}

/// Next run strictly after `from`
///
/// Malformed expressions, and expressions that cannot be satisfied within the
/// lookahead window, fall back to the next top of the hour.
pub fn next_run_at(expression: &str, from: DateTime<Utc>) -> DateTime<Utc> {
    parse_fields(expression)
        .ok()
        .and_then(|fields| resolve_next(&fields, from))
        .unwrap_or_else(|| next_top_of_hour(from))
}

/// Checks an expression without evaluating it
pub fn validate(expression: &str) -> Result<(), CronError> {
    parse_fields(expression).map(|_| ())
}

fn parse_fields(expression: &str) -> Result<[&str; FIELD_COUNT], CronError> {
    let parts: Vec<&str> = expression.split_whitespace().collect();
    let fields: [&str; FIELD_COUNT] = parts
        .as_slice()
        .try_into()
        .map_err(|_| CronError::FieldCount(parts.len()))?;

    for (value, (name, min, max)) in fields.iter().zip(FIELDS) {
        if !value.split(',').all(|part| is_valid_part(part, min, max)) {
            return Err(CronError::InvalidField {
                field: name,
                value: value.to_string(),
            });
        }
    }

    Ok(fields)
}

fn is_valid_part(part: &str, min: u32, max: u32) -> bool {
    let in_range = |n: u32| (min..=max).contains(&n);

    if part == "*" {
        return true;
    }
    if let Some(step) = part.strip_prefix("*/") {
        return matches!(step.parse::<u32>(), Ok(step) if step > 0);
    }
    if let Some((start, end)) = part.split_once('-') {
        return match (start.parse::<u32>(), end.parse::<u32>()) {
            (Ok(start), Ok(end)) => in_range(start) && in_range(end) && start <= end,
            _ => false,
        };
    }
    matches!(part.parse::<u32>(), Ok(n) if in_range(n))
}

fn match_part(part: &str, value: u32) -> bool {
    if part == "*" {
        return true;
    }
    if let Some(step) = part.strip_prefix("*/") {
        return matches!(step.parse::<u32>(), Ok(step) if step > 0 && value % step == 0);
    }
    if let Some((start, end)) = part.split_once('-') {
        return match (start.parse::<u32>(), end.parse::<u32>()) {
            (Ok(start), Ok(end)) => (start..=end).contains(&value),
            _ => false,
        };
    }
    part.parse::<u32>().is_ok_and(|n| n == value)
}

fn match_weekday(field: &str, weekday: u32) -> bool {
    match_field(field, weekday) || (weekday == 0 && match_field(field, 7))
}

fn resolve_next(fields: &[&str; FIELD_COUNT], from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let [minute, hour, day_of_month, month, day_of_week] = *fields;
    let today = from.date_naive();

    (0..=MAX_LOOKAHEAD_DAYS).find_map(|offset| {
        let date = today + TimeDelta::days(offset);
        if !day_matches(day_of_month, month, day_of_week, date) {
            return None;
        }
        first_slot(minute, hour, date, from)
    })
}

fn day_matches(day_of_month: &str, month: &str, day_of_week: &str, date: NaiveDate) -> bool {
    if !match_field(month, date.month()) {
        return false;
    }
    // Day-of-week wins over day-of-month; see module docs.
    if day_of_week != "*" {
        return match_weekday(day_of_week, date.weekday().num_days_from_sunday());
    }
    if day_of_month != "*" {
        return match_field(day_of_month, date.day());
    }
    true
}

/// Earliest matching time on `date` that is strictly after `after`
fn first_slot(
    minute: &str,
    hour: &str,
    date: NaiveDate,
    after: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    (0..24u32)
        .filter(|h| match_field(hour, *h))
        .find_map(|h| {
            (0..60u32)
                .filter(|m| match_field(minute, *m))
                .find_map(|m| {
                    let time = NaiveTime::from_hms_opt(h, m, 0)?;
                    let candidate = Utc.from_utc_datetime(&date.and_time(time));
                    (candidate > after).then_some(candidate)
                })
        })
}

fn next_top_of_hour(from: DateTime<Utc>) -> DateTime<Utc> {
    let hour_start = from
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(from);
    hour_start + TimeDelta::hours(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_step_field_matches_multiples() {
        for v in 0..200 {
            assert_eq!(match_field("*/3", v), v % 3 == 0, "value {}", v);
        }
        assert!(!match_field("*/0", 0));
    }

    #[test]
    fn test_field_forms() {
        assert!(match_field("*", 42));
        assert!(match_field("5", 5));
        assert!(!match_field("5", 6));
        assert!(match_field("1,15,30", 15));
        assert!(!match_field("1,15,30", 16));
        assert!(match_field("9-17", 9));
        assert!(match_field("9-17", 17));
        assert!(!match_field("9-17", 18));
        assert!(match_field("1-5,*/10", 20));
        assert!(!match_field("abc", 1));
    }

    #[test]
    fn test_monday_morning_expression() {
        // 2024-01-01 is a Monday
        assert!(matches("0 9 * * 1", at(2024, 1, 1, 9, 0)));
        assert!(!matches("0 9 * * 1", at(2024, 1, 2, 9, 0)));
        assert!(!matches("0 9 * * 1", at(2024, 1, 1, 9, 1)));
    }

    #[test]
    fn test_sunday_as_seven() {
        // 2024-01-07 is a Sunday
        assert!(matches("0 0 * * 7", at(2024, 1, 7, 0, 0)));
        assert!(matches("0 0 * * 0", at(2024, 1, 7, 0, 0)));
    }

    #[test]
    fn test_malformed_never_matches() {
        assert!(!matches("0 9 * *", at(2024, 1, 1, 9, 0)));
        assert!(!matches("61 * * * *", at(2024, 1, 1, 9, 0)));
        assert!(!matches("", at(2024, 1, 1, 9, 0)));
    }

    #[test]
    fn test_next_run_same_day_and_rollover() {
        assert_eq!(
            next_run_at("30 14 * * *", at(2024, 3, 10, 10, 0)),
            at(2024, 3, 10, 14, 30)
        );
        assert_eq!(
            next_run_at("30 14 * * *", at(2024, 3, 10, 15, 0)),
            at(2024, 3, 11, 14, 30)
        );
        // Exactly at the slot: strictly after
        assert_eq!(
            next_run_at("30 14 * * *", at(2024, 3, 10, 14, 30)),
            at(2024, 3, 11, 14, 30)
        );
    }

    #[test]
    fn test_next_run_weekday_wraps() {
        // Monday 10:00 -> next Monday 09:00
        assert_eq!(
            next_run_at("0 9 * * 1", at(2024, 1, 1, 10, 0)),
            at(2024, 1, 8, 9, 0)
        );
        // Monday 08:00 -> same day
        assert_eq!(
            next_run_at("0 9 * * 1", at(2024, 1, 1, 8, 0)),
            at(2024, 1, 1, 9, 0)
        );
    }

    #[test]
    fn test_next_run_day_of_month_wraps_to_next_month() {
        assert_eq!(
            next_run_at("0 0 15 * *", at(2024, 1, 20, 0, 0)),
            at(2024, 2, 15, 0, 0)
        );
    }

    #[test]
    fn test_day_of_week_takes_priority() {
        // Friday 13th requested; resolves to the first Friday instead
        assert_eq!(
            next_run_at("0 9 13 * 5", at(2024, 1, 1, 0, 0)),
            at(2024, 1, 5, 9, 0)
        );
    }

    #[test]
    fn test_next_run_sub_hourly() {
        assert_eq!(
            next_run_at("*/15 * * * *", at(2024, 1, 1, 10, 7)),
            at(2024, 1, 1, 10, 15)
        );
        assert_eq!(
            next_run_at("*/15 * * * *", at(2024, 1, 1, 23, 50)),
            at(2024, 1, 2, 0, 0)
        );
    }

    #[test]
    fn test_malformed_falls_back_to_top_of_hour() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 10, 17, 42).unwrap();
        assert_eq!(next_run_at("not a cron", from), at(2024, 1, 1, 11, 0));
        // Unsatisfiable day
        assert_eq!(next_run_at("0 0 31 2 *", from), at(2024, 1, 1, 11, 0));
    }

    #[test]
    fn test_next_run_always_after_from() {
        let expressions = [
            "* * * * *",
            "0 * * * *",
            "59 23 * * *",
            "0 0 1 1 *",
            "0 0 29 2 *",
            "*/7 3-5 * * 1-5",
            "15,45 */2 * 6 *",
            "0 12 * * 0",
        ];
        let mut from = at(2023, 12, 31, 23, 59);
        for step in 0..50 {
            for expr in expressions {
                let next = next_run_at(expr, from);
                assert!(next > from, "{} from {} gave {}", expr, from, next);
            }
            from += TimeDelta::minutes(97 * step + 13);
        }
    }

    #[test]
    fn test_validate() {
        assert!(validate("0 9 * * 1-5").is_ok());
        assert_eq!(validate("0 9 * *"), Err(CronError::FieldCount(4)));
        assert!(matches!(
            validate("0 25 * * *"),
            Err(CronError::InvalidField { field: "hour", .. })
        ));
        assert!(validate("*/0 * * * *").is_err());
        assert!(validate("5-1 * * * *").is_err());
    }
}
