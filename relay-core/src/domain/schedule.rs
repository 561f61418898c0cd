//! Schedule domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::cron;

/// A recurring cron trigger bound to one pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub pipeline_id: Uuid,
    pub cron_expression: String,
    pub label: Option<String>,
    /// Input handed to executions fired by this schedule
    pub input_template: Option<JsonValue>,
    pub next_run_at: DateTime<Utc>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Schedule {
    /// Whether the schedule should fire at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.next_run_at <= now
    }

    /// Changes the expression and recomputes the next run from `now`
    pub fn set_expression(&mut self, expression: impl Into<String>, now: DateTime<Utc>) {
        self.cron_expression = expression.into();
        self.next_run_at = cron::next_run_at(&self.cron_expression, now);
    }

    /// Records a firing at `now` and moves `next_run_at` past it
    pub fn mark_fired(&mut self, now: DateTime<Utc>) {
        self.last_run_at = Some(now);
        self.next_run_at = cron::next_run_at(&self.cron_expression, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schedule(expression: &str, next_run_at: DateTime<Utc>) -> Schedule {
        Schedule {
            id: Uuid::new_v4(),
            pipeline_id: Uuid::new_v4(),
            cron_expression: expression.to_string(),
            label: None,
            input_template: None,
            next_run_at,
            last_run_at: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_mark_fired_moves_next_run_forward() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let mut s = schedule("0 9 * * *", now);
        assert!(s.is_due(now));

        s.mark_fired(now);
        assert_eq!(s.last_run_at, Some(now));
        assert_eq!(
            s.next_run_at,
            Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap()
        );
        assert!(!s.is_due(now));
    }

    #[test]
    fn test_inactive_schedule_is_never_due() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let mut s = schedule("* * * * *", now);
        s.is_active = false;
        assert!(!s.is_due(now));
    }

    #[test]
    fn test_set_expression_recomputes() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let mut s = schedule("0 9 * * *", now);
        s.set_expression("30 10 * * *", now);
        assert_eq!(
            s.next_run_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 30, 0).unwrap()
        );
    }
}
