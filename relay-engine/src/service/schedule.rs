//! Schedule service
//!
//! Cron expressions are validated here even though evaluation falls back to
//! the next top of the hour for malformed input. `next_run_at` is computed
//! on creation, whenever the expression changes and when a paused schedule
//! is resumed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use relay_core::cron;
use relay_core::domain::schedule::Schedule;
use relay_core::dto::schedule::{CreateSchedule, UpdateSchedule};
use tracing::info;
use uuid::Uuid;

use crate::error::EngineError;
use crate::store::Store;

pub struct ScheduleService {
    store: Arc<dyn Store>,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        req: CreateSchedule,
        now: DateTime<Utc>,
    ) -> Result<Schedule, EngineError> {
        validate_expression(&req.cron_expression)?;

        self.store
            .find_pipeline(req.pipeline_id)
            .await?
            .ok_or_else(|| EngineError::not_found("pipeline", req.pipeline_id))?;

        let schedule = Schedule {
            id: Uuid::new_v4(),
            pipeline_id: req.pipeline_id,
            next_run_at: cron::next_run_at(&req.cron_expression, now),
            cron_expression: req.cron_expression,
            label: req.label,
            input_template: req.input_template,
            last_run_at: None,
            is_active: req.is_active,
            created_at: now,
        };
        self.store.insert_schedule(&schedule).await?;

        info!(
            "Schedule {} created for pipeline {} ('{}', next run {})",
            schedule.id, schedule.pipeline_id, schedule.cron_expression, schedule.next_run_at
        );
        Ok(schedule)
    }

    pub async fn update(
        &self,
        id: Uuid,
        req: UpdateSchedule,
        now: DateTime<Utc>,
    ) -> Result<Schedule, EngineError> {
        let mut schedule = self.get(id).await?;

        if let Some(expr) = req.cron_expression {
            validate_expression(&expr)?;
            schedule.set_expression(expr, now);
        }
        if let Some(label) = req.label {
            schedule.label = Some(label);
        }
        if let Some(template) = req.input_template {
            schedule.input_template = Some(template);
        }
        if let Some(active) = req.is_active {
            // A resumed schedule starts from now instead of catching up
            if active && !schedule.is_active {
                schedule.next_run_at = cron::next_run_at(&schedule.cron_expression, now);
            }
            schedule.is_active = active;
        }

        self.store.save_schedule(&schedule).await?;
        Ok(schedule)
    }

    pub async fn get(&self, id: Uuid) -> Result<Schedule, EngineError> {
        self.store
            .find_schedule(id)
            .await?
            .ok_or_else(|| EngineError::not_found("schedule", id))
    }

    pub async fn list(&self) -> Result<Vec<Schedule>, EngineError> {
        Ok(self.store.list_schedules().await?)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), EngineError> {
        if !self.store.delete_schedule(id).await? {
            return Err(EngineError::not_found("schedule", id));
        }
        Ok(())
    }
}

fn validate_expression(expr: &str) -> Result<(), EngineError> {
    cron::validate(expr).map_err(|e| EngineError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, PipelineStore};
    use chrono::TimeZone;
    use relay_core::domain::pipeline::{Pipeline, Strategy};
    use serde_json::json;

    async fn fixture() -> (ScheduleService, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let pipeline = Pipeline {
            id: Uuid::new_v4(),
            name: "digest".to_string(),
            description: None,
            owner_id: "owner-1".to_string(),
            strategy: Strategy::Sequential,
            steps: Vec::new(),
            cron_expression: None,
            is_active: true,
            version: 1,
            created_at: Utc::now(),
        };
        store.insert_pipeline(&pipeline).await.unwrap();
        (ScheduleService::new(store), pipeline.id)
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, minute, 0).unwrap()
    }

    fn request(pipeline_id: Uuid, expression: &str) -> CreateSchedule {
        CreateSchedule {
            pipeline_id,
            cron_expression: expression.to_string(),
            label: Some("digest".to_string()),
            input_template: Some(json!({"topic": "news"})),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_create_computes_next_run() {
        let (service, pipeline_id) = fixture().await;

        let schedule = service
            .create(request(pipeline_id, "*/15 * * * *"), at(9, 7))
            .await
            .unwrap();

        assert_eq!(schedule.next_run_at, at(9, 15));
        assert!(schedule.last_run_at.is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_expression() {
        let (service, pipeline_id) = fixture().await;

        let result = service.create(request(pipeline_id, "61 * * * *"), at(9, 0)).await;
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_for_unknown_pipeline() {
        let (service, _) = fixture().await;

        let result = service
            .create(request(Uuid::new_v4(), "0 * * * *"), at(9, 0))
            .await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_recomputes_only_on_new_expression() {
        let (service, pipeline_id) = fixture().await;
        let schedule = service
            .create(request(pipeline_id, "*/15 * * * *"), at(9, 7))
            .await
            .unwrap();

        let paused = service
            .update(
                schedule.id,
                UpdateSchedule {
                    is_active: Some(false),
                    ..Default::default()
                },
                at(10, 0),
            )
            .await
            .unwrap();
        assert!(!paused.is_active);
        assert_eq!(paused.next_run_at, at(9, 15));
        assert_eq!(paused.label.as_deref(), Some("digest"));

        let hourly = service
            .update(
                schedule.id,
                UpdateSchedule {
                    cron_expression: Some("0 * * * *".to_string()),
                    ..Default::default()
                },
                at(10, 5),
            )
            .await
            .unwrap();
        assert_eq!(hourly.next_run_at, at(11, 0));
        assert_eq!(service.get(schedule.id).await.unwrap(), hourly);
    }

    #[tokio::test]
    async fn test_resume_skips_missed_runs() {
        let (service, pipeline_id) = fixture().await;
        let schedule = service
            .create(request(pipeline_id, "*/15 * * * *"), at(9, 7))
            .await
            .unwrap();

        let pause = UpdateSchedule {
            is_active: Some(false),
            ..Default::default()
        };
        service.update(schedule.id, pause, at(9, 10)).await.unwrap();

        let resume = UpdateSchedule {
            is_active: Some(true),
            ..Default::default()
        };
        let resumed = service.update(schedule.id, resume.clone(), at(10, 20)).await.unwrap();
        assert!(resumed.is_active);
        assert_eq!(resumed.next_run_at, at(10, 30));
        assert!(!resumed.is_due(at(10, 20)));

        // Resuming an active schedule leaves its next run alone
        let again = service.update(schedule.id, resume, at(10, 25)).await.unwrap();
        assert_eq!(again.next_run_at, at(10, 30));
    }
}
