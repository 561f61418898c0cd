//! Schedule and dispatcher endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use relay_core::domain::schedule::Schedule;
use relay_core::dto::schedule::{CreateSchedule, DispatchReport, UpdateSchedule};
use uuid::Uuid;

impl OrchestratorClient {
    pub async fn create_schedule(&self, req: &CreateSchedule) -> Result<Schedule> {
        self.post("/schedules", req).await
    }

    pub async fn list_schedules(&self) -> Result<Vec<Schedule>> {
        self.get("/schedules").await
    }

    pub async fn update_schedule(&self, schedule_id: Uuid, req: &UpdateSchedule) -> Result<Schedule> {
        self.put(&format!("/schedules/{}", schedule_id), req).await
    }

    pub async fn delete_schedule(&self, schedule_id: Uuid) -> Result<()> {
        self.delete(&format!("/schedules/{}", schedule_id)).await
    }

    /// Run one dispatcher tick on the orchestrator
    pub async fn dispatch(&self) -> Result<DispatchReport> {
        self.post("/scheduler/dispatch", &()).await
    }
}
