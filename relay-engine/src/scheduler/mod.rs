//! Scheduling layer
//!
//! Decides when pipelines run and hands runs to the execution queue. The
//! dispatcher never waits for a run to finish.

pub mod dispatcher;
pub mod queue;

pub use dispatcher::SchedulerDispatcher;
pub use queue::{ExecutionQueue, RunFailure, RunFailureKind};
