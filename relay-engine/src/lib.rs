//! Relay execution engine
//!
//! Drives agent pipelines from trigger to terminal state. The engine owns:
//! - Storage traits and an in-memory store
//! - The agent-runner collaborator (HTTP and echo implementations)
//! - The execution state machine and the delegation protocol
//! - The execution queue and the scheduler dispatcher
//! - The progress notifier
//!
//! All services are trait-based at their seams to enable testing and
//! dependency injection.

pub mod agent;
pub mod config;
pub mod error;
pub mod progress;
pub mod scheduler;
pub mod service;
pub mod store;

pub use config::EngineConfig;
pub use error::EngineError;
