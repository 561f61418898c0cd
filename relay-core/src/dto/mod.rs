//! Data Transfer Objects for API communication
//!
//! This module contains DTOs used between the orchestrator, the HTTP client
//! and the CLI. DTOs are lightweight request/response shapes built on top of
//! the domain entities.

pub mod agent;
pub mod delegation;
pub mod execution;
pub mod pipeline;
pub mod plugin;
pub mod schedule;
