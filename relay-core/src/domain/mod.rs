//! Core domain types
//!
//! This module contains the core domain structures used across Relay services.
//! These types represent the fundamental business entities and are shared between
//! the orchestrator (for persistence and the HTTP API) and the engine (for execution).

pub mod agent;
pub mod delegation;
pub mod execution;
pub mod log;
pub mod pipeline;
pub mod plugin;
pub mod schedule;
