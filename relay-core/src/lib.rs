//! Relay Core
//!
//! Core types and abstractions for the Relay agent pipeline engine.
//!
//! This crate contains:
//! - Domain types: Core business entities (Pipeline, Execution, Agent, etc.)
//! - DTOs: Data transfer objects for API communication
//! - Cron: Pure schedule evaluation shared by the dispatcher and the API

pub mod cron;
pub mod domain;
pub mod dto;
