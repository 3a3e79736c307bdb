//! Data Transfer Objects for the HTTP API
//!
//! This module contains DTOs exchanged between the orchestrator's HTTP layer
//! and its clients. DTOs are flattened, serializable views of domain entities.

pub mod analysis;
pub mod job;
