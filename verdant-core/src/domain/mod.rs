//! Core domain types
//!
//! This module contains the core domain structures used across Verdant services.
//! These types are shared between the orchestrator (which owns job state) and
//! clients (which render it).

pub mod analytics;
pub mod job;
