//! Repository Module
//!
//! Data access layer for the orchestrator.
//! Each repository owns the state for a specific domain entity.

pub mod artifact;
pub mod job;

// Re-export for convenience
pub use artifact as artifact_repository;
pub use job as job_repository;
