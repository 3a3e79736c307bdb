//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services orchestrate between repositories and contain domain logic.

pub mod analysis;
pub mod generation;
pub mod janitor;
pub mod resolver;
pub mod sleeper;

#[cfg(test)]
pub(crate) mod testing;

// Re-export for convenience
pub use analysis as analysis_service;
pub use generation as generation_service;
