//! Model Fallback Resolver
//!
//! Tries an ordered list of candidate models, one attempt each, and stops at
//! the first one that succeeds. Every attempt is recorded so callers can
//! report exactly what was tried.

use std::fmt;
use std::future::Future;
use tracing::{info, warn};
use verdant_core::backend::{BackendError, GenerationBackend, GenerationRequest, Operation};

/// Result of trying a single candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Started,
    Failed(BackendError),
}

/// One candidate model and what happened when it was tried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub model: String,
    pub outcome: AttemptOutcome,
}

/// First candidate that succeeded
#[derive(Debug)]
pub struct Resolved<T> {
    pub model: String,
    pub value: T,
    pub attempts: Vec<Attempt>,
}

/// Every candidate failed, or there were none
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exhausted {
    pub attempts: Vec<Attempt>,
}

impl Exhausted {
    /// Error of the final attempt
    pub fn last_error(&self) -> Option<&BackendError> {
        self.attempts.iter().rev().find_map(|attempt| match &attempt.outcome {
            AttemptOutcome::Failed(err) => Some(err),
            AttemptOutcome::Started => None,
        })
    }
}

impl fmt::Display for Exhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last_error() {
            Some(err) => write!(
                f,
                "all {} candidate models failed; last error: {}",
                self.attempts.len(),
                err
            ),
            None => write!(f, "no candidate models configured"),
        }
    }
}

impl std::error::Error for Exhausted {}

/// Run `attempt` over `candidates` in order until one succeeds
pub async fn first_success<T, F, Fut>(
    candidates: &[String],
    mut attempt: F,
) -> Result<Resolved<T>, Exhausted>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    let mut attempts = Vec::with_capacity(candidates.len());

    for model in candidates {
        match attempt(model.clone()).await {
            Ok(value) => {
                info!("Model {} accepted the request", model);
                attempts.push(Attempt {
                    model: model.clone(),
                    outcome: AttemptOutcome::Started,
                });
                return Ok(Resolved {
                    model: model.clone(),
                    value,
                    attempts,
                });
            }
            Err(err) => {
                warn!("Model {} failed: {}", model, err);
                attempts.push(Attempt {
                    model: model.clone(),
                    outcome: AttemptOutcome::Failed(err),
                });
            }
        }
    }

    Err(Exhausted { attempts })
}

/// Start a video generation with the first candidate model that accepts it
pub async fn start_generation(
    backend: &dyn GenerationBackend,
    candidates: &[String],
    request: &GenerationRequest,
) -> Result<Resolved<Operation>, Exhausted> {
    first_success(candidates, |model| async move {
        backend.start_generation(&model, request).await
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::ScriptedBackend;
    use verdant_core::backend::OutputParams;

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt: "grow".to_string(),
            image: vec![1],
            mime_type: "image/png".to_string(),
            params: OutputParams::default(),
        }
    }

    #[tokio::test]
    async fn test_falls_back_until_a_candidate_starts() {
        let backend = ScriptedBackend::new()
            .fail_start("A", BackendError::Transport("quota".to_string()))
            .fail_start("B", BackendError::Transport("not found".to_string()));

        let resolved = start_generation(&backend, &models(&["A", "B", "C"]), &request())
            .await
            .unwrap();

        assert_eq!(resolved.model, "C");
        assert_eq!(resolved.value.name, "operations/C");
        assert_eq!(backend.started_models(), vec!["A", "B", "C"]);
        assert_eq!(resolved.attempts.len(), 3);
        assert_eq!(resolved.attempts[2].outcome, AttemptOutcome::Started);
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let backend = ScriptedBackend::new();

        let resolved = start_generation(&backend, &models(&["A", "B"]), &request())
            .await
            .unwrap();

        assert_eq!(resolved.model, "A");
        assert_eq!(backend.started_models(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_exhaustion_keeps_last_error() {
        let backend = ScriptedBackend::new()
            .fail_start("A", BackendError::Transport("first".to_string()))
            .fail_start("B", BackendError::Malformed("second".to_string()));

        let exhausted = start_generation(&backend, &models(&["A", "B"]), &request())
            .await
            .unwrap_err();

        assert_eq!(exhausted.attempts.len(), 2);
        assert_eq!(
            exhausted.last_error(),
            Some(&BackendError::Malformed("second".to_string()))
        );
        assert!(exhausted.to_string().contains("second"));
    }

    #[tokio::test]
    async fn test_empty_candidate_list_is_exhausted() {
        let exhausted = first_success::<(), _, _>(&[], |_| async { Ok(()) })
            .await
            .unwrap_err();

        assert!(exhausted.attempts.is_empty());
        assert!(exhausted.last_error().is_none());
        assert_eq!(exhausted.to_string(), "no candidate models configured");
    }
}
