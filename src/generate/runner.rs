//! Stage runner: one generation call with bounded retry.

use tracing::{debug, warn};

use super::generator::{GenerationRequest, TextGenerator};

/// What one stage run produced.
///
/// On failure `text` is a display-safe message and `error` the detailed
/// reason. Callers check `success` before treating `text` as output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub success: bool,
    pub text: String,
    pub error: Option<String>,
}

impl StageResult {
    fn succeeded(text: String) -> Self {
        Self {
            success: true,
            text,
            error: None,
        }
    }

    fn failed(label: &str, attempts: u32, reason: &str) -> Self {
        Self {
            success: false,
            text: format!("Error in {label}: {reason}"),
            error: Some(format!("{label} failed after {attempts} attempt(s): {reason}")),
        }
    }
}

/// Call `generator` with `request`, retrying on failure up to `max_attempts` calls in total.
///
/// Retries run back to back with no delay. A `max_attempts` of zero still
/// makes one call. Never returns an error: failure is reported in the result.
pub fn run_stage(
    generator: &dyn TextGenerator,
    request: &GenerationRequest,
    label: &str,
    max_attempts: u32,
) -> StageResult {
    let max_attempts = max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        debug!(stage = label, attempt, "running stage");
        match generator.generate(request) {
            Ok(text) => return StageResult::succeeded(text),
            Err(e) => {
                last_error = e.to_string();
                if attempt < max_attempts {
                    warn!(stage = label, attempt, error = %last_error, "stage attempt failed, retrying");
                }
            }
        }
    }

    warn!(stage = label, attempts = max_attempts, error = %last_error, "stage failed");
    StageResult::failed(label, max_attempts, &last_error)
}
