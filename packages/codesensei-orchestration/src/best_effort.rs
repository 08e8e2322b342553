//! Explicit swallow-and-continue for non-critical side calls
//!
//! Progress sinks and similar observers must never affect a run. Instead of
//! an implicit `let _ = ...`, callers route those results through
//! [`best_effort`], which logs the discarded error and returns a value that
//! says so.

use std::fmt::Display;
use tracing::debug;

/// Outcome of a best-effort call (the value itself is always dropped)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BestEffort {
    Done,
    Swallowed,
}

impl BestEffort {
    pub fn is_swallowed(&self) -> bool {
        matches!(self, BestEffort::Swallowed)
    }
}

pub fn best_effort<T, E: Display>(label: &str, result: Result<T, E>) -> BestEffort {
    match result {
        Ok(_) => BestEffort::Done,
        Err(e) => {
            debug!("best-effort call '{}' failed, discarded: {}", label, e);
            BestEffort::Swallowed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_is_done() {
        let outcome = best_effort::<_, String>("noop", Ok(42));
        assert_eq!(outcome, BestEffort::Done);
        assert!(!outcome.is_swallowed());
    }

    #[test]
    fn test_err_is_swallowed() {
        let outcome = best_effort::<(), _>("telemetry", Err("sink closed"));
        assert!(outcome.is_swallowed());
    }
}
