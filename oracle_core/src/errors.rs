//! # NDOC
//! component: `errors`
//! purpose: Error taxonomy for the engine (spec §7), modeled after the
//!   teacher's `contracts::ToolError` (kind + message + structured
//!   context) but specialized to the named categories instead of a
//!   generic `ToolErrorKind`.
//! invariants:
//!   - `ConfigError` is fatal at startup; `InputError` is surfaced per
//!     request; `DomQueryError`/`VisionError` are recovered locally by the
//!     engine and never escape `decide`/`predict`.
//!   - Every surfaced error carries the stage at which it occurred and the
//!     offending input, per §7.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for the engine and its config-loading boundary.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("config error at {stage}: {message} (input: {offending_input})")]
    Config {
        stage: &'static str,
        message: String,
        offending_input: String,
    },

    #[error("input error at {stage}: {message} (input: {offending_input})")]
    Input {
        stage: &'static str,
        message: String,
        offending_input: String,
    },
}

impl OracleError {
    pub fn config(
        stage: &'static str,
        message: impl Into<String>,
        offending_input: impl Into<String>,
    ) -> Self {
        OracleError::Config {
            stage,
            message: message.into(),
            offending_input: offending_input.into(),
        }
    }

    pub fn corrupt_container(message: impl Into<String>) -> Self {
        OracleError::config("gtm_container_parse", message, "container export")
    }

    pub fn input(
        stage: &'static str,
        message: impl Into<String>,
        offending_input: impl Into<String>,
    ) -> Self {
        OracleError::Input {
            stage,
            message: message.into(),
            offending_input: offending_input.into(),
        }
    }
}

impl From<std::io::Error> for OracleError {
    fn from(value: std::io::Error) -> Self {
        OracleError::config("io", value.to_string(), "")
    }
}

impl From<serde_json::Error> for OracleError {
    fn from(value: serde_json::Error) -> Self {
        OracleError::config("json_parse", value.to_string(), "")
    }
}

impl From<csv::Error> for OracleError {
    fn from(value: csv::Error) -> Self {
        OracleError::config("csv_parse", value.to_string(), "")
    }
}

/// Per-event degradation when a selector query raises instead of returning
/// zero matches. Not an `Err` a caller ever sees — recovered locally at
/// Stage 2/7 as "zero matches", per §7.
#[derive(Debug, Clone, Error)]
#[error("dom query error at {stage} for selector '{selector}': {message}")]
pub struct DomQueryError {
    pub stage: &'static str,
    pub selector: String,
    pub message: String,
}

/// Vision-service failure. Degraded deterministically by Stage 8's policy
/// table; never propagated past `decide`.
#[derive(Debug, Clone, Error)]
#[error("vision error: {message}")]
pub struct VisionError {
    pub message: String,
}

impl VisionError {
    pub fn new(message: impl Into<String>) -> Self {
        VisionError {
            message: message.into(),
        }
    }
}

/// Non-fatal: page-type signals conflicted, or a parameter's predicted
/// source disagreed with an observation. Attached to output, not raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyWarning {
    pub code: String,
    pub message: String,
    pub detail: Option<serde_json::Value>,
}

impl ConsistencyWarning {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        ConsistencyWarning {
            code: code.into(),
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_container_reports_stage_and_input() {
        let err = OracleError::corrupt_container("missing containerVersion");
        match err {
            OracleError::Config {
                stage,
                message,
                offending_input,
            } => {
                assert_eq!(stage, "gtm_container_parse");
                assert!(message.contains("containerVersion"));
                assert_eq!(offending_input, "container export");
            }
            _ => panic!("expected Config variant"),
        }
    }
}
