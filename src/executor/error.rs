use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{InvalidNumber, ObjectKind};
use crate::probe::ProbeError;

/// Why a single step did not do what it asked for.
///
/// Everything except [`StepError::SafetyAbort`] is local to the step: the
/// runner logs it, records it in the trace and moves on.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepError {
    #[error("unresolved object {}", .object.as_deref().unwrap_or("<none>"))]
    UnresolvedObject { object: Option<String> },

    #[error("object '{object}' is a {found} object, expected {expected}")]
    TypeMismatch {
        object: String,
        expected: ObjectKind,
        found: ObjectKind,
    },

    #[error("image asset not found: {}", .path.display())]
    AssetMissing { path: PathBuf },

    #[error("jump target {target} is outside 1..={steps}")]
    InvalidJumpTarget { target: String, steps: usize },

    #[error("invalid parameter: {message}")]
    InvalidParameter { message: String },

    #[error("image object '{object}' not found on screen")]
    NotFoundOnScreen { object: String },

    #[error("probe failure: {message}")]
    ProbeFailure { message: String },

    #[error("safety abort")]
    SafetyAbort,
}

impl StepError {
    pub fn invalid(message: impl Into<String>) -> Self {
        StepError::InvalidParameter {
            message: message.into(),
        }
    }

    /// Failures that came from the backend rather than from the program itself.
    pub fn is_probe_failure(&self) -> bool {
        matches!(self, StepError::ProbeFailure { .. })
    }
}

impl From<InvalidNumber> for StepError {
    fn from(err: InvalidNumber) -> Self {
        StepError::invalid(err.to_string())
    }
}

impl From<ProbeError> for StepError {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::SafetyAbort => StepError::SafetyAbort,
            ProbeError::AssetMissing(path) => StepError::AssetMissing { path },
            ProbeError::UnknownKey(key) => StepError::invalid(format!("unknown key '{key}'")),
            other @ (ProbeError::ImageDecode { .. } | ProbeError::Backend { .. }) => {
                StepError::ProbeFailure {
                    message: other.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_errors_map_to_step_errors() {
        assert_eq!(StepError::from(ProbeError::SafetyAbort), StepError::SafetyAbort);
        assert!(matches!(
            StepError::from(ProbeError::UnknownKey("zz".into())),
            StepError::InvalidParameter { message } if message.contains("zz")
        ));
        let failure = StepError::from(ProbeError::backend("click", "no display"));
        assert!(failure.is_probe_failure());
        assert_eq!(failure.to_string(), "probe failure: click failed: no display");
    }

    #[test]
    fn unreadable_numbers_are_invalid_parameters() {
        let err = StepError::from(InvalidNumber {
            field: "timeout_s",
            raw: "\"abc\"".into(),
        });
        assert_eq!(
            err,
            StepError::invalid("timeout_s is not a valid number: \"abc\"")
        );
    }

    #[test]
    fn serializes_with_kind_tag() {
        let err = StepError::UnresolvedObject {
            object: Some("Missing".into()),
        };
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], "unresolved_object");
        assert_eq!(value["object"], "Missing");
        assert_eq!(err.to_string(), "unresolved object Missing");
    }
}
