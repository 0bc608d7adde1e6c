//! Common error types used across the guided-tour crates
//!
//! Every failure mode has a defined degraded continuation (see the state
//! machine and resolver): these variants exist so the degradation is logged
//! with enough structure to diagnose, and so errors can cross the JS
//! boundary as data when a caller wants them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base error type for all tour operations
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum TourError {
    // Caller input errors
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    // Target resolution errors
    #[error("Tour target element not found: {selector}")]
    TargetNotFound { selector: String },

    #[error("Tour target element has zero size (hidden?): {selector}")]
    TargetHidden { selector: String },

    // Step action errors
    #[error("Step action failed for step '{step_id}': {message}")]
    CallbackFailure { step_id: String, message: String },

    // Persistence errors
    #[error("Completion store operation failed: {message}")]
    Persistence { message: String },

    // Celebration asset errors
    #[error("Celebration asset failed to load: {message}")]
    AssetLoad { message: String },
}

/// Result type alias for tour operations
pub type TourResult<T> = Result<T, TourError>;

impl TourError {
    /// Shorthand for an [`TourError::InvalidInput`] with a plain message
    pub fn invalid_input(message: impl Into<String>) -> Self {
        TourError::InvalidInput {
            message: message.into(),
        }
    }

    /// Shorthand for a [`TourError::Persistence`] with a plain message
    pub fn persistence(message: impl Into<String>) -> Self {
        TourError::Persistence {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TourError::TargetNotFound {
            selector: ".missing".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Tour target element not found: .missing"
        );
    }

    #[test]
    fn test_error_serialization() {
        let err = TourError::CallbackFailure {
            step_id: "welcome".to_string(),
            message: "boom".to_string(),
        };

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("CallbackFailure"));
        assert!(json.contains("welcome"));

        let back: TourError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
