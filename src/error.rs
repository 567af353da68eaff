//! Error and warning types for the synchronization engine.

use thiserror::Error;

use crate::gateway::GatewayError;
use crate::model::FeatureId;

/// Errors surfaced by engine operations.
///
/// None of these are fatal; each is isolated to the operation that produced it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// A gateway call failed in transit or with a server error
    #[error("Network error: {0}")]
    Network(String),

    /// Input rejected before any gateway call
    #[error("Invalid input: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// The backend no longer has the referenced feature
    #[error("Feature not found on server: {id}")]
    NotFound {
        /// The stale id
        id: FeatureId,
    },

    /// A response arrived after the active folder changed and was discarded
    #[error("Discarded response for folder '{folder}' after folder switch")]
    StaleFolder {
        /// Folder the request was issued for
        folder: String,
    },

    /// No folder has been opened yet
    #[error("No folder is active")]
    NoActiveFolder,

    /// The canvas has no base image, so there is no coordinate space
    #[error("No base image is loaded")]
    NoImage,

    /// The id is not present in the local store
    #[error("Unknown feature: {id}")]
    UnknownFeature {
        /// The id that was looked up
        id: FeatureId,
    },
}

impl SyncError {
    /// Create a validation error with a message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Feature-scoped call sites match `GatewayError::NotFound` themselves, so a
/// 404 reaching this conversion is reported as a network failure.
impl From<GatewayError> for SyncError {
    fn from(e: GatewayError) -> Self {
        SyncError::Network(e.to_string())
    }
}

/// Category of a user-visible warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A gateway call failed
    Network,
    /// A stale entry was dropped from all views
    StaleEntry,
}

/// Non-blocking warning queued for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
