//! Error types for engine operations.

use thiserror::Error;

use crate::types::BodyId;

/// Errors surfaced by the physics core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    /// Invalid shape, material or world parameter. The World is left unchanged.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The referenced body is neither live nor queued for insertion.
    #[error("body not found: {0}")]
    NotFound(BodyId),

    /// `step` was invoked while a step was already executing.
    #[error("reentrant call while a step is in progress")]
    Reentrancy,

    /// A body's kinematic state became non-finite; the body has been frozen.
    #[error("degenerate state in {id}: body frozen until reset")]
    DegenerateState {
        /// The frozen body.
        id: BodyId,
    },
}

impl PhysicsError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// True for errors that indicate misuse of the API rather than bad input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Reentrancy)
    }
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, PhysicsError>;

/// Rejects NaN and infinities with a configuration error naming the parameter.
pub(crate) fn ensure_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PhysicsError::config(format!("{name} must be finite, got {value}")))
    }
}
