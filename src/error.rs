//! Error taxonomy for the setup wizard.
//!
//! `InvalidInput` and `NameCollision` are recovered inside the session state
//! machine and turned into re-rendered prompts. `StoreUnavailable` and
//! `ConfigurationInvariantViolation` escape to the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("character name '{0}' is already taken")]
    NameCollision(String),
    #[error("configuration invariant violated: {0}")]
    ConfigurationInvariantViolation(String),
    #[error("registry store unavailable")]
    StoreUnavailable(#[source] anyhow::Error),
}

impl SetupError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    /// Whether the error is handled by re-prompting the user.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::NameCollision(_))
    }
}

/// Extension for mapping registry store failures into [`SetupError`].
pub trait StoreResultExt<T> {
    fn store_unavailable(self) -> Result<T, SetupError>;
}

impl<T> StoreResultExt<T> for anyhow::Result<T> {
    fn store_unavailable(self) -> Result<T, SetupError> {
        self.map_err(SetupError::StoreUnavailable)
    }
}
