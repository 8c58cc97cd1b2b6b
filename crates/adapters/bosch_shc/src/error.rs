//! Bosch SHC adapter error types.

use shchub_domain::error::HubError;

/// Errors raised while talking to a controller or its devices.
#[derive(Debug, thiserror::Error)]
pub enum ShcError {
    /// The controller refused the client certificate.
    #[error("authentication with the controller failed")]
    Authentication,

    /// The controller could not be reached.
    #[error("cannot connect to the controller")]
    Connection,

    /// The session library reported a failure.
    #[error("session error: {0}")]
    Session(String),

    /// Pairing a new client with the controller failed.
    #[error("client registration failed: {0}")]
    Registration(String),

    /// A blocking device call panicked or was cancelled.
    #[error("blocking device call did not complete")]
    Blocking(#[from] tokio::task::JoinError),

    /// A domain-level error (validation, not-found, etc.).
    #[error("domain error")]
    Domain(#[source] HubError),
}

impl ShcError {
    /// Short reason code shown to users when setting up the controller.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Authentication => "invalid_auth",
            Self::Connection => "cannot_connect",
            Self::Session(_) => "session_error",
            Self::Registration(_) => "pairing_failed",
            Self::Blocking(_) | Self::Domain(_) => "unknown",
        }
    }

    /// Convert into a [`HubError`] for propagation across port boundaries.
    #[must_use]
    pub fn into_domain(self) -> HubError {
        match self {
            Self::Domain(err) => err,
            other => HubError::Integration(Box::new(other)),
        }
    }
}

impl From<ShcError> for HubError {
    fn from(err: ShcError) -> Self {
        err.into_domain()
    }
}

impl From<HubError> for ShcError {
    fn from(err: HubError) -> Self {
        Self::Domain(err)
    }
}
