//! Error types for the session gate core.

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),
}

/// Identity-provider errors.
///
/// Sign-in and sign-out delegate to the remote provider; these are never
/// fatal and never bubble past the coordinator.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider {provider} rejected the request: {reason}")]
    Rejected { provider: String, reason: String },

    #[error("Transport failure: {0}")]
    Transport(String),
}

/// Account Directory errors.
///
/// `NotFound` covers the case where a row was required and absent; an
/// ordinary "no record yet" lookup returns `Ok(None)` instead.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("{entity} not found for {key}")]
    NotFound { entity: String, key: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Registration workflow errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("No authenticated identity")]
    NoIdentity,

    #[error("No account role selected")]
    NoRole,

    #[error("{0}")]
    Directory(#[from] DirectoryError),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
