//! Error types for reveille-core.
//!
//! Two layers, matching the two ways an alarm operation can go wrong:
//!
//! - [`StoreError`]: the document store could not carry out a committed
//!   transaction (unreachable, conflict retries exhausted, bad request).
//! - [`Failure`]: what a user-initiated operation reports upward. Every
//!   validation outcome detected inside a transaction body maps directly
//!   to one of these; transport errors map through
//!   [`StoreError::to_failure`].

use thiserror::Error;

/// User-facing outcome of a membership or acknowledgement operation.
///
/// The UI layer owns the wording; this type only names the condition.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    #[error("something went wrong")]
    Unknown,

    #[error("no signed-in account")]
    AccountNotFound,

    #[error("no alarm with that name")]
    AlarmNotFound,

    #[error("the alarm is ringing right now")]
    AlarmIsRinging,

    #[error("an alarm with that name already exists")]
    AlarmAlreadyExists,

    #[error("could not reach the alarm service")]
    ConnectionIssue,
}

/// Transport/commit failure of the underlying document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store is unreachable or timed out.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A request the store rejected outright (malformed path or payload).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Conflict retries exhausted without a commit.
    #[error("transaction aborted after retries")]
    Aborted,

    /// A stored document did not decode as the expected record.
    #[error("malformed document at {path}: {message}")]
    Corrupt { path: String, message: String },

    #[error("store error: {0}")]
    Unknown(String),
}

impl StoreError {
    /// The store-error-to-Failure translation table. Anything without a
    /// user-actionable meaning collapses to [`Failure::Unknown`].
    pub fn to_failure(&self) -> Failure {
        match self {
            StoreError::Unavailable(_) => Failure::ConnectionIssue,
            StoreError::InvalidArgument(_) => Failure::AccountNotFound,
            StoreError::Unknown(_) => Failure::Unknown,
            StoreError::Aborted | StoreError::Corrupt { .. } => Failure::Unknown,
        }
    }
}

/// Device configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration from {path}: {source}")]
    ReadFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write configuration to {path}: {source}")]
    WriteFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("no configuration directory on this platform")]
    NoConfigDir,
}

/// Outcome of a single transaction run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    /// The transaction body rejected the operation before writing
    /// anything; nothing was committed and nothing is retried.
    #[error("{0}")]
    Rejected(Failure),

    /// The store could not commit.
    #[error(transparent)]
    Store(StoreError),
}

impl TxError {
    pub fn into_failure(self) -> Failure {
        match self {
            TxError::Rejected(failure) => failure,
            TxError::Store(err) => err.to_failure(),
        }
    }
}

impl From<StoreError> for TxError {
    fn from(err: StoreError) -> Self {
        TxError::Store(err)
    }
}
