use thiserror::Error;

/// Common error taxonomy for Nameplate
///
/// Every fallible directory operation reports one of these kinds as a
/// value; ordinary failures (a name clash, a miss, a bad key) are never
/// signalled by panicking.
#[derive(Debug, Error)]
pub enum NameplateError {
    #[error("name already registered: {name} at {scope}")]
    NameClash { name: String, scope: String },

    #[error("name not found: {name}")]
    NotFound { name: String },

    /// Deregistration was refused. Deliberately carries no detail: a
    /// missing record and a wrong key collapse into the same failure.
    #[error("deregistration not authorized")]
    Authorization,

    #[error("endpoint was not created by this manager")]
    OwnershipViolation,

    #[error("communication failure: {0}")]
    Communication(String),

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("remote execution failed: {0}")]
    RemoteExecution(String),

    #[error("worker exited without reporting an outcome")]
    AbruptWorkerExit,

    #[error("timed out waiting for reply")]
    Timeout,

    #[error("invalid location: {0}")]
    InvalidLocation(String),

    #[error("invalid scope: {0}")]
    InvalidScope(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for Nameplate operations
pub type Result<T> = std::result::Result<T, NameplateError>;

impl NameplateError {
    pub fn name_clash(name: impl Into<String>, scope: impl Into<String>) -> Self {
        Self::NameClash {
            name: name.into(),
            scope: scope.into(),
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn communication(msg: impl Into<String>) -> Self {
        Self::Communication(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn remote_execution(msg: impl Into<String>) -> Self {
        Self::RemoteExecution(msg.into())
    }
}
