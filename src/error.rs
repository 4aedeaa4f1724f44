use std::time::Duration;

pub type Result<T, E = UpdateError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// A service, container or task definition does not exist.
    #[error("{0}")]
    NotFound(String),

    #[error("service {service} in cluster {cluster} has status {status} and cannot be updated")]
    InvalidState {
        service: String,
        cluster: String,
        status: String,
    },

    /// The last error returned by the control plane once the retry budget ran out.
    #[error(transparent)]
    RetryExhausted(anyhow::Error),

    #[error("wait timeout after {} second(s)", .waited.as_secs())]
    Timeout { waited: Duration },

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    ControlPlane(#[from] anyhow::Error),
}

#[cfg(test)]
impl UpdateError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, UpdateError::NotFound(_))
    }
}
