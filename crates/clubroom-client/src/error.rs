use thiserror::Error;

/// Errors surfaced at the sync-core boundary.
///
/// Per-event failures (undecodable payloads, failed snapshot writes) are
/// absorbed and logged inside the engine; only setup-time failures reach
/// callers.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Local snapshot store failure.
    #[error("Store error: {0}")]
    Store(#[from] clubroom_store::StoreError),

    /// Remote-store boundary failure.
    #[error("Remote error: {0}")]
    Remote(#[from] clubroom_remote::RemoteError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
