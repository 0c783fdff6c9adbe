use thiserror::Error;

/// Errors produced at the remote-store boundary.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The backend task is gone; its command channel is closed.
    #[error("Remote store is not running")]
    Disconnected,
}
