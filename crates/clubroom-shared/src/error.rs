use thiserror::Error;

/// Errors produced while decoding a remote payload.
///
/// A decode failure is never fatal to a sync subscription: the engine drops
/// the offending event and keeps processing.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The payload did not match the message schema.
    #[error("Malformed message payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload decoded but carries an empty message identifier.
    #[error("Message payload has no identifier")]
    MissingMessageId,

    /// The payload was not a JSON object at all.
    #[error("Message payload is not an object")]
    NotAnObject,
}
