//! Schema-validated decoding of remote payloads.
//!
//! Remote child events deliver loosely-typed JSON values.  Rather than
//! optional-chaining through them, everything funnels through
//! [`decode_message`], which returns a tagged result the sync engine can
//! drop-and-log on failure.

use serde_json::Value;

use crate::error::DecodeError;
use crate::models::ChatMessage;

/// Decode a remote message payload into a [`ChatMessage`].
///
/// Rejects payloads that are not objects or that carry an empty
/// `messageID` (a record the remote never finished assigning).
pub fn decode_message(payload: &Value) -> Result<ChatMessage, DecodeError> {
    if !payload.is_object() {
        return Err(DecodeError::NotAnObject);
    }

    let message: ChatMessage = serde_json::from_value(payload.clone())?;
    if message.message_id.is_empty() {
        return Err(DecodeError::MissingMessageId);
    }
    Ok(message)
}

/// Encode a message into the wire value pushed to the remote store.
///
/// Serialization of the model types is infallible in practice (no maps
/// with non-string keys, no non-finite floats are constructed), so a
/// failure here is a programming error surfaced as `null` plus a log line
/// rather than a crash of the calling pipeline.
pub fn encode_message(message: &ChatMessage) -> Value {
    serde_json::to_value(message).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to encode message record");
        Value::Null
    })
}
