//! Codec trait and implementations for turning envelopes into text frames.
//!
//! The gateway never touches `serde_json` directly; it goes through a
//! [`Codec`] so the wire format can change without touching game code.
//! [`JsonCodec`] is the only implementation today and matches what browser
//! clients expect.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values into text frames and decodes frames back into values.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the life of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Parses a text frame into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the frame is malformed or doesn't
    /// match the expected shape.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// Behind the `json` feature (enabled by default).
///
/// ```rust
/// use secretguess_protocol::{ClientMessage, Codec, Envelope, JsonCodec};
///
/// let codec = JsonCodec;
/// let frame = codec
///     .encode(&Envelope::new(1, 0, ClientMessage::Guess { code: "1234".into() }))
///     .unwrap();
///
/// let decoded: Envelope<ClientMessage> = codec.decode(&frame).unwrap();
/// assert_eq!(decoded.payload, ClientMessage::Guess { code: "1234".into() });
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientMessage, Envelope, ServerMessage};

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let result: Result<Envelope<ClientMessage>, _> =
            JsonCodec.decode("not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_produces_tagged_payload() {
        let frame = JsonCodec
            .encode(&Envelope::new(3, 40, ServerMessage::RetryTurn))
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();

        assert_eq!(json["seq"], 3);
        assert_eq!(json["timestamp"], 40);
        assert_eq!(json["payload"]["type"], "RetryTurn");
    }
}
