//! Unified error type for the SecretGuess server.

use secretguess_protocol::ProtocolError;
use secretguess_room::RoomError;
use secretguess_transport::TransportError;

/// Top-level error wrapping each layer's error.
///
/// `#[from]` on every variant lets `?` lift layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SecretGuessError {
    /// Accept, send or receive failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame couldn't be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room refused an operation.
    #[error(transparent)]
    Room(#[from] RoomError),
}
