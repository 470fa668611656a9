//! Wire protocol for SecretGuess.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Identity types** ([`PlayerSlot`], [`RoomCode`]) shared by every layer.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]) wrapped in an
//!   [`Envelope`].
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) that turns envelopes into
//!   text frames and back.
//!
//! ```text
//! Transport (text frames) → Protocol (Envelope) → Room (game operations)
//! ```
//!
//! The protocol layer knows nothing about connections or rooms. Secrets and
//! guesses travel as plain strings; validating them is the room layer's job.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientMessage, Envelope, ErrorKind, PlayerPresence, PlayerSlot, Recipient,
    RoomCode, ServerMessage,
};
