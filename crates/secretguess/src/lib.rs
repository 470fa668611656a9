//! # SecretGuess
//!
//! A two-player secret code guessing server. Each player locks a secret of
//! four distinct digits from 1 to 9, then the two take turns guessing the
//! other's secret. Every guess is scored with exact and misplaced counts;
//! the first to crack the opponent's code wins, and a match where both use
//! all ten attempts is a draw.
//!
//! Players reach a room by code (`Join`) or by anonymous matchmaking
//! (`AutoMatch`). Clients speak JSON envelopes over WebSocket; see
//! [`secretguess_protocol`] for the message shapes.
//!
//! ```rust,no_run
//! use secretguess::prelude::*;
//!
//! # async fn run() -> Result<(), SecretGuessError> {
//! let server = ServerBuilder::from_config(ServerConfig::from_env())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{DEFAULT_PORT, ServerConfig};
pub use error::SecretGuessError;
pub use server::{Server, ServerBuilder};

/// Everything needed to run a server or write a client against it.
pub mod prelude {
    pub use crate::{SecretGuessError, Server, ServerBuilder, ServerConfig};
    pub use secretguess_protocol::{
        ClientMessage, Codec, Envelope, ErrorKind, JsonCodec, PlayerPresence, PlayerSlot, RoomCode,
        ServerMessage,
    };
    pub use secretguess_room::{Phase, RoomConfig, RoomRegistry};
}
