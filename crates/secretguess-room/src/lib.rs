//! Match orchestration for SecretGuess.
//!
//! Each room runs as an isolated Tokio task (actor) owning one two-player
//! match: seating, secret locking, turn order, scoring and teardown.
//!
//! # Key types
//!
//! - [`Room`]: the match itself, plain synchronous state
//! - [`RoomRegistry`]: finds/creates/destroys rooms, pairs anonymous players
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`Seat`]: a connection's claim on a slot
//! - [`Phase`]: lifecycle state machine
//! - [`score`] / [`is_valid_code`]: the code rules

mod actor;
mod code;
mod config;
mod error;
mod matchmaker;
mod player;
mod registry;
mod room;

pub use actor::{PlayerSender, RoomHandle, RoomInfo, RoomOutbound, Seat};
pub use code::{CODE_LEN, Code, CodeError, Feedback, is_valid_code, score};
pub use config::{Phase, RoomConfig};
pub use error::RoomError;
pub use player::{Player, PlayerIdentity};
pub use registry::{MatchResult, RoomRegistry};
pub use room::{Departure, Events, MAX_ATTEMPTS, Outcome, Room, WinReason};
