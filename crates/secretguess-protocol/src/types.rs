//! Core protocol types: everything that is serialized onto the wire.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// One of the two fixed seats in a room.
///
/// On the wire the slots keep their historical names, `"A"` and `"B"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerSlot {
    #[serde(rename = "A")]
    First,
    #[serde(rename = "B")]
    Second,
}

impl PlayerSlot {
    /// Both slots, in seating order.
    pub const BOTH: [PlayerSlot; 2] = [PlayerSlot::First, PlayerSlot::Second];

    /// The other seat.
    pub fn opponent(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    /// Index into per-slot arrays (`First` = 0, `Second` = 1).
    pub fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "A"),
            Self::Second => write!(f, "B"),
        }
    }
}

/// A human-shareable room identifier: two letters followed by three digits
/// (for example `SG123`).
///
/// Codes are case-insensitive; [`RoomCode::parse`] trims and uppercases its
/// input, so `" ab123"` and `"AB123"` name the same room. A `RoomCode` value
/// is always normalized, which makes it safe to use as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Number of leading letters.
    pub const PREFIX_LEN: usize = 2;
    /// Number of trailing digits.
    pub const DIGITS: usize = 3;

    /// Parses and normalizes a room code.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidRoomCode`] unless the trimmed input is
    /// exactly two ASCII letters followed by three ASCII digits.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let normalized = raw.trim().to_ascii_uppercase();
        let bytes = normalized.as_bytes();
        let well_formed = bytes.len() == Self::PREFIX_LEN + Self::DIGITS
            && bytes[..Self::PREFIX_LEN].iter().all(u8::is_ascii_uppercase)
            && bytes[Self::PREFIX_LEN..].iter().all(u8::is_ascii_digit);

        if well_formed {
            Ok(Self(normalized))
        } else {
            Err(ProtocolError::InvalidRoomCode(raw.to_string()))
        }
    }

    /// The normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoomCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who inside a room should receive a server message.
///
/// Never serialized; the room actor uses it to route events to the player
/// channels it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every occupied slot.
    All,
    /// A single slot.
    Slot(PlayerSlot),
    /// Every occupied slot except this one.
    AllExcept(PlayerSlot),
}

impl Recipient {
    /// Returns `true` if `slot` is addressed by this recipient.
    pub fn includes(self, slot: PlayerSlot) -> bool {
        match self {
            Self::All => true,
            Self::Slot(target) => target == slot,
            Self::AllExcept(excluded) => excluded != slot,
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Why an operation was rejected. Sent only to the player who attempted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The secret isn't a valid code.
    InvalidCode,
    /// The guess isn't a valid code; the same player may resubmit.
    InvalidGuess,
    /// Someone else holds the turn.
    NotYourTurn,
    /// This slot already locked its secret.
    AlreadyLocked,
    /// This slot has used all its attempts.
    AttemptsExhausted,
    /// The requested slot belongs to another player.
    SlotTaken,
    /// The room no longer exists.
    RoomGone,
    /// The room's phase doesn't allow this operation.
    WrongPhase,
    /// The connection doesn't own a seat in a room.
    NotSeated,
    /// The frame couldn't be decoded or made no sense here.
    BadRequest,
}

/// Presence information for one occupied slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPresence {
    pub name: String,
    pub online: bool,
}

/// Client → server messages.
///
/// Internally tagged, so a guess looks like
/// `{ "type": "Guess", "code": "1234" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Take (or reclaim) a slot in a named room. The room is created on
    /// first join. `identity` is the token from an earlier `Joined` and is
    /// only needed to reconnect.
    Join {
        room: RoomCode,
        slot: PlayerSlot,
        name: String,
        #[serde(default)]
        identity: Option<String>,
    },

    /// Pair with the next anonymous player.
    AutoMatch { name: String },

    /// Lock this slot's secret.
    Secret { code: String },

    /// Guess the opponent's secret.
    Guess { code: String },

    /// Abandon the current room.
    Leave,

    /// Keep-alive.
    Heartbeat { client_time: u64 },
}

/// Server → client messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// You own `slot` in `room`. Keep `identity` to reconnect later.
    Joined {
        room: RoomCode,
        slot: PlayerSlot,
        identity: String,
    },

    /// Queued for matchmaking; nobody else is waiting yet.
    Waiting,

    /// Human-readable narration of what just happened.
    Msg { text: String },

    /// `slot` may guess now.
    Turn { slot: PlayerSlot },

    /// Result of a scored guess.
    Feedback {
        by: PlayerSlot,
        guess: String,
        attempt: u8,
        exact: u8,
        misplaced: u8,
    },

    /// The last guess was malformed; guess again.
    RetryTurn,

    /// Both secrets, revealed once the match is over.
    RevealSecret { a: String, b: String },

    /// The match ended. `winner` is `None` for a draw.
    GameOver {
        winner: Option<PlayerSlot>,
        reason: String,
    },

    /// Who sits where and whether they're connected.
    PlayerStatus {
        a: Option<PlayerPresence>,
        b: Option<PlayerPresence>,
    },

    /// Your last request was rejected.
    Rejected { kind: ErrorKind, message: String },

    /// Reply to [`ClientMessage::Heartbeat`].
    HeartbeatAck { client_time: u64, server_time: u64 },
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The top-level wire frame.
///
/// `seq` and `timestamp` are informational. Clients may leave them out, in
/// which case they default to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<P> {
    /// Per-sender sequence number.
    #[serde(default)]
    pub seq: u64,

    /// Milliseconds since the sender's connection started.
    #[serde(default)]
    pub timestamp: u64,

    /// The message itself.
    pub payload: P,
}

impl<P> Envelope<P> {
    pub fn new(seq: u64, timestamp: u64, payload: P) -> Self {
        Self {
            seq,
            timestamp,
            payload,
        }
    }
}
