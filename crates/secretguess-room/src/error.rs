//! Error types for the room layer.

use secretguess_protocol::{ErrorKind, PlayerSlot, RoomCode};

use crate::Phase;

/// Why a room operation was refused.
///
/// None of these are fatal: the room is left exactly as it was and the
/// caller is told what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("{0:?} is not a valid secret: use four different digits from 1 to 9")]
    InvalidCode(String),

    #[error("{0:?} is not a valid guess: use four different digits from 1 to 9")]
    InvalidGuess(String),

    /// Carries the slot that does hold the turn.
    #[error("not your turn, player {0} is guessing")]
    NotYourTurn(PlayerSlot),

    #[error("secret already locked")]
    AlreadyLocked,

    #[error("no attempts left")]
    AttemptsExhausted,

    #[error("slot {0} is taken")]
    SlotTaken(PlayerSlot),

    #[error("room {0} is gone")]
    RoomGone(RoomCode),

    /// The room's phase doesn't allow this operation.
    #[error("not allowed while the room is {0}")]
    WrongPhase(Phase),

    /// The caller doesn't own this slot.
    #[error("you are not seated in slot {0}")]
    NotSeated(PlayerSlot),
}

impl RoomError {
    /// The wire-level category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCode(_) => ErrorKind::InvalidCode,
            Self::InvalidGuess(_) => ErrorKind::InvalidGuess,
            Self::NotYourTurn(_) => ErrorKind::NotYourTurn,
            Self::AlreadyLocked => ErrorKind::AlreadyLocked,
            Self::AttemptsExhausted => ErrorKind::AttemptsExhausted,
            Self::SlotTaken(_) => ErrorKind::SlotTaken,
            Self::RoomGone(_) => ErrorKind::RoomGone,
            Self::WrongPhase(_) => ErrorKind::WrongPhase,
            Self::NotSeated(_) => ErrorKind::NotSeated,
        }
    }
}
