//! Room configuration and phase machine.

use std::time::Duration;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Timing and sizing knobs shared by every room the registry spawns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    /// How long a finished room lingers so the final broadcasts land.
    pub game_over_grace: Duration,

    /// How long a room survives with nobody connected.
    pub reconnect_grace: Duration,

    /// Capacity of each room's command channel.
    pub command_buffer: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            game_over_grace: Duration::from_secs(3),
            reconnect_grace: Duration::from_secs(30),
            command_buffer: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Where a room is in its match.
///
/// Transitions are strictly ordered:
///
/// ```text
/// WaitingForPlayers → WaitingForSecrets → InProgress → GameOver
/// ```
///
/// - **WaitingForPlayers**: fewer than two slots occupied.
/// - **WaitingForSecrets**: both seated, at least one secret still missing.
/// - **InProgress**: both secrets locked; players alternate guesses.
/// - **GameOver**: someone cracked the code, forfeited, or both ran out of
///   attempts. Terminal.
///
/// A room abandoned before play never reaches `GameOver`; it is simply torn
/// down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    WaitingForPlayers,
    WaitingForSecrets,
    InProgress,
    GameOver,
}

impl Phase {
    /// No match has started yet.
    pub fn is_pre_play(&self) -> bool {
        matches!(self, Self::WaitingForPlayers | Self::WaitingForSecrets)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::GameOver)
    }

    /// The phase after this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::WaitingForPlayers => Some(Self::WaitingForSecrets),
            Self::WaitingForSecrets => Some(Self::InProgress),
            Self::InProgress => Some(Self::GameOver),
            Self::GameOver => None,
        }
    }

    /// Returns `true` if moving to `target` follows the order above.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WaitingForPlayers => write!(f, "WaitingForPlayers"),
            Self::WaitingForSecrets => write!(f, "WaitingForSecrets"),
            Self::InProgress => write!(f, "InProgress"),
            Self::GameOver => write!(f, "GameOver"),
        }
    }
}
