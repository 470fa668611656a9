//! Player identity and presence.

use std::fmt;

use rand::Rng;
use secretguess_protocol::PlayerPresence;

/// A stable token that proves ownership of a slot.
///
/// Issued when a player first takes a slot and presented again to reclaim
/// it after a dropped connection. Independent of whichever connection
/// currently carries the player's traffic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerIdentity(String);

impl PlayerIdentity {
    /// A fresh random identity: 16 bytes rendered as 32 lowercase hex chars.
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::rng().random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Wraps a token a client sent back to us.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The occupant of a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub identity: PlayerIdentity,
    pub name: String,
    /// Whether a live connection is bound to the slot.
    pub online: bool,
}

impl Player {
    pub(crate) fn new(identity: PlayerIdentity, name: String) -> Self {
        Self {
            identity,
            name,
            online: true,
        }
    }

    pub fn presence(&self) -> PlayerPresence {
        PlayerPresence {
            name: self.name.clone(),
            online: self.online,
        }
    }
}
