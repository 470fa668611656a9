//! Server configuration read from the environment.

use std::str::FromStr;
use std::time::Duration;

use secretguess_room::RoomConfig;

/// Port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3000;

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind: String,
    pub room: RoomConfig,
    /// A connection that is neither seated nor waiting for a match is
    /// closed after sending nothing for this long.
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: format!("0.0.0.0:{DEFAULT_PORT}"),
            room: RoomConfig::default(),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    /// Reads the process environment:
    ///
    /// - `SECRETGUESS_BIND`: full listen address (default `0.0.0.0:$PORT`)
    /// - `PORT`: listen port when no bind address is given (default 3000)
    /// - `SECRETGUESS_GAME_OVER_GRACE_MS`: default 3000
    /// - `SECRETGUESS_RECONNECT_GRACE_SECS`: default 30
    ///
    /// Unparseable values are logged and replaced by their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let bind = match lookup("SECRETGUESS_BIND") {
            Some(addr) if !addr.trim().is_empty() => addr.trim().to_string(),
            _ => {
                let port = parsed(&lookup, "PORT", DEFAULT_PORT);
                format!("0.0.0.0:{port}")
            }
        };
        let game_over_ms = parsed(
            &lookup,
            "SECRETGUESS_GAME_OVER_GRACE_MS",
            defaults.room.game_over_grace.as_millis() as u64,
        );
        let reconnect_secs = parsed(
            &lookup,
            "SECRETGUESS_RECONNECT_GRACE_SECS",
            defaults.room.reconnect_grace.as_secs(),
        );

        Self {
            bind,
            room: RoomConfig {
                game_over_grace: Duration::from_millis(game_over_ms),
                reconnect_grace: Duration::from_secs(reconnect_secs),
                ..defaults.room
            },
            ..defaults
        }
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(key, value = %raw, %default, "ignoring invalid setting");
            default
        }
    }
}
