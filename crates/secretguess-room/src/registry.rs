//! Room registry: finds, creates and destroys rooms, and runs matchmaking.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use secretguess_protocol::{PlayerSlot, RoomCode, ServerMessage};
use tokio::sync::Mutex;

use crate::actor::spawn_room;
use crate::matchmaker::{MatchQueue, MatchRequest, Offer};
use crate::{PlayerIdentity, PlayerSender, RoomConfig, RoomError, RoomHandle, RoomOutbound, Seat};

/// Prefix of room codes handed out by the matchmaker.
const GENERATED_PREFIX: &str = "SG";

/// Result of [`RoomRegistry::request_match`].
#[derive(Debug)]
pub enum MatchResult {
    /// Paired; the caller sits in the returned seat.
    Matched(Seat),
    /// Nobody else is waiting yet.
    Pending,
}

struct Inner {
    rooms: HashMap<RoomCode, RoomHandle>,
    queue: MatchQueue,
    next_serial: u64,
}

/// Every live room, keyed by code, plus the matchmaking slot.
///
/// Built once at startup and cloned into every connection task; clones
/// share state. The lock only guards map and queue updates and is never
/// held while waiting on a room.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<Mutex<Inner>>,
    config: RoomConfig,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                rooms: HashMap::new(),
                queue: MatchQueue::default(),
                next_serial: 0,
            })),
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Returns the live room for `code`, creating it if needed.
    ///
    /// A room that has finished or stopped is replaced by a fresh one.
    pub async fn get_or_create(&self, code: &RoomCode) -> RoomHandle {
        let mut inner = self.inner.lock().await;
        if let Some(handle) = inner.rooms.get(code) {
            if handle.is_live() {
                return handle.clone();
            }
        }
        self.spawn_locked(&mut inner, code.clone())
    }

    /// The live room for `code`, if there is one.
    pub async fn get(&self, code: &RoomCode) -> Option<RoomHandle> {
        let inner = self.inner.lock().await;
        inner.rooms.get(code).filter(|h| h.is_live()).cloned()
    }

    /// Seats a player in `slot` of room `code`, creating the room if needed.
    ///
    /// # Errors
    /// [`RoomError::SlotTaken`] if the slot belongs to someone else.
    pub async fn occupy(
        &self,
        code: &RoomCode,
        slot: PlayerSlot,
        name: String,
        identity: Option<PlayerIdentity>,
        sender: PlayerSender,
    ) -> Result<Seat, RoomError> {
        let room = self.get_or_create(code).await;
        let identity = room.join(slot, name, identity, sender).await?;
        Ok(Seat {
            room,
            slot,
            identity,
        })
    }

    /// Pairs the caller with the waiting player, or makes it the waiting one.
    ///
    /// When paired, the waiting player takes slot A of a fresh room and is
    /// told so through a [`RoomOutbound::Seated`] on its channel; the caller
    /// takes slot B.
    pub async fn request_match(
        &self,
        name: String,
        sender: PlayerSender,
    ) -> Result<MatchResult, RoomError> {
        let (waiting, caller, room) = {
            let mut inner = self.inner.lock().await;
            match inner.queue.offer(MatchRequest { name, sender }) {
                Offer::Queued => return Ok(MatchResult::Pending),
                Offer::Paired { waiting, caller } => {
                    let code = generate_code(&inner.rooms);
                    let room = self.spawn_locked(&mut inner, code);
                    (waiting, caller, room)
                }
            }
        };
        tracing::info!(room = %room.code(), "match found");

        // Bind the waiting connection first so nothing it sends after
        // seeing its `Joined` can arrive unseated.
        let first = PlayerIdentity::generate();
        let _ = waiting.sender.send(RoomOutbound::Seated(Seat {
            room: room.clone(),
            slot: PlayerSlot::First,
            identity: first.clone(),
        }));
        room.join(
            PlayerSlot::First,
            waiting.name,
            Some(first),
            waiting.sender.clone(),
        )
        .await?;
        let second = room
            .join(PlayerSlot::Second, caller.name, None, caller.sender.clone())
            .await?;

        let found = ServerMessage::Msg {
            text: "🎮 Match found!".into(),
        };
        for sender in [&waiting.sender, &caller.sender] {
            let _ = sender.send(RoomOutbound::Message(found.clone()));
        }

        Ok(MatchResult::Matched(Seat {
            room,
            slot: PlayerSlot::Second,
            identity: second,
        }))
    }

    /// Withdraws `sender` from matchmaking. Returns `true` if it was waiting.
    pub async fn cancel_match(&self, sender: &PlayerSender) -> bool {
        let cancelled = self.inner.lock().await.queue.cancel(sender);
        if cancelled {
            tracing::debug!("waiting player withdrew from matchmaking");
        }
        cancelled
    }

    /// Someone is waiting to be matched.
    pub async fn has_waiting(&self) -> bool {
        self.inner.lock().await.queue.is_waiting()
    }

    /// Removes and shuts down room `code`. Returns `false` if it wasn't
    /// there.
    pub async fn destroy(&self, code: &RoomCode) -> bool {
        let removed = self.inner.lock().await.rooms.remove(code);
        match removed {
            Some(handle) => {
                let _ = handle.shutdown().await;
                tracing::info!(room = %code, "room destroyed");
                true
            }
            None => false,
        }
    }

    /// Number of rooms still running.
    pub async fn room_count(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.rooms.values().filter(|h| !h.is_closed()).count()
    }

    /// Called by a room actor on its way out. Only removes the entry if it
    /// still points at that actor.
    pub(crate) async fn forget(&self, code: &RoomCode, serial: u64) {
        let mut inner = self.inner.lock().await;
        if inner.rooms.get(code).is_some_and(|h| h.serial() == serial) {
            inner.rooms.remove(code);
            tracing::debug!(room = %code, "room unregistered");
        }
    }

    fn spawn_locked(&self, inner: &mut Inner, code: RoomCode) -> RoomHandle {
        inner.next_serial += 1;
        let handle = spawn_room(
            code.clone(),
            inner.next_serial,
            self.config.clone(),
            self.clone(),
        );
        inner.rooms.insert(code.clone(), handle.clone());
        tracing::info!(room = %code, "room created");
        handle
    }
}

/// Picks a code no registered room uses: `SG` plus three digits, falling
/// back to random letters once the `SG` range gets crowded.
fn generate_code(rooms: &HashMap<RoomCode, RoomHandle>) -> RoomCode {
    let mut rng = rand::rng();
    let mut tries = 0u32;
    loop {
        tries += 1;
        let prefix = if tries <= 64 {
            GENERATED_PREFIX.to_string()
        } else {
            (0..RoomCode::PREFIX_LEN)
                .map(|_| char::from(rng.random_range(b'A'..=b'Z')))
                .collect()
        };
        let number: u16 = rng.random_range(100..1000);
        if let Ok(code) = RoomCode::parse(&format!("{prefix}{number}")) {
            if !rooms.contains_key(&code) {
                return code;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_uses_sg_prefix() {
        let code = generate_code(&HashMap::new());
        assert!(code.as_str().starts_with("SG"));
        let number: u16 = code.as_str()[2..].parse().unwrap();
        assert!((100..1000).contains(&number));
    }

    #[tokio::test]
    async fn test_generate_code_avoids_taken_codes() {
        let registry = RoomRegistry::new(RoomConfig::default());
        let mut rooms = HashMap::new();
        for n in 100..1000 {
            let code = RoomCode::parse(&format!("SG{n}")).unwrap();
            if n != 555 {
                let handle = registry.get_or_create(&code).await;
                rooms.insert(code, handle);
            }
        }

        let code = generate_code(&rooms);
        assert!(!rooms.contains_key(&code));
    }
}
