//! Per-connection gateway: decode frames, drive the room, relay events.
//!
//! Each accepted connection gets its own task running [`handle_connection`].
//! The task owns a player channel; rooms and the matchmaker push events
//! into it, and the task's own replies go through it too, so everything a
//! client sees arrives in one ordered stream.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use secretguess_protocol::{ClientMessage, Codec, Envelope, ErrorKind, PlayerSlot, RoomCode, ServerMessage};
use secretguess_room::{MatchResult, PlayerIdentity, PlayerSender, RoomError, RoomOutbound, Seat};
use secretguess_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::SecretGuessError;
use crate::server::ServerState;

/// Longest display name we keep, in characters.
const MAX_NAME_CHARS: usize = 24;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), SecretGuessError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let (sender, mut outbound) = mpsc::unbounded_channel();
    let mut session = Session {
        conn_id,
        state: Arc::clone(&state),
        sender,
        seat: None,
        waiting: false,
    };
    let mut seq: u64 = 1;
    let start = Instant::now();

    loop {
        tokio::select! {
            inbound = tokio::time::timeout(state.config.idle_timeout, conn.recv()) => {
                let frame = match inbound {
                    Ok(Ok(Some(frame))) => frame,
                    Ok(Ok(None)) => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Ok(Err(e)) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                    // Players in a room or in matchmaking may sit quietly.
                    Err(_) if session.is_attached() => continue,
                    Err(_) => {
                        tracing::info!(%conn_id, "connection timed out");
                        break;
                    }
                };
                session.handle_frame(&frame).await;
            }
            Some(item) = outbound.recv() => match item {
                RoomOutbound::Message(msg) => {
                    send_message(&conn, &state.codec, msg, next_seq(&mut seq), &start).await?;
                }
                RoomOutbound::Seated(seat) => session.seated(seat).await,
            },
        }
    }

    let _ = conn.close().await;
    // `session` drops here and releases its seat.
    Ok(())
}

/// What one connection has claimed. Dropping it releases the claim.
struct Session<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
    sender: PlayerSender,
    seat: Option<Seat>,
    /// Offered to the matchmaker and not yet seated or withdrawn.
    waiting: bool,
}

impl<C: Codec> Session<C> {
    async fn handle_frame(&mut self, frame: &str) {
        let envelope: Envelope<ClientMessage> = match self.state.codec.decode(frame) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(conn_id = %self.conn_id, error = %e, "failed to decode envelope");
                self.reject(ErrorKind::BadRequest, e.to_string());
                return;
            }
        };

        match envelope.payload {
            ClientMessage::Join {
                room,
                slot,
                name,
                identity,
            } => self.join(room, slot, name, identity).await,
            ClientMessage::AutoMatch { name } => self.auto_match(name).await,
            ClientMessage::Secret { code } => {
                let Some(seat) = self.require_seat() else { return };
                let result = seat.room.lock_secret(seat.slot, seat.identity, code).await;
                self.settle(result);
            }
            ClientMessage::Guess { code } => {
                let Some(seat) = self.require_seat() else { return };
                let result = seat.room.guess(seat.slot, seat.identity, code).await;
                self.settle(result);
            }
            ClientMessage::Leave => self.leave().await,
            ClientMessage::Heartbeat { client_time } => {
                self.reply(ServerMessage::HeartbeatAck {
                    client_time,
                    server_time: unix_millis(),
                });
            }
        }
    }

    async fn join(
        &mut self,
        room: RoomCode,
        slot: PlayerSlot,
        name: String,
        identity: Option<String>,
    ) {
        if let Some(seat) = &self.seat {
            let message = format!("already seated in room {}; leave it first", seat.room.code());
            self.reject(ErrorKind::BadRequest, message);
            return;
        }
        if !self.withdraw().await {
            return;
        }

        let result = self
            .state
            .registry
            .occupy(
                &room,
                slot,
                display_name(&name),
                identity.map(PlayerIdentity::from_token),
                self.sender.clone(),
            )
            .await;
        match result {
            Ok(seat) => self.bind(seat),
            Err(e) => self.reject_room(&e),
        }
    }

    async fn auto_match(&mut self, name: String) {
        if let Some(seat) = &self.seat {
            let message = format!("already seated in room {}; leave it first", seat.room.code());
            self.reject(ErrorKind::BadRequest, message);
            return;
        }
        if self.waiting {
            self.reply(ServerMessage::Waiting);
            return;
        }

        let result = self
            .state
            .registry
            .request_match(display_name(&name), self.sender.clone())
            .await;
        match result {
            Ok(MatchResult::Pending) => {
                tracing::info!(conn_id = %self.conn_id, "waiting for a match");
                self.waiting = true;
                self.reply(ServerMessage::Waiting);
                self.reply(ServerMessage::Msg {
                    text: "🔍 Waiting for another player...".into(),
                });
            }
            Ok(MatchResult::Matched(seat)) => self.bind(seat),
            Err(e) => self.reject_room(&e),
        }
    }

    async fn leave(&mut self) {
        let was_waiting = self.waiting;
        if !self.withdraw().await {
            return;
        }
        match self.seat.take() {
            Some(seat) => {
                match seat.room.leave(seat.slot, seat.identity).await {
                    Ok(()) | Err(RoomError::RoomGone(_)) => {}
                    Err(e) => self.reject_room(&e),
                }
                tracing::info!(conn_id = %self.conn_id, room = %seat.room.code(), "left room");
                self.reply(ServerMessage::Msg {
                    text: format!("You left room {}", seat.room.code()),
                });
            }
            None if was_waiting => self.reply(ServerMessage::Msg {
                text: "You left matchmaking".into(),
            }),
            None => self.reject(ErrorKind::NotSeated, "not in a room".into()),
        }
    }

    /// Takes this connection out of matchmaking.
    ///
    /// Returns `false` if the matchmaker already paired it; its seat is
    /// on the way, so the caller must not act as if it were free.
    async fn withdraw(&mut self) -> bool {
        if !self.waiting {
            return true;
        }
        if self.state.registry.cancel_match(&self.sender).await {
            self.waiting = false;
            return true;
        }
        self.reject(
            ErrorKind::BadRequest,
            "a match was already found; your seat is on the way".into(),
        );
        false
    }

    /// A seat handed over by the matchmaker.
    async fn seated(&mut self, seat: Seat) {
        self.waiting = false;
        if let Some(current) = &self.seat {
            tracing::warn!(
                conn_id = %self.conn_id,
                room = %seat.room.code(),
                current = %current.room.code(),
                "already seated, releasing matched seat"
            );
            if let Err(e) = seat.room.leave(seat.slot, seat.identity).await {
                tracing::debug!(conn_id = %self.conn_id, error = %e, "release failed");
            }
            return;
        }
        self.bind(seat);
    }

    /// In a room or waiting for a match.
    fn is_attached(&self) -> bool {
        self.seat.is_some() || self.waiting
    }

    fn bind(&mut self, seat: Seat) {
        tracing::info!(
            conn_id = %self.conn_id,
            room = %seat.room.code(),
            slot = %seat.slot,
            "seated"
        );
        self.seat = Some(seat);
    }

    /// The current seat, or a `NotSeated` rejection.
    fn require_seat(&self) -> Option<Seat> {
        if self.seat.is_none() {
            self.reject(ErrorKind::NotSeated, "join a room first".into());
        }
        self.seat.clone()
    }

    fn settle(&mut self, result: Result<(), RoomError>) {
        if let Err(e) = result {
            if matches!(e, RoomError::RoomGone(_)) {
                self.seat = None;
            }
            self.reject_room(&e);
        }
    }

    fn reject_room(&self, err: &RoomError) {
        tracing::debug!(conn_id = %self.conn_id, error = %err, "operation rejected");
        self.reject(err.kind(), err.to_string());
        if matches!(err, RoomError::InvalidGuess(_)) {
            self.reply(ServerMessage::RetryTurn);
        }
    }

    fn reject(&self, kind: ErrorKind, message: String) {
        self.reply(ServerMessage::Rejected { kind, message });
    }

    fn reply(&self, msg: ServerMessage) {
        let _ = self.sender.send(RoomOutbound::Message(msg));
    }
}

impl<C: Codec> Drop for Session<C> {
    fn drop(&mut self) {
        let state = Arc::clone(&self.state);
        let sender = self.sender.clone();
        let seat = self.seat.take();
        let conn_id = self.conn_id;
        tokio::spawn(async move {
            state.registry.cancel_match(&sender).await;
            if let Some(seat) = seat {
                tracing::debug!(%conn_id, room = %seat.room.code(), slot = %seat.slot, "releasing seat");
                seat.room.disconnect(seat.slot, sender).await;
            }
        });
    }
}

async fn send_message(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    payload: ServerMessage,
    seq: u64,
    start: &Instant,
) -> Result<(), SecretGuessError> {
    let envelope = Envelope::new(seq, start.elapsed().as_millis() as u64, payload);
    let frame = codec.encode(&envelope)?;
    conn.send(&frame).await?;
    Ok(())
}

/// Trims and caps a client-supplied name.
fn display_name(raw: &str) -> String {
    let name: String = raw.trim().chars().take(MAX_NAME_CHARS).collect();
    if name.is_empty() {
        "Player".to_string()
    } else {
        name
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
