//! Room actor: one Tokio task per room, owning its [`Room`].
//!
//! Every operation on a room is a command on the actor's channel, so two
//! players acting at the same instant are simply handled one after the
//! other. The actor routes the events each operation produces to the
//! player channels it holds, and runs its own teardown timers.

use std::collections::VecDeque;
use std::future;

use secretguess_protocol::{PlayerPresence, PlayerSlot, RoomCode, ServerMessage};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::room::{Departure, Events};
use crate::{Phase, PlayerIdentity, Room, RoomConfig, RoomError, RoomRegistry};

/// Something a room (or the matchmaker) pushes to a player's connection.
#[derive(Debug, Clone)]
pub enum RoomOutbound {
    /// Forward to the client as-is.
    Message(ServerMessage),
    /// The matchmaker seated this connection; bind it.
    Seated(Seat),
}

/// Channel for delivering outbound traffic to one connection.
pub type PlayerSender = mpsc::UnboundedSender<RoomOutbound>;

/// Proof that a connection owns a slot in a running room.
#[derive(Debug, Clone)]
pub struct Seat {
    pub room: RoomHandle,
    pub slot: PlayerSlot,
    pub identity: PlayerIdentity,
}

type Reply<T> = oneshot::Sender<Result<T, RoomError>>;

pub(crate) enum RoomCommand {
    Join {
        slot: PlayerSlot,
        name: String,
        identity: Option<PlayerIdentity>,
        sender: PlayerSender,
        reply: Reply<PlayerIdentity>,
    },

    LockSecret {
        slot: PlayerSlot,
        identity: PlayerIdentity,
        code: String,
        reply: Reply<()>,
    },

    Guess {
        slot: PlayerSlot,
        identity: PlayerIdentity,
        code: String,
        reply: Reply<()>,
    },

    /// The connection bound to `slot` closed. Ignored unless `sender` is
    /// still the slot's current binding.
    Disconnect {
        slot: PlayerSlot,
        sender: PlayerSender,
    },

    Leave {
        slot: PlayerSlot,
        identity: PlayerIdentity,
        reply: Reply<()>,
    },

    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },

    Shutdown,
}

/// A snapshot of a room, for inspection and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub phase: Phase,
    pub turn: Option<PlayerSlot>,
    pub attempts: [u8; 2],
    pub players: [Option<PlayerPresence>; 2],
    pub secrets_locked: [bool; 2],
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    code: RoomCode,
    serial: u64,
    sender: mpsc::Sender<RoomCommand>,
    phase: watch::Receiver<Phase>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// The room's phase as of its last command.
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// The actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Running and not yet finished.
    pub fn is_live(&self) -> bool {
        !self.is_closed() && !self.phase().is_terminal()
    }

    pub(crate) fn serial(&self) -> u64 {
        self.serial
    }

    /// Takes or reclaims `slot`, returning the identity that owns it.
    pub async fn join(
        &self,
        slot: PlayerSlot,
        name: String,
        identity: Option<PlayerIdentity>,
        sender: PlayerSender,
    ) -> Result<PlayerIdentity, RoomError> {
        self.request(|reply| RoomCommand::Join {
            slot,
            name,
            identity,
            sender,
            reply,
        })
        .await
    }

    pub async fn lock_secret(
        &self,
        slot: PlayerSlot,
        identity: PlayerIdentity,
        code: String,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::LockSecret {
            slot,
            identity,
            code,
            reply,
        })
        .await
    }

    pub async fn guess(
        &self,
        slot: PlayerSlot,
        identity: PlayerIdentity,
        code: String,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Guess {
            slot,
            identity,
            code,
            reply,
        })
        .await
    }

    pub async fn leave(&self, slot: PlayerSlot, identity: PlayerIdentity) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Leave {
            slot,
            identity,
            reply,
        })
        .await
    }

    /// Reports that the connection behind `sender` closed (fire-and-forget).
    pub async fn disconnect(&self, slot: PlayerSlot, sender: PlayerSender) {
        let _ = self
            .sender
            .send(RoomCommand::Disconnect { slot, sender })
            .await;
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::GetInfo { reply: reply_tx })
            .await
            .map_err(|_| self.gone())?;
        reply_rx.await.map_err(|_| self.gone())
    }

    /// Tells the room to stop.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| self.gone())
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| self.gone())?;
        reply_rx.await.map_err(|_| self.gone())?
    }

    fn gone(&self) -> RoomError {
        RoomError::RoomGone(self.code.clone())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

struct RoomActor {
    room: Room,
    serial: u64,
    config: RoomConfig,
    /// Current binding for each slot; `None` while offline.
    senders: [Option<PlayerSender>; 2],
    receiver: mpsc::Receiver<RoomCommand>,
    phase: watch::Sender<Phase>,
    teardown_at: Option<Instant>,
    registry: RoomRegistry,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room = %self.room.code(), "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if self.handle(cmd) == Flow::Stop {
                        break;
                    }
                    self.phase.send_replace(self.room.phase());
                    self.reschedule();
                }
                () = wait_until(self.teardown_at) => {
                    tracing::info!(
                        room = %self.room.code(),
                        phase = %self.room.phase(),
                        "teardown timer fired"
                    );
                    break;
                }
            }
        }

        self.receiver.close();
        self.registry.forget(self.room.code(), self.serial).await;
        tracing::info!(room = %self.room.code(), "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) -> Flow {
        match cmd {
            RoomCommand::Join {
                slot,
                name,
                identity,
                sender,
                reply,
            } => {
                let result = self.handle_join(slot, name, identity, sender);
                self.reply(reply, result);
            }
            RoomCommand::LockSecret {
                slot,
                identity,
                code,
                reply,
            } => {
                let result = self.handle_lock_secret(slot, &identity, &code);
                self.reply(reply, result);
            }
            RoomCommand::Guess {
                slot,
                identity,
                code,
                reply,
            } => {
                let result = self.handle_guess(slot, &identity, &code);
                self.reply(reply, result);
            }
            RoomCommand::Disconnect { slot, sender } => {
                let current = &self.senders[slot.index()];
                if !current.as_ref().is_some_and(|s| s.same_channel(&sender)) {
                    tracing::debug!(room = %self.room.code(), %slot, "stale disconnect ignored");
                    return Flow::Continue;
                }
                self.senders[slot.index()] = None;
                let events = self.room.mark_offline(slot);
                self.dispatch(events);
            }
            RoomCommand::Leave {
                slot,
                identity,
                reply,
            } => {
                if let Err(e) = self.check_seat(slot, &identity) {
                    self.reply(reply, Err(e));
                    return Flow::Continue;
                }
                let (departure, events) = self.room.leave(slot);
                tracing::info!(room = %self.room.code(), %slot, ?departure, "player left");
                self.dispatch(events);
                self.senders[slot.index()] = None;
                let _ = reply.send(Ok(()));
                if departure == Departure::Closed {
                    return Flow::Stop;
                }
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => {
                tracing::info!(room = %self.room.code(), "room shutting down");
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    fn handle_join(
        &mut self,
        slot: PlayerSlot,
        name: String,
        identity: Option<PlayerIdentity>,
        sender: PlayerSender,
    ) -> Result<PlayerIdentity, RoomError> {
        let (identity, mut events) = self.room.join(slot, name, identity)?;
        if sender.is_closed() {
            tracing::debug!(room = %self.room.code(), %slot, "seated connection already closed");
            events.extend(self.room.mark_offline(slot));
        } else {
            self.senders[slot.index()] = Some(sender);
        }
        self.dispatch(events);
        Ok(identity)
    }

    fn handle_lock_secret(
        &mut self,
        slot: PlayerSlot,
        identity: &PlayerIdentity,
        code: &str,
    ) -> Result<(), RoomError> {
        self.check_seat(slot, identity)?;
        let events = self.room.lock_secret(slot, code)?;
        self.dispatch(events);
        Ok(())
    }

    fn handle_guess(
        &mut self,
        slot: PlayerSlot,
        identity: &PlayerIdentity,
        code: &str,
    ) -> Result<(), RoomError> {
        self.check_seat(slot, identity)?;
        let events = self.room.submit_guess(slot, code)?;
        self.dispatch(events);
        Ok(())
    }

    fn check_seat(&self, slot: PlayerSlot, identity: &PlayerIdentity) -> Result<(), RoomError> {
        if self.room.is_seated(slot, identity) {
            Ok(())
        } else {
            Err(RoomError::NotSeated(slot))
        }
    }

    fn reply<T>(&self, reply: Reply<T>, result: Result<T, RoomError>) {
        if let Err(e) = &result {
            tracing::debug!(room = %self.room.code(), error = %e, "operation rejected");
        }
        let _ = reply.send(result);
    }

    /// Arms or cancels the teardown deadline for the room's current state.
    ///
    /// A finished room keeps its first deadline. An abandoned one is
    /// re-armed only when it becomes abandoned, and any rejoin cancels it.
    fn reschedule(&mut self) {
        if self.room.phase().is_terminal() {
            if self.teardown_at.is_none() {
                self.teardown_at = Some(Instant::now() + self.config.game_over_grace);
            }
        } else if self.room.all_offline() {
            if self.teardown_at.is_none() {
                tracing::debug!(room = %self.room.code(), "nobody connected, arming teardown");
                self.teardown_at = Some(Instant::now() + self.config.reconnect_grace);
            }
        } else {
            self.teardown_at = None;
        }
    }

    /// Delivers `events` to the bound connections.
    ///
    /// A binding whose connection is gone is dropped and its slot goes
    /// offline, which may produce more events to deliver.
    fn dispatch(&mut self, events: Events) {
        let mut pending = VecDeque::from(events);
        while let Some((recipient, msg)) = pending.pop_front() {
            for slot in PlayerSlot::BOTH {
                if !recipient.includes(slot) {
                    continue;
                }
                let Some(sender) = &self.senders[slot.index()] else {
                    continue;
                };
                if sender.send(RoomOutbound::Message(msg.clone())).is_err() {
                    tracing::debug!(room = %self.room.code(), %slot, "binding lost, marking offline");
                    self.senders[slot.index()] = None;
                    pending.extend(self.room.mark_offline(slot));
                }
            }
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.room.code().clone(),
            phase: self.room.phase(),
            turn: self.room.turn(),
            attempts: PlayerSlot::BOTH.map(|s| self.room.attempts(s)),
            players: PlayerSlot::BOTH.map(|s| self.room.presence(s)),
            secrets_locked: PlayerSlot::BOTH.map(|s| self.room.secret(s).is_some()),
        }
    }
}

/// Completes at `deadline`, or never if there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => future::pending().await,
    }
}

/// Spawns a room actor task and returns a handle to it.
pub(crate) fn spawn_room(
    code: RoomCode,
    serial: u64,
    config: RoomConfig,
    registry: RoomRegistry,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.command_buffer);
    let (phase_tx, phase_rx) = watch::channel(Phase::WaitingForPlayers);

    let mut actor = RoomActor {
        room: Room::new(code.clone()),
        serial,
        config,
        senders: [None, None],
        receiver: rx,
        phase: phase_tx,
        teardown_at: None,
        registry,
    };
    // An empty room nobody joins is cleaned up like an abandoned one.
    actor.reschedule();

    tokio::spawn(actor.run());

    RoomHandle {
        code,
        serial,
        sender: tx,
        phase: phase_rx,
    }
}
