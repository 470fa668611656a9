//! The match aggregate: seats, secrets, turns and scoring.
//!
//! [`Room`] is plain data with synchronous operations. It knows nothing
//! about channels or tasks; every operation returns the events it produced
//! as `(Recipient, ServerMessage)` pairs and the room actor routes them.
//! A rejected operation returns an error and leaves the room untouched.

use secretguess_protocol::{PlayerPresence, PlayerSlot, Recipient, RoomCode, ServerMessage};

use crate::code::{Code, score};
use crate::{Phase, Player, PlayerIdentity, RoomError};

/// Guesses each slot gets per match.
pub const MAX_ATTEMPTS: u8 = 10;

/// Events produced by one room operation, in delivery order.
pub type Events = Vec<(Recipient, ServerMessage)>;

/// How a finished match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win { winner: PlayerSlot, reason: WinReason },
    /// Both slots used every attempt without cracking the other's code.
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinReason {
    /// The winner guessed the opponent's secret.
    Cracked,
    /// The opponent left mid-match.
    Forfeit,
}

impl Outcome {
    pub fn winner(&self) -> Option<PlayerSlot> {
        match self {
            Self::Win { winner, .. } => Some(*winner),
            Self::Draw => None,
        }
    }

    /// Short machine-friendly reason sent with `GameOver`.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Win {
                reason: WinReason::Cracked,
                ..
            } => "cracked",
            Self::Win {
                reason: WinReason::Forfeit,
                ..
            } => "forfeit",
            Self::Draw => "draw",
        }
    }
}

/// What an explicit leave did to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// Nobody had started playing; the room should be torn down now.
    Closed,
    /// The match was running; the leaver's opponent wins.
    Forfeited,
    /// The match was already over.
    Ignored,
}

#[derive(Debug)]
pub struct Room {
    code: RoomCode,
    players: [Option<Player>; 2],
    secrets: [Option<Code>; 2],
    attempts: [u8; 2],
    turn: PlayerSlot,
    phase: Phase,
    first_joined: Option<PlayerSlot>,
    outcome: Option<Outcome>,
}

impl Room {
    pub fn new(code: RoomCode) -> Self {
        Self {
            code,
            players: [None, None],
            secrets: [None, None],
            attempts: [0, 0],
            turn: PlayerSlot::First,
            phase: Phase::WaitingForPlayers,
            first_joined: None,
            outcome: None,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The slot allowed to guess, while a match is running.
    pub fn turn(&self) -> Option<PlayerSlot> {
        (self.phase == Phase::InProgress).then_some(self.turn)
    }

    pub fn attempts(&self, slot: PlayerSlot) -> u8 {
        self.attempts[slot.index()]
    }

    pub fn secret(&self, slot: PlayerSlot) -> Option<&Code> {
        self.secrets[slot.index()].as_ref()
    }

    pub fn player(&self, slot: PlayerSlot) -> Option<&Player> {
        self.players[slot.index()].as_ref()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Returns `true` if `identity` owns `slot`.
    pub fn is_seated(&self, slot: PlayerSlot, identity: &PlayerIdentity) -> bool {
        self.player(slot).is_some_and(|p| &p.identity == identity)
    }

    /// No slot has a live connection. Empty slots count as offline.
    pub fn all_offline(&self) -> bool {
        self.players.iter().flatten().all(|p| !p.online)
    }

    /// Seats a player, or reattaches a returning one.
    ///
    /// An empty slot is taken by anyone; `identity` is kept if given,
    /// otherwise a fresh one is issued. An occupied slot can only be
    /// reclaimed while its occupant is offline, and only with the
    /// occupant's identity.
    pub fn join(
        &mut self,
        slot: PlayerSlot,
        name: String,
        identity: Option<PlayerIdentity>,
    ) -> Result<(PlayerIdentity, Events), RoomError> {
        if self.phase.is_terminal() {
            return Err(RoomError::RoomGone(self.code.clone()));
        }

        if let Some(player) = &mut self.players[slot.index()] {
            if player.online || identity.as_ref() != Some(&player.identity) {
                return Err(RoomError::SlotTaken(slot));
            }
            player.online = true;
            if !name.is_empty() {
                player.name = name;
            }
            let identity = player.identity.clone();
            let events = self.rejoined(slot, &identity);
            return Ok((identity, events));
        }

        if self.phase != Phase::WaitingForPlayers {
            return Err(RoomError::WrongPhase(self.phase));
        }
        if identity
            .as_ref()
            .is_some_and(|id| self.is_seated(slot.opponent(), id))
        {
            return Err(RoomError::SlotTaken(slot.opponent()));
        }

        let identity = identity.unwrap_or_else(PlayerIdentity::generate);
        let joined = format!("👤 {name} joined as Player {slot}");
        self.players[slot.index()] = Some(Player::new(identity.clone(), name));
        if self.first_joined.is_none() {
            self.first_joined = Some(slot);
        }
        tracing::info!(room = %self.code, %slot, "player seated");

        let mut events = vec![
            (Recipient::Slot(slot), self.joined_event(slot, &identity)),
            (Recipient::All, msg(joined)),
            (Recipient::All, self.status()),
        ];
        if self.players.iter().all(Option::is_some) {
            self.advance(Phase::WaitingForSecrets);
            events.push((
                Recipient::All,
                msg("🎮 Both players are here. Lock in your secret code."),
            ));
        } else {
            events.push((
                Recipient::Slot(slot),
                msg("🔍 Waiting for another player..."),
            ));
        }
        Ok((identity, events))
    }

    /// Locks `slot`'s secret. Starts the match once both are locked.
    pub fn lock_secret(&mut self, slot: PlayerSlot, raw: &str) -> Result<Events, RoomError> {
        if self.phase != Phase::WaitingForSecrets {
            return Err(RoomError::WrongPhase(self.phase));
        }
        if self.secrets[slot.index()].is_some() {
            return Err(RoomError::AlreadyLocked);
        }
        let code = Code::parse(raw).map_err(|e| RoomError::InvalidCode(e.0))?;
        self.secrets[slot.index()] = Some(code);

        let both_locked = self.secrets.iter().all(Option::is_some);
        let mut events = vec![
            (
                Recipient::Slot(slot),
                msg(if both_locked {
                    "🔒 Secret locked."
                } else {
                    "🔒 Secret locked. Waiting for opponent..."
                }),
            ),
            (
                Recipient::AllExcept(slot),
                msg(format!("⏳ {} locked their secret", self.name(slot))),
            ),
        ];

        if both_locked {
            self.advance(Phase::InProgress);
            self.turn = self.first_joined.unwrap_or(PlayerSlot::First);
            events.push((Recipient::All, msg("🚀 GAME STARTED 🚀")));
            events.push((Recipient::All, ServerMessage::Turn { slot: self.turn }));
        }
        Ok(events)
    }

    /// Scores a guess from `slot` against its opponent's secret.
    pub fn submit_guess(&mut self, slot: PlayerSlot, raw: &str) -> Result<Events, RoomError> {
        if self.phase != Phase::InProgress {
            return Err(RoomError::WrongPhase(self.phase));
        }
        if self.turn != slot {
            return Err(RoomError::NotYourTurn(self.turn));
        }
        let guess = Code::parse(raw).map_err(|e| RoomError::InvalidGuess(e.0))?;
        if self.attempts[slot.index()] >= MAX_ATTEMPTS {
            return Err(RoomError::AttemptsExhausted);
        }
        let opponent = slot.opponent();
        let Some(secret) = self.secrets[opponent.index()] else {
            return Err(RoomError::WrongPhase(self.phase));
        };

        self.attempts[slot.index()] += 1;
        let attempt = self.attempts[slot.index()];
        let feedback = score(&secret, &guess);
        let mut events = vec![(
            Recipient::All,
            ServerMessage::Feedback {
                by: slot,
                guess: guess.to_string(),
                attempt,
                exact: feedback.exact,
                misplaced: feedback.misplaced,
            },
        )];

        if feedback.is_win() {
            self.finish(
                Outcome::Win {
                    winner: slot,
                    reason: WinReason::Cracked,
                },
                &mut events,
            );
            return Ok(events);
        }

        let exhausted = attempt >= MAX_ATTEMPTS;
        if exhausted {
            events.push((
                Recipient::All,
                msg(format!("❌ {} used all attempts", self.name(slot))),
            ));
        }

        let opponent_can_guess = self.attempts[opponent.index()] < MAX_ATTEMPTS;
        let next = match (opponent_can_guess, exhausted) {
            (true, _) => opponent,
            (false, false) => slot,
            (false, true) => {
                self.finish(Outcome::Draw, &mut events);
                return Ok(events);
            }
        };
        self.turn = next;
        events.push((Recipient::All, ServerMessage::Turn { slot: self.turn }));
        Ok(events)
    }

    /// The connection bound to `slot` went away.
    pub fn mark_offline(&mut self, slot: PlayerSlot) -> Events {
        match &mut self.players[slot.index()] {
            Some(player) if player.online => player.online = false,
            _ => return Vec::new(),
        }
        tracing::info!(room = %self.code, %slot, "player offline");
        vec![
            (Recipient::AllExcept(slot), msg("⚠️ A player went offline")),
            (Recipient::All, self.status()),
        ]
    }

    /// `slot` walked out on purpose.
    pub fn leave(&mut self, slot: PlayerSlot) -> (Departure, Events) {
        let name = self.name(slot).to_owned();
        match self.phase {
            Phase::WaitingForPlayers | Phase::WaitingForSecrets => {
                self.players[slot.index()] = None;
                let text = format!("🚪 {name} left. Room {} is closed.", self.code);
                (
                    Departure::Closed,
                    vec![(Recipient::AllExcept(slot), msg(text))],
                )
            }
            Phase::InProgress => {
                let mut events = vec![(Recipient::All, msg(format!("🚪 {name} left the match")))];
                self.finish(
                    Outcome::Win {
                        winner: slot.opponent(),
                        reason: WinReason::Forfeit,
                    },
                    &mut events,
                );
                (Departure::Forfeited, events)
            }
            Phase::GameOver => (Departure::Ignored, self.mark_offline(slot)),
        }
    }

    /// Presence of both slots as a `PlayerStatus` message.
    pub fn status(&self) -> ServerMessage {
        ServerMessage::PlayerStatus {
            a: self.presence(PlayerSlot::First),
            b: self.presence(PlayerSlot::Second),
        }
    }

    pub fn presence(&self, slot: PlayerSlot) -> Option<PlayerPresence> {
        self.player(slot).map(Player::presence)
    }

    fn rejoined(&self, slot: PlayerSlot, identity: &PlayerIdentity) -> Events {
        tracing::info!(room = %self.code, %slot, phase = %self.phase, "player reconnected");
        let mut events = vec![
            (Recipient::Slot(slot), self.joined_event(slot, identity)),
            (
                Recipient::All,
                msg(format!("🔌 {} is back as Player {slot}", self.name(slot))),
            ),
            (Recipient::All, self.status()),
        ];
        match self.phase {
            Phase::WaitingForSecrets if self.secrets[slot.index()].is_some() => {
                events.push((
                    Recipient::Slot(slot),
                    msg("🔒 Secret locked. Waiting for opponent..."),
                ));
            }
            Phase::WaitingForSecrets => {
                events.push((Recipient::Slot(slot), msg("Lock in your secret code.")));
            }
            Phase::InProgress => {
                events.push((Recipient::Slot(slot), ServerMessage::Turn { slot: self.turn }));
            }
            Phase::WaitingForPlayers | Phase::GameOver => {}
        }
        events
    }

    fn finish(&mut self, outcome: Outcome, events: &mut Events) {
        self.advance(Phase::GameOver);
        self.outcome = Some(outcome);

        let banner = match outcome {
            Outcome::Win { winner, .. } => format!("🏆 {} WINS THE GAME!", self.name(winner)),
            Outcome::Draw => "🤝 GAME OVER! NO WINNER".to_string(),
        };
        let reveal = |slot: PlayerSlot| self.secret(slot).map(Code::to_string).unwrap_or_default();

        events.push((Recipient::All, msg(banner)));
        events.push((
            Recipient::All,
            ServerMessage::RevealSecret {
                a: reveal(PlayerSlot::First),
                b: reveal(PlayerSlot::Second),
            },
        ));
        events.push((
            Recipient::All,
            ServerMessage::GameOver {
                winner: outcome.winner(),
                reason: outcome.reason().to_string(),
            },
        ));
        tracing::info!(room = %self.code, reason = outcome.reason(), "match over");
    }

    fn advance(&mut self, to: Phase) {
        debug_assert!(
            self.phase.can_transition_to(to),
            "illegal phase change {} -> {to}",
            self.phase
        );
        tracing::info!(room = %self.code, from = %self.phase, %to, "phase changed");
        self.phase = to;
    }

    fn joined_event(&self, slot: PlayerSlot, identity: &PlayerIdentity) -> ServerMessage {
        ServerMessage::Joined {
            room: self.code.clone(),
            slot,
            identity: identity.to_string(),
        }
    }

    fn name(&self, slot: PlayerSlot) -> &str {
        self.player(slot).map_or("Player", |p| p.name.as_str())
    }
}

fn msg(text: impl Into<String>) -> ServerMessage {
    ServerMessage::Msg { text: text.into() }
}
