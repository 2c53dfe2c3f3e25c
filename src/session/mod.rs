//! Turn/room state machine.
//!
//! [`Session`] owns the room aggregate. Inbound traffic arrives as
//! [`Event`]s through [`Session::apply`], which returns the [`Effect`]s the
//! transition asks for. User intents are checked against the current state
//! and either produce the [`Request`] to send or a [`Declined`] reason.

use alloc::string::String;
use alloc::vec::Vec;

pub mod event;
pub mod inbound;

pub use event::{Declined, Effect, Event, Notice, Sound};

use crate::board::{Board, Cell, Coord};
use crate::fleet::{check_placement, is_targetable};
use crate::protocol::{is_wire_safe, MessageType, Outcome, Party, RejoinScope, Request, Silence};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Stage {
    #[default]
    Connect,
    Lobby,
    InRoom,
    InGame,
}

/// One player's half of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideState {
    pub nickname: String,
    pub board: Board,
    pub ready: bool,
    pub on_turn: bool,
    /// Cleared while the server reports this side as unresponsive.
    pub responding: bool,
}

impl Default for SideState {
    fn default() -> Self {
        Self {
            nickname: String::new(),
            board: Board::new(),
            ready: false,
            on_turn: false,
            responding: true,
        }
    }
}

/// The most recently resolved turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastTurn {
    pub by: Party,
    pub coord: Coord,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoomState {
    pub room_code: Option<String>,
    pub stage: Stage,
    pub turn_in_flight: bool,
    pub last_turn: Option<LastTurn>,
    pub winner: Option<Party>,
    pub player: SideState,
    pub opponent: SideState,
}

impl RoomState {
    pub fn side_mut(&mut self, party: Party) -> &mut SideState {
        match party {
            Party::Player => &mut self.player,
            Party::Opponent => &mut self.opponent,
        }
    }
}

const IN_ROOM_OR_GAME: &[Stage] = &[Stage::InRoom, Stage::InGame];

#[derive(Debug, Clone, Default)]
pub struct Session {
    state: RoomState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RoomState {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    /// Apply one event and report the effects it calls for.
    pub fn apply(&mut self, event: Event) -> Vec<Effect> {
        let from = self.state.stage;
        let mut effects = Vec::new();

        if from == Stage::Connect && !Self::applies_before_handshake(&event) {
            log::debug!("Ignoring {:?} before handshake", event);
            return effects;
        }

        let state = &mut self.state;
        match event {
            Event::HandshakeAccepted { nickname } => {
                if from == Stage::Connect {
                    state.player.nickname = nickname;
                    state.stage = Stage::Lobby;
                }
            }
            Event::Rejoined {
                nickname,
                scope,
                room_code,
            } => {
                if from == Stage::Connect {
                    state.player.nickname = nickname;
                    state.room_code = Some(room_code);
                    state.stage = match scope {
                        RejoinScope::Room => Stage::InRoom,
                        RejoinScope::Game => Stage::InGame,
                    };
                }
            }
            Event::NicknameTaken => effects.push(Effect::Notice(Notice::NicknameTaken)),
            Event::RoomEntered { room_code } => {
                if from == Stage::Lobby {
                    state.room_code = Some(room_code);
                    state.opponent = SideState::default();
                    state.stage = Stage::InRoom;
                }
            }
            Event::RoomLimitReached { limit } => {
                effects.push(Effect::Notice(Notice::RoomLimit(limit)));
            }
            Event::RoomNotFound => effects.push(Effect::Notice(Notice::RoomNotFound)),
            Event::RoomFull => effects.push(Effect::Notice(Notice::RoomFull)),
            Event::RoomLeft => {
                if IN_ROOM_OR_GAME.contains(&from) {
                    self.return_to_lobby();
                }
            }
            Event::OpponentLeft | Event::OpponentSilent(Silence::Long) => {
                if IN_ROOM_OR_GAME.contains(&from) {
                    self.return_to_lobby();
                    effects.push(Effect::Notice(Notice::OpponentLeft));
                }
            }
            Event::BoardAccepted { board } => {
                if from == Stage::InRoom {
                    state.player.board = board;
                    state.player.ready = true;
                    state.opponent.board.clear();
                    state.winner = None;
                    state.last_turn = None;
                    state.stage = Stage::InGame;
                }
            }
            Event::BoardRejected => effects.push(Effect::Notice(Notice::BoardRejected)),
            Event::OpponentReady => {
                if IN_ROOM_OR_GAME.contains(&from) {
                    state.opponent.ready = true;
                }
            }
            Event::OpponentNickname { nickname } => {
                if IN_ROOM_OR_GAME.contains(&from) {
                    state.opponent.nickname = nickname;
                }
            }
            Event::BoardState { owner, board } => {
                let side = state.side_mut(owner);
                side.board = board;
                side.ready = true;
                state.stage = Stage::InGame;
            }
            Event::TurnSet { owner } => {
                if from == Stage::InGame && state.winner.is_none() {
                    state.player.on_turn = owner == Party::Player;
                    state.opponent.on_turn = owner == Party::Opponent;
                }
            }
            Event::TurnResolved { coord, outcome } => {
                if from == Stage::InGame && state.turn_in_flight {
                    state.turn_in_flight = false;
                    state.opponent.board.set(coord, outcome_cell(outcome));
                    state.last_turn = Some(LastTurn {
                        by: Party::Player,
                        coord,
                    });
                    effects.push(Effect::Sound(Sound::for_outcome(outcome)));
                }
            }
            Event::TurnRejected => {
                state.turn_in_flight = false;
                effects.push(Effect::Notice(Notice::TurnRejected));
            }
            Event::ReplyUnreadable { request } => {
                if request == MessageType::Turn {
                    state.turn_in_flight = false;
                }
                effects.push(Effect::Notice(Notice::UnreadableReply));
            }
            Event::OpponentTurn { coord, outcome } => {
                if from == Stage::InGame {
                    state.player.board.set(coord, outcome_cell(outcome));
                    state.last_turn = Some(LastTurn {
                        by: Party::Opponent,
                        coord,
                    });
                    effects.push(Effect::Sound(Sound::for_outcome(outcome)));
                }
            }
            Event::FieldInvalidated { owner, coord } => {
                state.side_mut(owner).board.set(coord, Cell::Invalidated);
            }
            Event::GameEnded { winner } => {
                if from == Stage::InGame {
                    state.winner = Some(winner);
                    for side in [&mut state.player, &mut state.opponent] {
                        side.on_turn = false;
                        side.ready = false;
                    }
                    effects.push(Effect::Sound(match winner {
                        Party::Player => Sound::Win,
                        Party::Opponent => Sound::Lose,
                    }));
                }
            }
            Event::OpponentSilent(Silence::Short) => {
                state.opponent.responding = false;
                effects.push(Effect::Notice(Notice::OpponentUnresponsive));
            }
            Event::OpponentRejoined => {
                state.opponent.responding = true;
                effects.push(Effect::Notice(Notice::OpponentRejoined));
            }
            Event::KeepAlive | Event::Terminated => {}
            Event::ConnectionClosed => {
                self.state = RoomState::default();
                effects.push(Effect::Notice(Notice::ConnectionLost));
            }
        }

        let to = self.state.stage;
        if to != from {
            log::info!("Stage {:?} -> {:?}", from, to);
            effects.insert(0, Effect::StageChanged { from, to });
        }
        effects
    }

    /// Replies to the handshake and connection loss are the only events with
    /// meaning while no aggregate exists.
    fn applies_before_handshake(event: &Event) -> bool {
        matches!(
            event,
            Event::HandshakeAccepted { .. }
                | Event::Rejoined { .. }
                | Event::NicknameTaken
                | Event::Terminated
                | Event::ConnectionClosed
        )
    }

    /// Everything but our nickname goes back to its initial value.
    fn return_to_lobby(&mut self) {
        let nickname = core::mem::take(&mut self.state.player.nickname);
        self.state = RoomState::default();
        self.state.player.nickname = nickname;
        self.state.stage = Stage::Lobby;
    }

    fn require(&self, expected: &'static [Stage]) -> Result<(), Declined> {
        if expected.contains(&self.state.stage) {
            Ok(())
        } else {
            Err(Declined::WrongStage {
                expected,
                actual: self.state.stage,
            })
        }
    }

    pub fn handshake(&self, nickname: &str) -> Result<Request, Declined> {
        self.require(&[Stage::Connect])?;
        if nickname.is_empty() || !is_wire_safe(nickname) {
            return Err(Declined::InvalidNickname);
        }
        Ok(Request::SetNickname(nickname.into()))
    }

    pub fn create_room(&self) -> Result<Request, Declined> {
        self.require(&[Stage::Lobby])?;
        Ok(Request::CreateRoom)
    }

    pub fn join_room(&self, room_code: &str) -> Result<Request, Declined> {
        self.require(&[Stage::Lobby])?;
        if room_code.is_empty() || !is_wire_safe(room_code) {
            return Err(Declined::InvalidRoomCode);
        }
        Ok(Request::JoinRoom(room_code.into()))
    }

    pub fn leave_room(&self) -> Result<Request, Declined> {
        self.require(IN_ROOM_OR_GAME)?;
        Ok(Request::LeaveRoom)
    }

    /// Declare our fleet. The placement must pass the validator; the board
    /// is only adopted once the server accepts it.
    pub fn declare_ready(&self, board: &Board) -> Result<Request, Declined> {
        self.require(&[Stage::InRoom])?;
        if self.state.player.ready {
            return Err(Declined::AlreadyReady);
        }
        check_placement(board).map_err(Declined::IllegalPlacement)?;
        Ok(Request::BoardReady(*board))
    }

    /// Fire at `coord` on the opponent board.
    ///
    /// On success the turn is in flight until its result (or a rejection)
    /// arrives; every further call is declined meanwhile.
    pub fn fire(&mut self, coord: Coord) -> Result<Request, Declined> {
        self.require(&[Stage::InGame])?;
        let state = &self.state;
        if state.winner.is_some() {
            return Err(Declined::RoundOver);
        }
        if state.turn_in_flight {
            return Err(Declined::TurnInFlight);
        }
        if !state.player.on_turn {
            return Err(Declined::NotOnTurn);
        }
        if !is_targetable(&state.opponent.board, coord) {
            return Err(Declined::NotTargetable(coord));
        }
        self.state.turn_in_flight = true;
        Ok(Request::Turn(coord))
    }

    /// Undo the local bookkeeping of a request that could not be issued.
    pub fn abandon(&mut self, request: &Request) {
        if let Request::Turn(_) = request {
            self.state.turn_in_flight = false;
        }
    }

    /// Start over in the same room once a round has a winner.
    pub fn new_game(&mut self) -> Result<Vec<Effect>, Declined> {
        self.require(&[Stage::InGame])?;
        if self.state.winner.is_none() {
            return Err(Declined::RoundInProgress);
        }
        let state = &mut self.state;
        state.winner = None;
        state.last_turn = None;
        state.player.board.clear();
        state.player.ready = false;
        state.opponent.board.clear();
        state.stage = Stage::InRoom;
        log::info!("Stage {:?} -> {:?}", Stage::InGame, Stage::InRoom);
        Ok(alloc::vec![Effect::StageChanged {
            from: Stage::InGame,
            to: Stage::InRoom,
        }])
    }
}

fn outcome_cell(outcome: Outcome) -> Cell {
    match outcome {
        Outcome::Hit => Cell::Hit,
        Outcome::Miss => Cell::Miss,
    }
}
