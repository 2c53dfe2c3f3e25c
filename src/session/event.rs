use alloc::string::String;

use super::Stage;
use crate::board::{Board, Coord};
use crate::fleet::PlacementError;
use crate::protocol::{MessageType, Outcome, Party, RejoinScope, Silence};

/// Everything that can move the session forward, decoded from the wire or
/// raised by the connection itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // Replies to our own requests.
    HandshakeAccepted {
        nickname: String,
    },
    NicknameTaken,
    Rejoined {
        nickname: String,
        scope: RejoinScope,
        room_code: String,
    },
    /// Room created by us or joined by code.
    RoomEntered {
        room_code: String,
    },
    RoomLimitReached {
        limit: u32,
    },
    RoomNotFound,
    RoomFull,
    RoomLeft,
    BoardAccepted {
        board: Board,
    },
    BoardRejected,
    TurnResolved {
        coord: Coord,
        outcome: Outcome,
    },
    TurnRejected,
    /// A reply of an expected type arrived but could not be read. Carries
    /// the type of the request it answered.
    ReplyUnreadable {
        request: MessageType,
    },

    // Unsolicited pushes.
    OpponentLeft,
    OpponentReady,
    OpponentNickname {
        nickname: String,
    },
    BoardState {
        owner: Party,
        board: Board,
    },
    TurnSet {
        owner: Party,
    },
    OpponentTurn {
        coord: Coord,
        outcome: Outcome,
    },
    FieldInvalidated {
        owner: Party,
        coord: Coord,
    },
    GameEnded {
        winner: Party,
    },
    OpponentSilent(Silence),
    OpponentRejoined,
    KeepAlive,
    /// The server announced it is dropping us.
    Terminated,

    ConnectionClosed,
}

/// Side effects requested by a transition, for the embedding application to
/// carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    StageChanged { from: Stage, to: Stage },
    Sound(Sound),
    Notice(Notice),
}

impl Effect {
    /// Whether this is the session leaving a room for the lobby.
    pub fn is_lobby_return(&self) -> bool {
        matches!(
            self,
            Effect::StageChanged {
                from: Stage::InRoom | Stage::InGame,
                to: Stage::Lobby,
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    Hit,
    Miss,
    Win,
    Lose,
}

impl Sound {
    pub(crate) fn for_outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Hit => Sound::Hit,
            Outcome::Miss => Sound::Miss,
        }
    }
}

/// Something the player should be told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    NicknameTaken,
    RoomNotFound,
    RoomFull,
    RoomLimit(u32),
    OpponentLeft,
    OpponentUnresponsive,
    OpponentRejoined,
    BoardRejected,
    TurnRejected,
    UnreadableReply,
    ConnectionLost,
}

/// A user intent refused locally; nothing was sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Declined {
    #[error("not possible in stage {actual:?} (needs one of {expected:?})")]
    WrongStage {
        expected: &'static [Stage],
        actual: Stage,
    },
    #[error("it is not your turn")]
    NotOnTurn,
    #[error("a turn is already awaiting its result")]
    TurnInFlight,
    #[error("the round is over")]
    RoundOver,
    #[error("the round is still being played")]
    RoundInProgress,
    #[error("cell {0} has already been resolved")]
    NotTargetable(Coord),
    #[error("illegal placement: {0}")]
    IllegalPlacement(PlacementError),
    #[error("board already declared")]
    AlreadyReady,
    #[error("nickname must be non-empty and must not contain '|' or line breaks")]
    InvalidNickname,
    #[error("room code must be non-empty and must not contain '|' or line breaks")]
    InvalidRoomCode,
    #[error("still awaiting a reply of type {0}")]
    RequestPending(MessageType),
    #[error("not connected")]
    Disconnected,
}
