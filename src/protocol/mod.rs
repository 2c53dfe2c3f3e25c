//! Text wire protocol: `TYPE` or `TYPE|p1|p2|...`, one message per
//! line-feed terminated line.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

pub mod dispatch;
pub mod frame;
pub mod request;

pub use dispatch::{DispatchError, Dispatcher};
pub use frame::{FrameDecoder, FrameError};
pub use request::Request;

pub const PARAM_DELIMITER: char = '|';
pub const LINE_TERMINATOR: u8 = b'\n';

macro_rules! message_types {
    ($($variant:ident => $wire:literal,)*) => {
        /// Every message type the client knows about.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum MessageType {
            $($variant,)*
        }

        impl MessageType {
            pub const ALL: &'static [MessageType] = &[$(MessageType::$variant,)*];

            /// Wire spelling of the type tag.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(MessageType::$variant => $wire,)*
                }
            }

            pub fn from_wire(tag: &str) -> Option<Self> {
                match tag {
                    $($wire => Some(MessageType::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

message_types! {
    NicknameSet => "NICKNAME_SET",
    Ack => "ACK",
    NicknameExists => "NICKNAME_EXISTS",
    Rejoin => "REJOIN",
    RoomCreate => "ROOM_CREATE",
    RoomCreated => "ROOM_CREATED",
    LimitRooms => "LIMIT_ROOMS",
    RoomJoin => "ROOM_JOIN",
    RoomNotExists => "ROOM_NOT_EXISTS",
    RoomFull => "ROOM_FULL",
    RoomLeave => "ROOM_LEAVE",
    OpponentRoomLeave => "OPPONENT_ROOM_LEAVE",
    BoardReady => "BOARD_READY",
    BoardIllegal => "BOARD_ILLEGAL",
    OpponentBoardReady => "OPPONENT_BOARD_READY",
    BoardState => "BOARD_STATE",
    TurnSet => "TURN_SET",
    Turn => "TURN",
    TurnResult => "TURN_RESULT",
    TurnIllegal => "TURN_ILLEGAL",
    TurnNotYou => "TURN_NOT_YOU",
    OpponentTurn => "OPPONENT_TURN",
    InvalidateField => "INVALIDATE_FIELD",
    GameEnd => "GAME_END",
    KeepAlive => "KEEP_ALIVE",
    OpponentNicknameSet => "OPPONENT_NICKNAME_SET",
    OpponentNoResponse => "OPPONENT_NO_RESPONSE",
    OpponentRejoin => "OPPONENT_REJOIN",
    ConnTerm => "CONN_TERM",
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while interpreting a received line.
///
/// None of these are fatal: the offending message is dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown message type: {0:?}")]
    UnknownType(String),
    #[error("{kind} expects {expected} parameter(s), got {actual}")]
    ParamCount {
        kind: MessageType,
        expected: usize,
        actual: usize,
    },
    #[error("invalid cell code: {0:?}")]
    BadCellCode(String),
    #[error("invalid cell state: {0:?}")]
    BadCellState(String),
    #[error("invalid owner: {0:?}")]
    BadOwner(String),
    #[error("invalid turn outcome: {0:?}")]
    BadOutcome(String),
    #[error("invalid rejoin scope: {0:?}")]
    BadScope(String),
    #[error("invalid no-response kind: {0:?}")]
    BadSilence(String),
    #[error("invalid room limit: {0:?}")]
    BadLimit(String),
    #[error("line is not valid UTF-8")]
    NotUtf8,
    #[error("unexpected {0} while awaiting a reply")]
    Unexpected(MessageType),
}

/// A decoded message: type tag plus ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    kind: MessageType,
    params: Vec<String>,
}

impl Message {
    pub fn new(kind: MessageType) -> Self {
        Self {
            kind,
            params: Vec::new(),
        }
    }

    pub fn with_params<I, S>(kind: MessageType, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    pub fn kind(&self) -> MessageType {
        self.kind
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Wire form including the trailing line terminator.
    pub fn encode(&self) -> String {
        let mut line = self.to_string();
        line.push(LINE_TERMINATOR as char);
        line
    }

    /// Decode one line, terminator already stripped.
    ///
    /// The type is everything before the first `|`; the remainder, if any,
    /// is split on `|` into parameters. A trailing carriage return is
    /// tolerated.
    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let (tag, rest) = match line.split_once(PARAM_DELIMITER) {
            Some((tag, rest)) => (tag, Some(rest)),
            None => (line, None),
        };
        let kind =
            MessageType::from_wire(tag).ok_or_else(|| ProtocolError::UnknownType(tag.to_string()))?;
        let params = rest
            .map(|rest| rest.split(PARAM_DELIMITER).map(str::to_string).collect())
            .unwrap_or_default();
        Ok(Self { kind, params })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.as_str())?;
        for param in &self.params {
            write!(f, "{}{}", PARAM_DELIMITER, param)?;
        }
        Ok(())
    }
}

/// `true` when `text` can travel as a single parameter unescaped.
pub fn is_wire_safe(text: &str) -> bool {
    !text.contains([PARAM_DELIMITER, '\n', '\r'])
}

/// Fail unless exactly `expected` parameters were received.
pub fn expect_params(
    kind: MessageType,
    params: &[String],
    expected: usize,
) -> Result<(), ProtocolError> {
    if params.len() == expected {
        Ok(())
    } else {
        Err(ProtocolError::ParamCount {
            kind,
            expected,
            actual: params.len(),
        })
    }
}

/// Which side of the table a message refers to (`YOU` / `OPPONENT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Party {
    Player,
    Opponent,
}

impl Party {
    pub fn from_token(token: &str) -> Result<Self, ProtocolError> {
        match token {
            "YOU" => Ok(Party::Player),
            "OPPONENT" => Ok(Party::Opponent),
            other => Err(ProtocolError::BadOwner(other.to_string())),
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Party::Player => "YOU",
            Party::Opponent => "OPPONENT",
        }
    }
}

/// Result of a single turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Hit,
    Miss,
}

impl Outcome {
    pub fn from_token(token: &str) -> Result<Self, ProtocolError> {
        match token {
            "HIT" => Ok(Outcome::Hit),
            "MISS" => Ok(Outcome::Miss),
            other => Err(ProtocolError::BadOutcome(other.to_string())),
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Outcome::Hit => "HIT",
            Outcome::Miss => "MISS",
        }
    }
}

/// How far a `REJOIN` restores the previous session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejoinScope {
    Room,
    Game,
}

impl RejoinScope {
    pub fn from_token(token: &str) -> Result<Self, ProtocolError> {
        match token {
            "ROOM" => Ok(RejoinScope::Room),
            "GAME" => Ok(RejoinScope::Game),
            other => Err(ProtocolError::BadScope(other.to_string())),
        }
    }
}

/// Severity of an `OPPONENT_NO_RESPONSE` notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Silence {
    /// Opponent is late but may come back.
    Short,
    /// Opponent has been dropped and the room is gone.
    Long,
}

impl Silence {
    pub fn from_token(token: &str) -> Result<Self, ProtocolError> {
        match token {
            "SHORT" => Ok(Silence::Short),
            "LONG" => Ok(Silence::Long),
            other => Err(ProtocolError::BadSilence(other.to_string())),
        }
    }
}
