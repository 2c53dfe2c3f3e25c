use alloc::string::String;
use alloc::vec::Vec;

use super::{Message, MessageType};
use crate::board::{Board, Coord};

/// Client-to-server requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    SetNickname(String),
    CreateRoom,
    JoinRoom(String),
    LeaveRoom,
    /// Fleet declaration; every `SHIP` cell is sent as a cell code.
    BoardReady(Board),
    Turn(Coord),
    KeepAlive,
}

use MessageType as T;

impl Request {
    pub fn kind(&self) -> MessageType {
        match self {
            Request::SetNickname(_) => T::NicknameSet,
            Request::CreateRoom => T::RoomCreate,
            Request::JoinRoom(_) => T::RoomJoin,
            Request::LeaveRoom => T::RoomLeave,
            Request::BoardReady(_) => T::BoardReady,
            Request::Turn(_) => T::Turn,
            Request::KeepAlive => T::KeepAlive,
        }
    }

    pub fn to_message(&self) -> Message {
        let params: Vec<String> = match self {
            Request::SetNickname(nickname) => alloc::vec![nickname.clone()],
            Request::JoinRoom(code) => alloc::vec![code.clone()],
            Request::BoardReady(board) => board.ship_coords().map(Coord::code).collect(),
            Request::Turn(coord) => alloc::vec![coord.code()],
            Request::CreateRoom | Request::LeaveRoom | Request::KeepAlive => Vec::new(),
        };
        Message::with_params(self.kind(), params)
    }

    /// Message types that may answer this request. Empty when no reply is
    /// expected.
    pub fn replies(&self) -> &'static [MessageType] {
        match self {
            Request::SetNickname(_) => &[T::Ack, T::NicknameExists, T::Rejoin],
            Request::CreateRoom => &[T::RoomCreated, T::LimitRooms],
            Request::JoinRoom(_) => &[T::Ack, T::RoomNotExists, T::RoomFull],
            Request::LeaveRoom => &[T::Ack],
            Request::BoardReady(_) => &[T::Ack, T::BoardIllegal],
            Request::Turn(_) => &[T::TurnResult, T::TurnIllegal, T::TurnNotYou],
            Request::KeepAlive => &[],
        }
    }
}
