//! Decoding of inbound messages into session events.

use alloc::string::{String, ToString};

use super::{Declined, Event};
use crate::board::{Board, Cell, Coord};
use crate::config::BOARD_CELLS;
use crate::protocol::{
    expect_params, DispatchError, Dispatcher, MessageType, Outcome, Party, ProtocolError,
    RejoinScope, Request, Silence,
};

use MessageType as T;

fn cell_code(code: &str) -> Result<Coord, ProtocolError> {
    Coord::from_code(code).ok_or_else(|| ProtocolError::BadCellCode(code.to_string()))
}

fn board_snapshot(tokens: &[String]) -> Result<Board, ProtocolError> {
    let mut cells = [Cell::Empty; BOARD_CELLS];
    for (cell, token) in cells.iter_mut().zip(tokens) {
        *cell = Cell::from_token(token).ok_or_else(|| ProtocolError::BadCellState(token.clone()))?;
    }
    Ok(Board::from_cells(cells))
}

/// Install the persistent handlers for every unsolicited message type.
pub fn register_pushes(dispatcher: &mut Dispatcher<Event>) {
    dispatcher.on(T::OpponentRoomLeave, |p| {
        expect_params(T::OpponentRoomLeave, p, 0)?;
        Ok(Event::OpponentLeft)
    });
    dispatcher.on(T::OpponentBoardReady, |p| {
        expect_params(T::OpponentBoardReady, p, 0)?;
        Ok(Event::OpponentReady)
    });
    dispatcher.on(T::OpponentNicknameSet, |p| {
        expect_params(T::OpponentNicknameSet, p, 1)?;
        Ok(Event::OpponentNickname {
            nickname: p[0].clone(),
        })
    });
    dispatcher.on(T::BoardState, |p| {
        expect_params(T::BoardState, p, BOARD_CELLS + 1)?;
        Ok(Event::BoardState {
            owner: Party::from_token(&p[0])?,
            board: board_snapshot(&p[1..])?,
        })
    });
    dispatcher.on(T::TurnSet, |p| {
        expect_params(T::TurnSet, p, 1)?;
        Ok(Event::TurnSet {
            owner: Party::from_token(&p[0])?,
        })
    });
    dispatcher.on(T::OpponentTurn, |p| {
        expect_params(T::OpponentTurn, p, 2)?;
        Ok(Event::OpponentTurn {
            coord: cell_code(&p[0])?,
            outcome: Outcome::from_token(&p[1])?,
        })
    });
    dispatcher.on(T::InvalidateField, |p| {
        expect_params(T::InvalidateField, p, 2)?;
        Ok(Event::FieldInvalidated {
            owner: Party::from_token(&p[0])?,
            coord: cell_code(&p[1])?,
        })
    });
    dispatcher.on(T::GameEnd, |p| {
        expect_params(T::GameEnd, p, 1)?;
        Ok(Event::GameEnded {
            winner: Party::from_token(&p[0])?,
        })
    });
    dispatcher.on(T::OpponentNoResponse, |p| {
        expect_params(T::OpponentNoResponse, p, 1)?;
        Ok(Event::OpponentSilent(Silence::from_token(&p[0])?))
    });
    dispatcher.on(T::OpponentRejoin, |p| {
        expect_params(T::OpponentRejoin, p, 0)?;
        Ok(Event::OpponentRejoined)
    });
    dispatcher.on(T::ConnTerm, |_| Ok(Event::Terminated));
    dispatcher.on(T::KeepAlive, |_| Ok(Event::KeepAlive));
}

/// Interpret `kind` as the reply to `request`.
pub fn correlate(request: &Request, kind: MessageType, p: &[String]) -> Result<Event, ProtocolError> {
    match (request, kind) {
        (Request::SetNickname(nickname), T::Ack) => {
            expect_params(kind, p, 0)?;
            Ok(Event::HandshakeAccepted {
                nickname: nickname.clone(),
            })
        }
        (Request::SetNickname(_), T::NicknameExists) => {
            expect_params(kind, p, 0)?;
            Ok(Event::NicknameTaken)
        }
        (Request::SetNickname(nickname), T::Rejoin) => {
            expect_params(kind, p, 2)?;
            Ok(Event::Rejoined {
                nickname: nickname.clone(),
                scope: RejoinScope::from_token(&p[0])?,
                room_code: p[1].clone(),
            })
        }
        (Request::CreateRoom, T::RoomCreated) => {
            expect_params(kind, p, 1)?;
            Ok(Event::RoomEntered {
                room_code: p[0].clone(),
            })
        }
        (Request::CreateRoom, T::LimitRooms) => {
            expect_params(kind, p, 1)?;
            let limit = p[0]
                .parse()
                .map_err(|_| ProtocolError::BadLimit(p[0].clone()))?;
            Ok(Event::RoomLimitReached { limit })
        }
        (Request::JoinRoom(room_code), T::Ack) => {
            expect_params(kind, p, 0)?;
            Ok(Event::RoomEntered {
                room_code: room_code.clone(),
            })
        }
        (Request::JoinRoom(_), T::RoomNotExists) => Ok(Event::RoomNotFound),
        (Request::JoinRoom(_), T::RoomFull) => Ok(Event::RoomFull),
        (Request::LeaveRoom, T::Ack) => Ok(Event::RoomLeft),
        (Request::BoardReady(board), T::Ack) => {
            expect_params(kind, p, 0)?;
            Ok(Event::BoardAccepted { board: *board })
        }
        (Request::BoardReady(_), T::BoardIllegal) => Ok(Event::BoardRejected),
        (Request::Turn(coord), T::TurnResult) => {
            // The first parameter repeats whose turn it was.
            expect_params(kind, p, 2)?;
            Ok(Event::TurnResolved {
                coord: *coord,
                outcome: Outcome::from_token(&p[1])?,
            })
        }
        (Request::Turn(_), T::TurnIllegal | T::TurnNotYou) => Ok(Event::TurnRejected),
        _ => Err(ProtocolError::Unexpected(kind)),
    }
}

/// Register the one-shot that will turn the reply to `request` into an
/// event. Requests without a reply register nothing.
pub fn await_reply(dispatcher: &mut Dispatcher<Event>, request: &Request) -> Result<(), Declined> {
    let replies = request.replies();
    if replies.is_empty() {
        return Ok(());
    }
    let pending = request.clone();
    dispatcher
        .expect(replies, move |kind, params| {
            // The waiter is gone once it fires, so a bad reply must still
            // release the request.
            correlate(&pending, kind, params).or_else(|e| {
                log::warn!("Unreadable {} reply to {}: {}", kind, pending.kind(), e);
                Ok(Event::ReplyUnreadable {
                    request: pending.kind(),
                })
            })
        })
        .map_err(|e| match e {
            DispatchError::AlreadyAwaiting(kind) => Declined::RequestPending(kind),
            DispatchError::NothingToAwait => Declined::RequestPending(request.kind()),
        })
}
