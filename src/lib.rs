#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod board;
#[cfg(feature = "std")]
pub mod client;
pub mod config;
pub mod fleet;
#[cfg(feature = "std")]
pub mod logging;
pub mod protocol;
pub mod session;
#[cfg(feature = "std")]
pub mod transport;

pub use board::{Board, BoardError, Cell, Coord};
#[cfg(feature = "std")]
pub use client::{Client, ClientHandle, Exit, Intent};
pub use config::*;
pub use fleet::{check_placement, is_placement_legal, is_targetable, random_fleet, PlacementError};
#[cfg(feature = "std")]
pub use logging::init_logging;
pub use protocol::{
    DispatchError, Dispatcher, FrameDecoder, FrameError, Message, MessageType, Outcome, Party,
    ProtocolError, Request,
};
pub use session::{Declined, Effect, Event, Notice, RoomState, SideState, Session, Sound, Stage};
#[cfg(feature = "std")]
pub use transport::{InMemoryTransport, KeepAlive, TcpTransport, Transport};
