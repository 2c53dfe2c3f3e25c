#![cfg(feature = "std")]

use crate::protocol::Message;

/// A byte stream carrying protocol lines.
///
/// `recv` hands back whatever arrived next, with no regard for line
/// boundaries, and must be cancel-safe: the client races it against timers
/// and commands.
#[async_trait::async_trait]
pub trait Transport: Send {
    async fn send(&mut self, msg: &Message) -> anyhow::Result<()>;
    async fn recv(&mut self) -> anyhow::Result<Vec<u8>>;
}

pub mod in_memory;
pub mod keep_alive;
pub mod tcp;

pub use in_memory::InMemoryTransport;
pub use keep_alive::KeepAlive;
pub use tcp::TcpTransport;
