use tokio::sync::mpsc;

use crate::protocol::Message;
use crate::transport::Transport;

/// One end of an in-process byte pipe.
pub struct InMemoryTransport {
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl InMemoryTransport {
    pub fn pair() -> (Self, Self) {
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        (
            Self {
                tx: Some(tx1),
                rx: rx2,
            },
            Self {
                tx: Some(tx2),
                rx: rx1,
            },
        )
    }

    /// Push raw bytes to the peer, bypassing message encoding.
    pub fn send_bytes(&mut self, bytes: impl Into<Vec<u8>>) -> anyhow::Result<()> {
        self.tx
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Transport is closed"))?
            .send(bytes.into())
            .map_err(|_| anyhow::anyhow!("Connection closed by peer"))
    }

    /// Stop sending; the peer's `recv` fails once it has drained what was
    /// already sent.
    pub fn close(&mut self) {
        self.tx = None;
    }
}

#[async_trait::async_trait]
impl Transport for InMemoryTransport {
    async fn send(&mut self, msg: &Message) -> anyhow::Result<()> {
        log::trace!("Sending: {}", msg);
        self.send_bytes(msg.encode())
    }

    async fn recv(&mut self) -> anyhow::Result<Vec<u8>> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| anyhow::anyhow!("Connection closed by peer"))
    }
}
