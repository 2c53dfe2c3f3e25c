use std::io::ErrorKind;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::{timeout, Duration};

use crate::protocol::Message;
use crate::transport::Transport;

/// Default timeout for a single write (30 seconds).
const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for establishing the connection (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const READ_CHUNK: usize = 4096;

fn io_error(e: std::io::Error, op: &str) -> anyhow::Error {
    match e.kind() {
        ErrorKind::UnexpectedEof | ErrorKind::BrokenPipe => {
            anyhow::anyhow!("Connection closed by peer")
        }
        ErrorKind::ConnectionReset => anyhow::anyhow!("Connection reset by peer"),
        _ => anyhow::anyhow!("{} error: {}", op, e),
    }
}

pub struct TcpTransport {
    stream: TcpStream,
    send_timeout: Duration,
    buf: Box<[u8]>,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self::with_timeout(stream, DEFAULT_SEND_TIMEOUT)
    }

    pub fn with_timeout(stream: TcpStream, send_timeout: Duration) -> Self {
        Self {
            stream,
            send_timeout,
            buf: vec![0u8; READ_CHUNK].into_boxed_slice(),
        }
    }

    pub async fn connect<A: ToSocketAddrs>(addr: A) -> anyhow::Result<Self> {
        Self::connect_with_timeout(addr, DEFAULT_CONNECT_TIMEOUT).await
    }

    pub async fn connect_with_timeout<A: ToSocketAddrs>(
        addr: A,
        connect_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let stream = timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| anyhow::anyhow!("Connect timeout after {:?}", connect_timeout))?
            .map_err(|e| anyhow::anyhow!("Connect error: {}", e))?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }

    pub fn set_send_timeout(&mut self, send_timeout: Duration) {
        self.send_timeout = send_timeout;
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, msg: &Message) -> anyhow::Result<()> {
        let line = msg.encode();
        log::trace!("Sending: {}", msg);
        timeout(self.send_timeout, self.stream.write_all(line.as_bytes()))
            .await
            .map_err(|_| anyhow::anyhow!("Send timeout after {:?}", self.send_timeout))?
            .map_err(|e| io_error(e, "Write"))
    }

    async fn recv(&mut self) -> anyhow::Result<Vec<u8>> {
        // `read` is cancel-safe: nothing is consumed unless it returns.
        let n = self
            .stream
            .read(&mut self.buf)
            .await
            .map_err(|e| io_error(e, "Read"))?;
        if n == 0 {
            return Err(anyhow::anyhow!("Connection closed by peer"));
        }
        Ok(self.buf[..n].to_vec())
    }
}
