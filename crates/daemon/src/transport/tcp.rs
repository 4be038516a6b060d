use async_trait::async_trait;
use nameplate_common::config::protocol::MAX_FRAME_SIZE;
use nameplate_common::{Location, NameplateError, Result};
use nameplate_core::transport::{Connector, Duplex, FrameReceiver, FrameSender, Listener};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tracing::debug;

/// Length-prefixed framing over a TCP stream
///
/// Each frame is a little-endian u32 byte count followed by the frame
/// bytes. An orderly remote close between frames surfaces as
/// `Ok(None)`; a close mid-frame is an error.
pub struct TcpFrameSender {
    write_half: OwnedWriteHalf,
}

pub struct TcpFrameReceiver {
    read_half: OwnedReadHalf,
}

#[async_trait]
impl FrameSender for TcpFrameSender {
    async fn send(&mut self, frame: Vec<u8>) -> Result<()> {
        if frame.len() > MAX_FRAME_SIZE {
            return Err(NameplateError::protocol(format!(
                "outgoing frame of {} bytes exceeds limit",
                frame.len()
            )));
        }

        self.write_half
            .write_all(&(frame.len() as u32).to_le_bytes())
            .await?;
        self.write_half.write_all(&frame).await?;
        Ok(())
    }
}

#[async_trait]
impl FrameReceiver for TcpFrameReceiver {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>> {
        let mut header = [0u8; 4];
        match self.read_half.read_exact(&mut header).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_le_bytes(header) as usize;
        if len > MAX_FRAME_SIZE {
            return Err(NameplateError::protocol(format!(
                "incoming frame of {len} bytes exceeds limit"
            )));
        }

        let mut frame = vec![0u8; len];
        self.read_half.read_exact(&mut frame).await?;
        Ok(Some(frame))
    }
}

fn split(stream: TcpStream) -> Duplex {
    let (read_half, write_half) = stream.into_split();
    (
        Box::new(TcpFrameSender { write_half }),
        Box::new(TcpFrameReceiver { read_half }),
    )
}

/// Connects directory sessions over TCP
#[derive(Debug, Clone, Default)]
pub struct TcpConnector;

impl TcpConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, location: &Location) -> Result<Duplex> {
        let addr = location.address().ok_or_else(|| {
            NameplateError::communication("cannot connect to the null location")
        })?;

        let stream = TcpStream::connect(addr).await.map_err(|e| {
            NameplateError::communication(format!("connect to {addr} failed: {e}"))
        })?;
        stream.set_nodelay(true)?;

        debug!("connected to {addr}");
        Ok(split(stream))
    }
}

/// Accepts directory sessions on a bound TCP socket
pub struct TcpSessionListener {
    listener: TcpListener,
}

impl TcpSessionListener {
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            NameplateError::communication(format!("bind to {addr} failed: {e}"))
        })?;

        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

#[async_trait]
impl Listener for TcpSessionListener {
    async fn accept(&mut self) -> Result<Duplex> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;

        debug!("accepted session from {peer}");
        Ok(split(stream))
    }
}
