//! In-process frame transport over tokio channels

use super::{Connector, Duplex, EndpointFactory, FrameReceiver, FrameSender, Listener};
use async_trait::async_trait;
use nameplate_common::{ChannelLocation, Location, NameplateError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

const SESSION_BUFFER: usize = 64;

/// An in-process network: sessions and endpoints addressed by location
///
/// Cloning yields a handle to the same network.
#[derive(Clone)]
pub struct MemoryNetwork {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    /// Session acceptors by transport address
    listeners: Mutex<HashMap<String, mpsc::Sender<Duplex>>>,

    /// One-way endpoint receive ends by location text
    endpoints: Mutex<HashMap<String, mpsc::Sender<Vec<u8>>>>,

    /// Local address and channel index allocator
    next_index: AtomicU32,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                listeners: Mutex::new(HashMap::new()),
                endpoints: Mutex::new(HashMap::new()),
                next_index: AtomicU32::new(1),
            }),
        }
    }

    /// Start listening for sessions at a transport address
    pub fn listen(&self, address: impl Into<String>) -> MemoryListener {
        let (tx, rx) = mpsc::channel(SESSION_BUFFER);
        self.inner
            .listeners
            .lock()
            .expect("listener table poisoned")
            .insert(address.into(), tx);
        MemoryListener { incoming: rx }
    }

    fn fresh_index(&self) -> u32 {
        self.inner.next_index.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MemoryNetwork {
    async fn connect(&self, location: &Location) -> Result<Duplex> {
        let address = location
            .address()
            .ok_or_else(|| NameplateError::communication("cannot connect to a null location"))?;

        let acceptor = {
            let listeners = self
                .inner
                .listeners
                .lock()
                .expect("listener table poisoned");
            listeners.get(address).cloned()
        }
        .ok_or_else(|| {
            NameplateError::communication(format!("no listener at {address}"))
        })?;

        let (client_tx, server_rx) = mpsc::channel(SESSION_BUFFER);
        let (server_tx, client_rx) = mpsc::channel(SESSION_BUFFER);

        let server_side: Duplex = (
            Box::new(MemorySender { tx: server_tx }),
            Box::new(MemoryReceiver { rx: server_rx }),
        );
        acceptor
            .send(server_side)
            .await
            .map_err(|_| NameplateError::communication(format!("listener at {address} closed")))?;

        Ok((
            Box::new(MemorySender { tx: client_tx }),
            Box::new(MemoryReceiver { rx: client_rx }),
        ))
    }
}

#[async_trait]
impl EndpointFactory for MemoryNetwork {
    async fn create_input(&self) -> Result<(Location, Box<dyn FrameReceiver>)> {
        let index = self.fresh_index();
        let location = Location::Channel(ChannelLocation::new("mem:local", index));

        let (tx, rx) = mpsc::channel(SESSION_BUFFER);
        self.inner
            .endpoints
            .lock()
            .expect("endpoint table poisoned")
            .insert(location.to_string(), tx);

        Ok((location, Box::new(MemoryReceiver { rx })))
    }

    async fn open_output(&self, location: &Location) -> Result<Box<dyn FrameSender>> {
        let tx = {
            let endpoints = self
                .inner
                .endpoints
                .lock()
                .expect("endpoint table poisoned");
            endpoints.get(&location.to_string()).cloned()
        }
        .ok_or_else(|| {
            NameplateError::communication(format!("no input endpoint at {location}"))
        })?;

        Ok(Box::new(MemorySender { tx }))
    }
}

/// Accept side of a memory listening address
pub struct MemoryListener {
    incoming: mpsc::Receiver<Duplex>,
}

#[async_trait]
impl Listener for MemoryListener {
    async fn accept(&mut self) -> Result<Duplex> {
        self.incoming
            .recv()
            .await
            .ok_or_else(|| NameplateError::communication("memory network shut down"))
    }
}

struct MemorySender {
    tx: mpsc::Sender<Vec<u8>>,
}

#[async_trait]
impl FrameSender for MemorySender {
    async fn send(&mut self, frame: Vec<u8>) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| NameplateError::communication("peer closed"))
    }
}

struct MemoryReceiver {
    rx: mpsc::Receiver<Vec<u8>>,
}

#[async_trait]
impl FrameReceiver for MemoryReceiver {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.rx.recv().await)
    }
}
