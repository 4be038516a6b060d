use crate::transport::{FrameReceiver, FrameSender};
use nameplate_common::{Location, NameplateError, Result};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Identity of a locally created endpoint within its manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointId(pub(crate) u64);

fn destroyed() -> NameplateError {
    NameplateError::communication("endpoint destroyed")
}

/// Local input endpoint: the receiving end of a named channel
///
/// Clones share the same underlying endpoint; once destroyed through
/// its manager, every clone observes the closed state, a receiver
/// already parked in `receive` is woken with an error, and the
/// transport half is dropped.
#[derive(Clone)]
pub struct NetInput {
    inner: Arc<InputInner>,
}

struct InputInner {
    id: EndpointId,
    location: Location,
    source: Mutex<Option<Box<dyn FrameReceiver>>>,
    closed: watch::Sender<bool>,
}

impl NetInput {
    pub(crate) fn new(id: EndpointId, location: Location, source: Box<dyn FrameReceiver>) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            inner: Arc::new(InputInner {
                id,
                location,
                source: Mutex::new(Some(source)),
                closed,
            }),
        }
    }

    pub fn id(&self) -> EndpointId {
        self.inner.id
    }

    /// The resolvable location this endpoint was registered under
    pub fn location(&self) -> &Location {
        &self.inner.location
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    /// Receive the next frame; `Ok(None)` when the sending side closed
    pub async fn receive(&self) -> Result<Option<Vec<u8>>> {
        let mut closed = self.inner.closed.subscribe();
        let mut guard = self.inner.source.lock().await;
        let source = guard.as_mut().ok_or_else(destroyed)?;

        tokio::select! {
            frame = source.recv() => frame,
            _ = closed.wait_for(|closed| *closed) => Err(destroyed()),
        }
    }

    /// Mark the endpoint closed, wake any parked receiver, and drop
    /// the transport half
    pub(crate) async fn close(&self) {
        self.inner.closed.send_replace(true);
        self.inner.source.lock().await.take();
    }
}

/// Local output endpoint: the sending end connected to a resolved
/// location
#[derive(Clone)]
pub struct NetOutput {
    inner: Arc<OutputInner>,
}

struct OutputInner {
    id: EndpointId,
    location: Location,
    sink: Mutex<Option<Box<dyn FrameSender>>>,
    closed: watch::Sender<bool>,
}

impl NetOutput {
    pub(crate) fn new(id: EndpointId, location: Location, sink: Box<dyn FrameSender>) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            inner: Arc::new(OutputInner {
                id,
                location,
                sink: Mutex::new(Some(sink)),
                closed,
            }),
        }
    }

    pub fn id(&self) -> EndpointId {
        self.inner.id
    }

    /// The location this endpoint was connected to when created
    pub fn location(&self) -> &Location {
        &self.inner.location
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    pub async fn send(&self, frame: Vec<u8>) -> Result<()> {
        let mut closed = self.inner.closed.subscribe();
        let mut guard = self.inner.sink.lock().await;
        let sink = guard.as_mut().ok_or_else(destroyed)?;

        tokio::select! {
            result = sink.send(frame) => result,
            _ = closed.wait_for(|closed| *closed) => Err(destroyed()),
        }
    }

    /// Mark the endpoint closed, wake any parked sender, and drop the
    /// transport half
    pub(crate) async fn close(&self) {
        self.inner.closed.send_replace(true);
        self.inner.sink.lock().await.take();
    }
}
