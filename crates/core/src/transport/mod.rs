//! Transport boundary
//!
//! The naming core consumes a reliable, ordered frame transport
//! supplied from outside; it never implements a real network transport
//! itself. `MemoryNetwork` is the in-process implementation used by
//! tests and single-process deployments; the daemon supplies a TCP
//! implementation of the same traits.

pub mod memory;

pub use memory::{MemoryListener, MemoryNetwork};

use async_trait::async_trait;
use nameplate_common::{Location, Result};

/// Sending half of a frame channel
#[async_trait]
pub trait FrameSender: Send {
    async fn send(&mut self, frame: Vec<u8>) -> Result<()>;
}

/// Receiving half of a frame channel; `Ok(None)` is an orderly close
#[async_trait]
pub trait FrameReceiver: Send {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Both halves of a bidirectional session
pub type Duplex = (Box<dyn FrameSender>, Box<dyn FrameReceiver>);

/// Connect-by-location to a remote session endpoint
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, location: &Location) -> Result<Duplex>;
}

/// Accepts incoming sessions on a listening location
#[async_trait]
pub trait Listener: Send {
    async fn accept(&mut self) -> Result<Duplex>;
}

/// Creates local endpoints for the lifecycle manager
///
/// Input endpoints are one-way receive ends with a resolvable
/// location; output endpoints are one-way send ends connected to a
/// previously resolved location.
#[async_trait]
pub trait EndpointFactory: Send + Sync {
    async fn create_input(&self) -> Result<(Location, Box<dyn FrameReceiver>)>;

    async fn open_output(&self, location: &Location) -> Result<Box<dyn FrameSender>>;
}
