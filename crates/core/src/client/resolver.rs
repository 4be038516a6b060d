use super::handle::NameHandle;
use super::pending::PendingReplies;
use crate::key::CapabilityKey;
use crate::protocol::{decode, encode, Message, MessageBody};
use crate::scope::ScopePath;
use crate::server::Resolution;
use crate::transport::{Connector, FrameReceiver, FrameSender};
use nameplate_common::config::protocol::REPLY_TIMEOUT_SECS;
use nameplate_common::{Location, NameplateError, Result};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Client handle to the directory service
///
/// Cheap to clone; all clones share one session. `register`,
/// `resolve` and `deregister` are blocking calls from the caller's
/// point of view, each bounded by the configured reply timeout.
#[derive(Clone)]
pub struct DirectoryClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    sender: Mutex<Box<dyn FrameSender>>,
    pending: Arc<PendingReplies>,
    next_index: AtomicI32,
    reply_location: Location,
    reply_timeout: Duration,
}

impl DirectoryClient {
    /// Connect and log on with the default reply timeout
    pub async fn connect<C: Connector + ?Sized>(
        connector: &C,
        server: &Location,
        reply_location: Location,
    ) -> Result<Self> {
        Self::connect_with_timeout(
            connector,
            server,
            reply_location,
            Duration::from_secs(REPLY_TIMEOUT_SECS),
        )
        .await
    }

    /// Connect and log on with an explicit reply timeout
    pub async fn connect_with_timeout<C: Connector + ?Sized>(
        connector: &C,
        server: &Location,
        reply_location: Location,
        reply_timeout: Duration,
    ) -> Result<Self> {
        let (sender, receiver) = connector.connect(server).await?;

        let pending = Arc::new(PendingReplies::new());
        tokio::spawn(receive_loop(receiver, pending.clone()));

        let client = Self {
            inner: Arc::new(ClientInner {
                sender: Mutex::new(sender),
                pending,
                next_index: AtomicI32::new(0),
                reply_location: reply_location.clone(),
                reply_timeout,
            }),
        };

        let reply = client.call(MessageBody::Logon { reply_location }).await?;
        match reply.body {
            MessageBody::LogonReply { success: true } => Ok(client),
            MessageBody::LogonReply { success: false } => {
                Err(NameplateError::communication("directory refused logon"))
            }
            other => Err(NameplateError::protocol(format!(
                "unexpected logon reply: {}",
                other.message_type()
            ))),
        }
    }

    pub fn reply_location(&self) -> &Location {
        &self.inner.reply_location
    }

    /// Register a name; the returned key is the only way to remove it
    pub async fn register(
        &self,
        name: &str,
        scope: &ScopePath,
        location: Location,
    ) -> Result<CapabilityKey> {
        let reply = self
            .call(MessageBody::RegisterRequest {
                name: name.to_string(),
                scope: scope.clone(),
                location,
            })
            .await?;

        match reply.body {
            MessageBody::RegisterReply { key: Some(key) } => Ok(key),
            MessageBody::RegisterReply { key: None } => {
                Err(NameplateError::name_clash(name, scope.to_string()))
            }
            other => Err(NameplateError::protocol(format!(
                "unexpected register reply: {}",
                other.message_type()
            ))),
        }
    }

    /// Resolve a name to a refreshable location handle
    pub async fn resolve(&self, name: &str, scope: &ScopePath) -> Result<NameHandle> {
        let resolution = self.resolve_location(name, scope).await?;
        Ok(NameHandle::new(
            self.clone(),
            name.to_string(),
            scope.clone(),
            resolution.location,
        ))
    }

    /// Resolve without constructing a handle
    pub async fn resolve_location(&self, name: &str, scope: &ScopePath) -> Result<Resolution> {
        let reply = self
            .call(MessageBody::ResolveRequest {
                name: name.to_string(),
                scope: scope.clone(),
            })
            .await?;

        match reply.body {
            MessageBody::ResolveReply {
                location: Location::None,
                ..
            } => Err(NameplateError::not_found(name)),
            MessageBody::ResolveReply {
                location,
                name,
                scope,
            } => Ok(Resolution {
                name,
                scope,
                location,
            }),
            other => Err(NameplateError::protocol(format!(
                "unexpected resolve reply: {}",
                other.message_type()
            ))),
        }
    }

    /// Remove a registration; requires its capability key verbatim
    pub async fn deregister(
        &self,
        name: &str,
        scope: &ScopePath,
        key: CapabilityKey,
    ) -> Result<()> {
        let reply = self
            .call(MessageBody::DeregisterRequest {
                name: name.to_string(),
                scope: scope.clone(),
                key,
            })
            .await?;

        match reply.body {
            MessageBody::DeregisterReply { success: true } => Ok(()),
            MessageBody::DeregisterReply { success: false } => Err(NameplateError::Authorization),
            other => Err(NameplateError::protocol(format!(
                "unexpected deregister reply: {}",
                other.message_type()
            ))),
        }
    }

    /// Reserved lease exchange; the server echoes the key unchanged
    pub async fn lease(&self, key: Option<CapabilityKey>) -> Result<Option<CapabilityKey>> {
        let reply = self.call(MessageBody::LeaseRequest { key }).await?;
        match reply.body {
            MessageBody::LeaseReply { key } => Ok(key),
            other => Err(NameplateError::protocol(format!(
                "unexpected lease reply: {}",
                other.message_type()
            ))),
        }
    }

    /// Send one request and suspend until its reply arrives
    async fn call(&self, body: MessageBody) -> Result<Message> {
        let index = self.inner.next_index.fetch_add(1, Ordering::Relaxed);
        let slot = self.inner.pending.claim(index);

        let frame = encode(&Message::new(index, body));
        {
            let mut sender = self.inner.sender.lock().await;
            if let Err(e) = sender.send(frame).await {
                self.inner.pending.abandon(index);
                return Err(e);
            }
        }

        match tokio::time::timeout(self.inner.reply_timeout, slot).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(NameplateError::communication(
                "directory connection closed",
            )),
            Err(_) => {
                self.inner.pending.abandon(index);
                Err(NameplateError::Timeout)
            }
        }
    }
}

/// Demultiplexes incoming replies to their waiting callers
///
/// Malformed frames and unknown indices are logged and dropped; the
/// loop itself never gives up on bad input, only on a closed
/// transport.
async fn receive_loop(mut receiver: Box<dyn FrameReceiver>, pending: Arc<PendingReplies>) {
    loop {
        let frame = match receiver.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                warn!("directory connection lost: {e}");
                break;
            }
        };

        match decode(&frame) {
            Ok(message) if message.is_reply() => {
                let index = message.index;
                if !pending.fulfill(message) {
                    debug!("dropping reply with unknown request index {index}");
                }
            }
            Ok(message) => {
                warn!(
                    "dropping unexpected {} from directory server",
                    message.message_type()
                );
            }
            Err(e) => {
                warn!("dropping malformed reply: {e}");
            }
        }
    }

    // Wake every blocked caller with a communication failure.
    pending.fail_all();
    debug!("directory receive loop stopped");
}
