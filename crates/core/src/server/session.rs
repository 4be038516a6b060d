use super::table::NameTable;
use crate::protocol::{Message, MessageBody};
use nameplate_common::Location;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Per-session protocol state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitLogon,
    Serving,
    Closed,
}

/// One client's session against the shared table
///
/// The session enforces the `AwaitLogon → Serving → Closed` machine:
/// requests arriving before logon are answered with the failure shape
/// of their kind and never touch the table.
pub struct Session {
    state: SessionState,
    reply_location: Option<Location>,
    table: Arc<Mutex<NameTable>>,
}

impl Session {
    pub fn new(table: Arc<Mutex<NameTable>>) -> Self {
        Self {
            state: SessionState::AwaitLogon,
            reply_location: None,
            table,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn reply_location(&self) -> Option<&Location> {
        self.reply_location.as_ref()
    }

    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    /// Handle one request; the returned reply echoes the request index
    pub async fn handle(&mut self, message: Message) -> Option<Message> {
        let index = message.index;

        if message.is_reply() {
            warn!(
                "dropping server-bound {} message (replies only flow server to client)",
                message.message_type()
            );
            return None;
        }

        match self.state {
            SessionState::Closed => None,
            SessionState::AwaitLogon => match message.body {
                MessageBody::Logon { reply_location } => {
                    debug!("session logged on, reply location {reply_location}");
                    self.reply_location = Some(reply_location);
                    self.state = SessionState::Serving;
                    Some(Message::new(index, MessageBody::LogonReply { success: true }))
                }
                body => {
                    warn!("rejecting {} before logon", body.message_type());
                    Some(Message::new(index, Self::failure_reply(&body)?))
                }
            },
            SessionState::Serving => match message.body {
                MessageBody::Logon { .. } => {
                    warn!("duplicate logon on serving session");
                    Some(Message::new(
                        index,
                        MessageBody::LogonReply { success: false },
                    ))
                }
                MessageBody::RegisterRequest {
                    name,
                    scope,
                    location,
                } => {
                    let result = {
                        let mut table = self.table.lock().await;
                        table.register(&name, &scope, location)
                    };
                    let key = match result {
                        Ok(key) => Some(key),
                        Err(e) => {
                            debug!("register {name} at {scope} refused: {e}");
                            None
                        }
                    };
                    Some(Message::new(index, MessageBody::RegisterReply { key }))
                }
                MessageBody::ResolveRequest { name, scope } => {
                    let result = {
                        let table = self.table.lock().await;
                        table.resolve(&name, &scope)
                    };
                    let body = match result {
                        Ok(resolution) => MessageBody::ResolveReply {
                            location: resolution.location,
                            name: resolution.name,
                            scope: resolution.scope,
                        },
                        Err(e) => {
                            debug!("resolve {name} at {scope} failed: {e}");
                            MessageBody::ResolveReply {
                                location: Location::None,
                                name,
                                scope,
                            }
                        }
                    };
                    Some(Message::new(index, body))
                }
                MessageBody::DeregisterRequest { name, scope, key } => {
                    let result = {
                        let mut table = self.table.lock().await;
                        table.deregister(&name, &scope, &key)
                    };
                    if let Err(e) = &result {
                        debug!("deregister {name} at {scope} refused: {e}");
                    }
                    Some(Message::new(
                        index,
                        MessageBody::DeregisterReply {
                            success: result.is_ok(),
                        },
                    ))
                }
                // Reserved: leases carry no server-side effect; the key
                // is echoed back untouched.
                MessageBody::LeaseRequest { key } => {
                    Some(Message::new(index, MessageBody::LeaseReply { key }))
                }
                _ => None,
            },
        }
    }

    /// Failure-shaped reply for a request rejected before logon
    fn failure_reply(body: &MessageBody) -> Option<MessageBody> {
        match body {
            MessageBody::RegisterRequest { .. } => {
                Some(MessageBody::RegisterReply { key: None })
            }
            MessageBody::ResolveRequest { name, scope } => Some(MessageBody::ResolveReply {
                location: Location::None,
                name: name.clone(),
                scope: scope.clone(),
            }),
            MessageBody::DeregisterRequest { .. } => {
                Some(MessageBody::DeregisterReply { success: false })
            }
            MessageBody::LeaseRequest { .. } => Some(MessageBody::LeaseReply { key: None }),
            _ => None,
        }
    }
}
