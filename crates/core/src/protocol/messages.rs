use crate::key::CapabilityKey;
use crate::scope::ScopePath;
use nameplate_common::Location;

/// Message type tags; the numeric values are wire format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    Logon = 1,
    LogonReply = 2,
    RegisterRequest = 3,
    ResolveRequest = 4,
    LeaseRequest = 5,
    DeregisterRequest = 6,
    RegisterReply = 7,
    ResolveReply = 8,
    LeaseReply = 9,
    DeregisterReply = 10,
}

impl MessageKind {
    pub fn from_tag(tag: u8) -> Option<MessageKind> {
        match tag {
            1 => Some(MessageKind::Logon),
            2 => Some(MessageKind::LogonReply),
            3 => Some(MessageKind::RegisterRequest),
            4 => Some(MessageKind::ResolveRequest),
            5 => Some(MessageKind::LeaseRequest),
            6 => Some(MessageKind::DeregisterRequest),
            7 => Some(MessageKind::RegisterReply),
            8 => Some(MessageKind::ResolveReply),
            9 => Some(MessageKind::LeaseReply),
            10 => Some(MessageKind::DeregisterReply),
            _ => None,
        }
    }
}

/// Request/reply envelope
///
/// Every client request carries a per-session monotonically assigned
/// index; every reply echoes the index of the request it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub index: i32,
    pub body: MessageBody,
}

impl Message {
    pub fn new(index: i32, body: MessageBody) -> Self {
        Self { index, body }
    }

    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }

    pub fn message_type(&self) -> &'static str {
        self.body.message_type()
    }

    /// True for server→client message kinds
    pub fn is_reply(&self) -> bool {
        matches!(
            self.kind(),
            MessageKind::LogonReply
                | MessageKind::RegisterReply
                | MessageKind::ResolveReply
                | MessageKind::LeaseReply
                | MessageKind::DeregisterReply
        )
    }
}

/// Payloads for every message kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// Opens a session; carries the client's reply-location
    Logon { reply_location: Location },
    LogonReply { success: bool },
    RegisterRequest {
        name: String,
        scope: ScopePath,
        location: Location,
    },
    ResolveRequest { name: String, scope: ScopePath },
    /// Reserved; carried for wire compatibility, no server-side effect
    LeaseRequest { key: Option<CapabilityKey> },
    DeregisterRequest {
        name: String,
        scope: ScopePath,
        key: CapabilityKey,
    },
    /// Key is absent when registration failed
    RegisterReply { key: Option<CapabilityKey> },
    /// Location is `Location::None` when resolution failed; name and
    /// scope are the actual registered pair on success (the scope may
    /// be an ancestor of the requested one)
    ResolveReply {
        location: Location,
        name: String,
        scope: ScopePath,
    },
    /// Reserved, see `LeaseRequest`
    LeaseReply { key: Option<CapabilityKey> },
    DeregisterReply { success: bool },
}

impl MessageBody {
    pub fn kind(&self) -> MessageKind {
        match self {
            MessageBody::Logon { .. } => MessageKind::Logon,
            MessageBody::LogonReply { .. } => MessageKind::LogonReply,
            MessageBody::RegisterRequest { .. } => MessageKind::RegisterRequest,
            MessageBody::ResolveRequest { .. } => MessageKind::ResolveRequest,
            MessageBody::LeaseRequest { .. } => MessageKind::LeaseRequest,
            MessageBody::DeregisterRequest { .. } => MessageKind::DeregisterRequest,
            MessageBody::RegisterReply { .. } => MessageKind::RegisterReply,
            MessageBody::ResolveReply { .. } => MessageKind::ResolveReply,
            MessageBody::LeaseReply { .. } => MessageKind::LeaseReply,
            MessageBody::DeregisterReply { .. } => MessageKind::DeregisterReply,
        }
    }

    pub fn message_type(&self) -> &'static str {
        match self.kind() {
            MessageKind::Logon => "logon",
            MessageKind::LogonReply => "logon_reply",
            MessageKind::RegisterRequest => "register_request",
            MessageKind::ResolveRequest => "resolve_request",
            MessageKind::LeaseRequest => "lease_request",
            MessageKind::DeregisterRequest => "deregister_request",
            MessageKind::RegisterReply => "register_reply",
            MessageKind::ResolveReply => "resolve_reply",
            MessageKind::LeaseReply => "lease_reply",
            MessageKind::DeregisterReply => "deregister_reply",
        }
    }
}
