//! Byte-stable encoding for directory messages
//!
//! Layout: `[tag: u8][request-index: i32 LE][fields]`. Variable-length
//! fields (names, locations, scopes) are u32-LE-length-prefixed UTF-8;
//! an absent location is the literal string `"null"` and decodes to
//! `Location::None`. Optional keys carry a one-byte presence flag
//! followed by both u64-LE components.

use super::messages::{Message, MessageBody, MessageKind};
use crate::key::CapabilityKey;
use crate::scope::ScopePath;
use nameplate_common::Location;
use thiserror::Error;

/// Frames larger than this are rejected before any allocation
const MAX_STRING_LEN: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("truncated message")]
    Truncated,

    #[error("unknown message tag: {0}")]
    UnknownTag(u8),

    #[error("string field too long: {0} bytes")]
    StringTooLong(usize),

    #[error("invalid utf-8 in string field")]
    BadUtf8,

    #[error("invalid location field: {0}")]
    BadLocation(String),

    #[error("invalid scope field: {0}")]
    BadScope(String),

    #[error("trailing bytes after message")]
    TrailingBytes,
}

/// Encode a message to its wire form
pub fn encode(message: &Message) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32);
    buf.push(message.kind() as u8);
    buf.extend_from_slice(&message.index.to_le_bytes());

    match &message.body {
        MessageBody::Logon { reply_location } => {
            put_location(&mut buf, reply_location);
        }
        MessageBody::LogonReply { success } => {
            put_bool(&mut buf, *success);
        }
        MessageBody::RegisterRequest {
            name,
            scope,
            location,
        } => {
            put_string(&mut buf, name);
            put_string(&mut buf, &scope.to_string());
            put_location(&mut buf, location);
        }
        MessageBody::ResolveRequest { name, scope } => {
            put_string(&mut buf, name);
            put_string(&mut buf, &scope.to_string());
        }
        MessageBody::LeaseRequest { key } | MessageBody::LeaseReply { key } => {
            put_opt_key(&mut buf, key.as_ref());
        }
        MessageBody::DeregisterRequest { name, scope, key } => {
            put_string(&mut buf, name);
            put_string(&mut buf, &scope.to_string());
            put_key(&mut buf, key);
        }
        MessageBody::RegisterReply { key } => {
            put_opt_key(&mut buf, key.as_ref());
        }
        MessageBody::ResolveReply {
            location,
            name,
            scope,
        } => {
            put_location(&mut buf, location);
            put_string(&mut buf, name);
            put_string(&mut buf, &scope.to_string());
        }
        MessageBody::DeregisterReply { success } => {
            put_bool(&mut buf, *success);
        }
    }

    buf
}

/// Decode a message from its wire form; never panics on bad input
pub fn decode(bytes: &[u8]) -> Result<Message, WireError> {
    let mut cursor = Cursor::new(bytes);

    let tag = cursor.u8()?;
    let kind = MessageKind::from_tag(tag).ok_or(WireError::UnknownTag(tag))?;
    let index = cursor.i32()?;

    let body = match kind {
        MessageKind::Logon => MessageBody::Logon {
            reply_location: cursor.location()?,
        },
        MessageKind::LogonReply => MessageBody::LogonReply {
            success: cursor.bool()?,
        },
        MessageKind::RegisterRequest => MessageBody::RegisterRequest {
            name: cursor.string()?,
            scope: cursor.scope()?,
            location: cursor.location()?,
        },
        MessageKind::ResolveRequest => MessageBody::ResolveRequest {
            name: cursor.string()?,
            scope: cursor.scope()?,
        },
        MessageKind::LeaseRequest => MessageBody::LeaseRequest {
            key: cursor.opt_key()?,
        },
        MessageKind::DeregisterRequest => MessageBody::DeregisterRequest {
            name: cursor.string()?,
            scope: cursor.scope()?,
            key: cursor.key()?,
        },
        MessageKind::RegisterReply => MessageBody::RegisterReply {
            key: cursor.opt_key()?,
        },
        MessageKind::ResolveReply => MessageBody::ResolveReply {
            location: cursor.location()?,
            name: cursor.string()?,
            scope: cursor.scope()?,
        },
        MessageKind::LeaseReply => MessageBody::LeaseReply {
            key: cursor.opt_key()?,
        },
        MessageKind::DeregisterReply => MessageBody::DeregisterReply {
            success: cursor.bool()?,
        },
    };

    if !cursor.at_end() {
        return Err(WireError::TrailingBytes);
    }

    Ok(Message::new(index, body))
}

fn put_bool(buf: &mut Vec<u8>, value: bool) {
    buf.push(value as u8);
}

fn put_string(buf: &mut Vec<u8>, value: &str) {
    buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
    buf.extend_from_slice(value.as_bytes());
}

fn put_location(buf: &mut Vec<u8>, location: &Location) {
    // `Location::None` prints as "null", which is the wire sentinel.
    put_string(buf, &location.to_string());
}

fn put_key(buf: &mut Vec<u8>, key: &CapabilityKey) {
    let (seed, token) = key.to_parts();
    buf.extend_from_slice(&seed.to_le_bytes());
    buf.extend_from_slice(&token.to_le_bytes());
}

fn put_opt_key(buf: &mut Vec<u8>, key: Option<&CapabilityKey>) {
    match key {
        Some(key) => {
            buf.push(1);
            put_key(buf, key);
        }
        None => buf.push(0),
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        let end = self.pos.checked_add(n).ok_or(WireError::Truncated)?;
        if end > self.bytes.len() {
            return Err(WireError::Truncated);
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn at_end(&self) -> bool {
        self.pos == self.bytes.len()
    }

    fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    fn bool(&mut self) -> Result<bool, WireError> {
        Ok(self.u8()? != 0)
    }

    fn i32(&mut self) -> Result<i32, WireError> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes(bytes.try_into().expect("4 bytes")))
    }

    fn u64(&mut self) -> Result<u64, WireError> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("8 bytes")))
    }

    fn string(&mut self) -> Result<String, WireError> {
        let len_bytes = self.take(4)?;
        let len = u32::from_le_bytes(len_bytes.try_into().expect("4 bytes")) as usize;
        if len > MAX_STRING_LEN {
            return Err(WireError::StringTooLong(len));
        }
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| WireError::BadUtf8)
    }

    fn location(&mut self) -> Result<Location, WireError> {
        let text = self.string()?;
        text.parse().map_err(|_| WireError::BadLocation(text))
    }

    fn scope(&mut self) -> Result<ScopePath, WireError> {
        let text = self.string()?;
        text.parse().map_err(|_| WireError::BadScope(text))
    }

    fn key(&mut self) -> Result<CapabilityKey, WireError> {
        let seed = self.u64()?;
        let token = self.u64()?;
        Ok(CapabilityKey::from_parts(seed, token))
    }

    fn opt_key(&mut self) -> Result<Option<CapabilityKey>, WireError> {
        if self.bool()? {
            Ok(Some(self.key()?))
        } else {
            Ok(None)
        }
    }
}
