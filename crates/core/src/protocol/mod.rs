//! Directory wire protocol
//!
//! Fixed single-byte message tags shared by both directory generations
//! (channel and barrier traffic differ only in the location payload).
//! The codec is hand-written so the byte layout stays stable across
//! client and server versions of the same protocol generation.

pub mod codec;
pub mod messages;

pub use codec::{decode, encode, WireError};
pub use messages::{Message, MessageBody, MessageKind};
