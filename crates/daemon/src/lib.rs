/// Nameplate daemon library
///
/// This crate provides the daemon that runs a directory node,
/// including the TCP session transport and the serving loop.

pub mod transport;

pub use transport::{TcpConnector, TcpSessionListener};
