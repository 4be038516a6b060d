//! TCP transport for directory sessions
//!
//! The naming core is transport-agnostic; this module supplies the
//! concrete wiring used between real processes.

pub mod tcp;

pub use tcp::{TcpConnector, TcpSessionListener};
