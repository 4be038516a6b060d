//! Directory service
//!
//! The authoritative server holding name→location bindings. One
//! session per logged-on client; all sessions share one registration
//! table behind a mutex, so each register/resolve/deregister is atomic
//! with respect to every other session.

mod service;
mod session;
mod table;

pub use service::DirectoryServer;
pub use session::{Session, SessionState};
pub use table::{NameTable, RegistrationRecord, Resolution};
