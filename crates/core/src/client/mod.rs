//! Directory client
//!
//! Synchronous-looking remote calls built over the asynchronous
//! transport: each call allocates the next request index, sends the
//! encoded request and suspends until the receive loop fulfils the
//! matching pending slot. Unmatched replies are dropped; a closed
//! transport fails every pending call at once.

mod handle;
mod pending;
mod resolver;

pub use handle::NameHandle;
pub use pending::PendingReplies;
pub use resolver::DirectoryClient;
