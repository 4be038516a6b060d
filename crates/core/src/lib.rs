pub mod client;
pub mod context;
pub mod endpoint;
pub mod key;
pub mod protocol;
pub mod scope;
pub mod server;
pub mod spawn;
pub mod transport;

pub use key::{CapabilityKey, KeyMinter};
pub use protocol::*;
pub use scope::{ScopeId, ScopeKind, ScopePath, ScopeTree};

// Re-export server types
pub use server::{DirectoryServer, NameTable, RegistrationRecord, Resolution, Session, SessionState};

// Re-export client types
pub use client::{DirectoryClient, NameHandle, PendingReplies};
pub use context::DirectoryContext;

// Re-export endpoint types
pub use endpoint::{DestroyAllError, EndpointManager, NetInput, NetOutput};

// Re-export spawn types
pub use spawn::{
    await_outcome, read_bootstrap, run_worker, write_bootstrap, FactoryRegistry, SpawnOutcome,
    SpawnRequest, WorkFactory,
};
