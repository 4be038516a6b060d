//! Endpoint lifecycle
//!
//! Wraps endpoint creation with directory registration and tracks
//! ownership: an endpoint can only be destroyed through the manager
//! that created it, and never more than once.

mod manager;
mod net;

pub use manager::{DestroyAllError, EndpointManager};
pub use net::{EndpointId, NetInput, NetOutput};
