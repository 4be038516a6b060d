//! Remote work spawning contract
//!
//! A spawn is a structured request (work descriptor, originating
//! application scope, reply location) handed to a freshly started
//! worker, and a structured outcome sent back before the worker exits.
//! A worker that exits without reporting is an abrupt failure,
//! regardless of its exit code; the filesystem bootstrap handoff is
//! only how the request reaches the worker, not part of the protocol.

mod bootstrap;
mod contract;
mod worker;

pub use bootstrap::{read_bootstrap, write_bootstrap};
pub use contract::{SpawnOutcome, SpawnRequest};
pub use worker::{await_outcome, run_worker, FactoryRegistry, WorkFactory};
