//! Process-wide directory context
//!
//! Components take a `DirectoryContext` (or a `DirectoryClient`)
//! explicitly; the "current" slot exists only for entry points that
//! genuinely want a process default, and it can be set exactly once.

use crate::client::DirectoryClient;
use std::sync::OnceLock;
use thiserror::Error;

static CURRENT: OnceLock<DirectoryContext> = OnceLock::new();

#[derive(Debug, Error)]
#[error("a directory context is already installed for this process")]
pub struct AlreadyInstalled;

/// Everything a component needs to register and resolve names
#[derive(Clone)]
pub struct DirectoryContext {
    client: DirectoryClient,
}

impl DirectoryContext {
    pub fn new(client: DirectoryClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &DirectoryClient {
        &self.client
    }

    /// Install this context as the process default; succeeds at most
    /// once for the lifetime of the process
    pub fn install(self) -> Result<(), AlreadyInstalled> {
        CURRENT.set(self).map_err(|_| AlreadyInstalled)
    }

    /// The installed process default, if any
    pub fn current() -> Option<&'static DirectoryContext> {
        CURRENT.get()
    }
}
