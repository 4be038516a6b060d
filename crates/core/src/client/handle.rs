use super::resolver::DirectoryClient;
use crate::scope::ScopePath;
use nameplate_common::{Location, Result};
use std::sync::{Arc, Mutex};

/// Resolvable location handle
///
/// Names what was last resolved for a (name, scope) pair and can
/// re-resolve itself through the client that produced it. Clones share
/// the same underlying fields, so a `refresh` through one clone is
/// observed by every holder. The handle's identity (its name and
/// requested scope) never changes.
#[derive(Clone)]
pub struct NameHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    client: DirectoryClient,
    name: String,
    scope: ScopePath,
    location: Mutex<Location>,
}

impl NameHandle {
    pub(super) fn new(
        client: DirectoryClient,
        name: String,
        scope: ScopePath,
        location: Location,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                client,
                name,
                scope,
                location: Mutex::new(location),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The scope the resolve was requested at
    pub fn scope(&self) -> &ScopePath {
        &self.inner.scope
    }

    /// The last-resolved location
    pub fn location(&self) -> Location {
        self.inner
            .location
            .lock()
            .expect("handle location poisoned")
            .clone()
    }

    /// Re-resolve and replace the location in place
    ///
    /// Returns true when the binding moved since the last resolution,
    /// false when nothing changed.
    pub async fn refresh(&self) -> Result<bool> {
        let fresh = self
            .inner
            .client
            .resolve_location(&self.inner.name, &self.inner.scope)
            .await?
            .location;

        let mut current = self
            .inner
            .location
            .lock()
            .expect("handle location poisoned");
        if *current == fresh {
            Ok(false)
        } else {
            *current = fresh;
            Ok(true)
        }
    }
}
