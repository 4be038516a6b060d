use crate::key::{CapabilityKey, KeyMinter};
use crate::scope::{ScopeId, ScopePath, ScopeTree};
use nameplate_common::{Location, NameplateError, Result};
use std::collections::HashMap;

/// One active binding: (name, scope) → location, guarded by a key
#[derive(Debug)]
pub struct RegistrationRecord {
    pub name: String,
    pub scope: ScopeId,
    pub location: Location,
    key: CapabilityKey,
}

/// Outcome of a successful resolution
///
/// `scope` is the scope the binding was actually registered at, which
/// may be an ancestor of the requested scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub name: String,
    pub scope: ScopePath,
    pub location: Location,
}

/// The server's name→location table
///
/// At most one active record exists per (name, scope) pair. All
/// mutation goes through `register`/`deregister`; the caller provides
/// mutual exclusion around each call.
#[derive(Debug, Default)]
pub struct NameTable {
    tree: ScopeTree,
    records: HashMap<(String, ScopeId), RegistrationRecord>,
    minter: KeyMinter,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new binding and mint its capability key
    pub fn register(
        &mut self,
        name: &str,
        scope: &ScopePath,
        location: Location,
    ) -> Result<CapabilityKey> {
        let scope_id = self.tree.intern(scope);
        let entry = (name.to_string(), scope_id);

        if self.records.contains_key(&entry) {
            return Err(NameplateError::name_clash(name, scope.to_string()));
        }

        let key = self.minter.mint();
        self.records.insert(
            entry,
            RegistrationRecord {
                name: name.to_string(),
                scope: scope_id,
                location,
                key,
            },
        );

        Ok(key)
    }

    /// Resolve a name at a requested scope
    ///
    /// Walks from the requested scope up the parent chain, so the
    /// requested scope itself shadows any ancestor registration and
    /// the closest ancestor wins among the rest. Read-only: only
    /// registration interns scopes, so a query for a fabricated scope
    /// cannot grow the tree.
    pub fn resolve(&self, name: &str, scope: &ScopePath) -> Result<Resolution> {
        let mut candidate = Some(scope.clone());

        while let Some(path) = candidate {
            if let Some(id) = self.tree.find(&path) {
                if let Some(record) = self.records.get(&(name.to_string(), id)) {
                    return Ok(Resolution {
                        name: record.name.clone(),
                        scope: path,
                        location: record.location.clone(),
                    });
                }
            }
            candidate = path.parent();
        }

        Err(NameplateError::not_found(name))
    }

    /// Remove a binding; requires the exact key it was minted with
    ///
    /// A missing record and a wrong key are indistinguishable to the
    /// caller.
    pub fn deregister(&mut self, name: &str, scope: &ScopePath, key: &CapabilityKey) -> Result<()> {
        let scope_id = match self.tree.find(scope) {
            Some(id) => id,
            None => return Err(NameplateError::Authorization),
        };

        let entry = (name.to_string(), scope_id);
        match self.records.get(&entry) {
            Some(record) if record.key.matches(key) => {
                self.records.remove(&entry);
                Ok(())
            }
            _ => Err(NameplateError::Authorization),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nameplate_common::ChannelLocation;

    fn scope(s: &str) -> ScopePath {
        s.parse().unwrap()
    }

    fn loc(address: &str) -> Location {
        Location::Channel(ChannelLocation::new(address, 0))
    }

    #[test]
    fn test_register_then_resolve_same_scope() {
        let mut table = NameTable::new();
        let node = scope("global/acme/node1");

        table.register("pipeline.in", &node, loc("node1:9600")).unwrap();

        let found = table.resolve("pipeline.in", &node).unwrap();
        assert_eq!(found.location, loc("node1:9600"));
        assert_eq!(found.scope, node);
        assert_eq!(found.name, "pipeline.in");
    }

    #[test]
    fn test_descendant_sees_ancestor_registration() {
        let mut table = NameTable::new();
        table
            .register("logger", &scope("global"), loc("infra:9600"))
            .unwrap();

        let found = table
            .resolve("logger", &scope("global/acme/node1/app"))
            .unwrap();
        assert_eq!(found.location, loc("infra:9600"));
        // Reply carries the actual registered scope, not the request's.
        assert_eq!(found.scope, scope("global"));
    }

    #[test]
    fn test_more_specific_registration_shadows_ancestor() {
        let mut table = NameTable::new();
        table
            .register("logger", &scope("global"), loc("infra:9600"))
            .unwrap();
        table
            .register("logger", &scope("global/acme"), loc("acme:9600"))
            .unwrap();
        table
            .register("logger", &scope("global/acme/node1"), loc("node1:9600"))
            .unwrap();

        let at_node = table.resolve("logger", &scope("global/acme/node1")).unwrap();
        assert_eq!(at_node.location, loc("node1:9600"));

        let at_app = table
            .resolve("logger", &scope("global/acme/node1/app"))
            .unwrap();
        assert_eq!(at_app.location, loc("node1:9600"));
        assert_eq!(at_app.scope, scope("global/acme/node1"));

        let elsewhere = table
            .resolve("logger", &scope("global/rival"))
            .unwrap();
        assert_eq!(elsewhere.location, loc("infra:9600"));
    }

    #[test]
    fn test_sibling_scope_is_not_visible() {
        let mut table = NameTable::new();
        table
            .register("worker", &scope("global/acme/node1"), loc("node1:9600"))
            .unwrap();

        assert!(matches!(
            table.resolve("worker", &scope("global/acme/node2")),
            Err(NameplateError::NotFound { .. })
        ));
    }

    #[test]
    fn test_duplicate_register_clashes_and_first_survives() {
        let mut table = NameTable::new();
        let node = scope("global/acme/node1");

        table.register("pipeline.in", &node, loc("first:9600")).unwrap();
        let second = table.register("pipeline.in", &node, loc("second:9600"));
        assert!(matches!(second, Err(NameplateError::NameClash { .. })));

        let found = table.resolve("pipeline.in", &node).unwrap();
        assert_eq!(found.location, loc("first:9600"));
    }

    #[test]
    fn test_deregister_with_wrong_key_leaves_record() {
        let mut table = NameTable::new();
        let node = scope("global/acme/node1");
        let key = table.register("pipeline.in", &node, loc("node1:9600")).unwrap();

        let (seed, token) = key.to_parts();
        let forged = CapabilityKey::from_parts(seed, token.wrapping_add(1));

        assert!(matches!(
            table.deregister("pipeline.in", &node, &forged),
            Err(NameplateError::Authorization)
        ));
        assert!(table.resolve("pipeline.in", &node).is_ok());
    }

    #[test]
    fn test_deregister_succeeds_exactly_once() {
        let mut table = NameTable::new();
        let node = scope("global/acme/node1");
        let key = table.register("pipeline.in", &node, loc("node1:9600")).unwrap();

        table.deregister("pipeline.in", &node, &key).unwrap();
        assert!(matches!(
            table.deregister("pipeline.in", &node, &key),
            Err(NameplateError::Authorization)
        ));
        assert!(table.resolve("pipeline.in", &node).is_err());
    }

    #[test]
    fn test_missing_record_and_wrong_key_are_indistinguishable() {
        let mut table = NameTable::new();
        let node = scope("global/acme/node1");
        let key = table.register("present", &node, loc("node1:9600")).unwrap();

        let (seed, token) = key.to_parts();
        let forged = CapabilityKey::from_parts(seed.wrapping_add(1), token);

        let missing = table.deregister("absent", &node, &key).unwrap_err();
        let wrong = table.deregister("present", &node, &forged).unwrap_err();
        assert_eq!(missing.to_string(), wrong.to_string());
    }

    #[test]
    fn test_failed_resolve_leaves_scope_tree_untouched() {
        let mut table = NameTable::new();
        table
            .register("logger", &scope("global"), loc("infra:9600"))
            .unwrap();

        let fabricated = scope("global/ghost/node9");
        assert!(matches!(
            table.resolve("nothing", &fabricated),
            Err(NameplateError::NotFound { .. })
        ));

        // The query must not have interned the fabricated scopes.
        assert!(table.tree.find(&fabricated).is_none());
        assert!(table.tree.find(&scope("global/ghost")).is_none());

        // Ancestor lookups still work through the uninterned scope.
        let found = table.resolve("logger", &fabricated).unwrap();
        assert_eq!(found.scope, scope("global"));
    }

    #[test]
    fn test_reregistration_after_deregister() {
        let mut table = NameTable::new();
        let node = scope("global/acme/node1");

        let key = table.register("pipeline.in", &node, loc("old:9600")).unwrap();
        table.deregister("pipeline.in", &node, &key).unwrap();

        let new_key = table.register("pipeline.in", &node, loc("new:9600")).unwrap();
        assert!(!new_key.matches(&key));
        assert_eq!(
            table.resolve("pipeline.in", &node).unwrap().location,
            loc("new:9600")
        );
    }
}
