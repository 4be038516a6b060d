//! Namespace model: hierarchical access scopes
//!
//! Registered names are scoped to a level in a fixed four-deep
//! hierarchy (global > domain > node > application). A registration is
//! visible to a requested scope when its own scope equals the request
//! or is a strict ancestor of it, which lets infrastructure register
//! defaults visible to all descendants while a more specific scope can
//! still shadow them.

mod tree;

pub use tree::{ScopeId, ScopeTree};

use nameplate_common::NameplateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Level kind in the scope hierarchy, determined by depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKind {
    Global,
    Domain,
    Node,
    Application,
}

impl ScopeKind {
    fn from_depth(depth: usize) -> Option<ScopeKind> {
        match depth {
            0 => Some(ScopeKind::Global),
            1 => Some(ScopeKind::Domain),
            2 => Some(ScopeKind::Node),
            3 => Some(ScopeKind::Application),
            _ => None,
        }
    }
}

/// Maximum number of labels under the global root
const MAX_LABELS: usize = 3;

/// Value form of an access scope: the label path from the global root
///
/// Two scopes are equal iff their paths are equal. The text form is
/// `global`, `global/acme`, `global/acme/node1`,
/// `global/acme/node1/app`; the depth alone determines the kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopePath {
    labels: Vec<String>,
}

impl ScopePath {
    /// The global root scope
    pub fn global() -> Self {
        Self { labels: Vec::new() }
    }

    /// Build a scope from labels under the global root
    pub fn from_labels<I, S>(labels: I) -> Result<Self, NameplateError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();

        if labels.len() > MAX_LABELS {
            return Err(NameplateError::InvalidScope(format!(
                "scope too deep: {} labels (max {})",
                labels.len(),
                MAX_LABELS
            )));
        }

        for label in &labels {
            if label.is_empty() || label.contains('/') {
                return Err(NameplateError::InvalidScope(format!(
                    "invalid scope label: {label:?}"
                )));
            }
        }

        Ok(Self { labels })
    }

    /// Child scope one level down
    pub fn child(&self, label: impl Into<String>) -> Result<Self, NameplateError> {
        let mut labels = self.labels.clone();
        labels.push(label.into());
        Self::from_labels(labels)
    }

    /// Parent scope, or `None` for the global root
    pub fn parent(&self) -> Option<ScopePath> {
        if self.labels.is_empty() {
            return None;
        }
        Some(Self {
            labels: self.labels[..self.labels.len() - 1].to_vec(),
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn depth(&self) -> usize {
        self.labels.len()
    }

    pub fn kind(&self) -> ScopeKind {
        // Construction bounds the depth, so this cannot miss.
        ScopeKind::from_depth(self.labels.len()).unwrap_or(ScopeKind::Application)
    }

    /// True iff `self` equals `other` or is a strict ancestor of it
    pub fn is_visible_to(&self, requested: &ScopePath) -> bool {
        self.labels.len() <= requested.labels.len()
            && requested.labels[..self.labels.len()] == self.labels[..]
    }
}

impl fmt::Display for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "global")?;
        for label in &self.labels {
            write!(f, "/{label}")?;
        }
        Ok(())
    }
}

impl FromStr for ScopePath {
    type Err = NameplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');

        if parts.next() != Some("global") {
            return Err(NameplateError::InvalidScope(s.to_string()));
        }

        Self::from_labels(parts.map(str::to_string))
            .map_err(|_| NameplateError::InvalidScope(s.to_string()))
    }
}
