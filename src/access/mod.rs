//! Access resolution and action authorization.
//!
//! Everything in this module is a pure function over an immutable snapshot of
//! task + actor + tier configuration; the same logic backs every read and
//! every write, so server enforcement and client visibility filtering can no
//! longer drift apart.

pub mod assignment;
pub mod audit;
pub mod authorizer;
pub mod resolver;
pub mod tier;

pub use authorizer::{authorize, authorize_with, Action, Verdict};
pub use resolver::resolve_access;

use serde::{Deserialize, Serialize};

/// The three-valued outcome of access resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// No visibility at all.
    None,
    /// Read and comment, no mutation. Watchers and delegators land here.
    ViewOnly,
    /// Read plus all permitted mutations.
    Full,
}

impl AccessMode {
    pub fn can_view(&self) -> bool {
        *self != AccessMode::None
    }

    pub fn can_mutate(&self) -> bool {
        *self == AccessMode::Full
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::None => "none",
            AccessMode::ViewOnly => "view_only",
            AccessMode::Full => "full",
        }
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolver's output: mode plus the resolved assignee and watcher list,
/// so callers never re-derive them with slightly different rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub mode: AccessMode,
    /// Canonical reference of the effective assignee; the requesting actor's
    /// own email when they are the one granted `full` as the assignee.
    pub effective_assignee: String,
    pub watchers: Vec<String>,
}
