//! Current-directory proxy state.
//!
//! While enabled, the process's real working directory is a folder inside
//! the scratch area (`synthetic_cwd`) mirroring a virtual folder
//! (`tracked_root`), and the application is told it is still at
//! `apparent_cwd`.

use crate::node::NodeID;
use crate::path::strip_prefix_ci;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CwdProxy {
    #[default]
    Disabled,
    Enabled {
        tracked_root: NodeID,
        /// Scratch-backed directory, always ending with a separator
        synthetic_cwd: String,
        /// Directory reported to the application, no trailing separator
        apparent_cwd: String,
    },
}

impl CwdProxy {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(self, CwdProxy::Enabled { .. })
    }

    #[must_use]
    pub fn tracked_root(&self) -> Option<NodeID> {
        match self {
            CwdProxy::Enabled { tracked_root, .. } => Some(*tracked_root),
            CwdProxy::Disabled => None,
        }
    }

    #[must_use]
    pub fn apparent_cwd(&self) -> Option<&str> {
        match self {
            CwdProxy::Enabled { apparent_cwd, .. } => Some(apparent_cwd),
            CwdProxy::Disabled => None,
        }
    }

    /// The part of `canonical` below the synthetic directory, if any
    #[must_use]
    pub fn strip_synthetic<'a>(&self, canonical: &'a str) -> Option<&'a str> {
        match self {
            CwdProxy::Enabled { synthetic_cwd, .. } => strip_prefix_ci(canonical, synthetic_cwd),
            CwdProxy::Disabled => None,
        }
    }
}
