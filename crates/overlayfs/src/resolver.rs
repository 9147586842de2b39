//! Classifies canonical paths as in or out of scope.

use crate::node::NodeID;
use crate::path::strip_prefix_ci;
use crate::proxy::CwdProxy;
use crate::tree::Tree;

/// An in-scope path, split into the root it is looked up from and the
/// remainder below that root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    /// The global root, or the proxy's tracked folder
    pub root: NodeID,
    /// Path relative to `root`; empty for the root itself
    pub relative: String,
    /// The apparent directory that `root` stands for
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Outside,
    Inside(Located),
}

/// Classifies an already canonical path.
///
/// An enabled proxy wins over the scope root, so relative calls made from
/// the synthetic working directory are looked up from the tracked folder.
#[must_use]
pub fn classify(tree: &Tree, proxy: &CwdProxy, scope_root: &str, canonical: &str) -> Scope {
    if let (Some(rest), Some(root), Some(prefix)) = (
        proxy.strip_synthetic(canonical),
        proxy.tracked_root(),
        proxy.apparent_cwd(),
    ) && tree.get(root).is_some()
    {
        return Scope::Inside(Located {
            root,
            relative: rest.to_string(),
            prefix: prefix.to_string(),
        });
    }

    match strip_prefix_ci(canonical, scope_root) {
        Some(rest) => Scope::Inside(Located {
            root: tree.root(),
            relative: rest.to_string(),
            prefix: scope_root.trim_end_matches('\\').to_string(),
        }),
        None => Scope::Outside,
    }
}
