use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use diagnostics::{log_debug, log_warn};
use overlayfs::config::{DESCRIPTOR_FILE, ROOT_ENV};
use overlayfs::descriptor;
use overlayfs::path::normalize;
use overlayfs::{EntryType, NodeSnapshot, ParseReport, Tree};

/// Get the vfs root with an optional override, falling back to OVERLAYFS_ROOT
pub fn get_vfs_root_with_override(override_path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path);
    }

    env::var(ROOT_ENV)
        .map_err(|_| anyhow!("{ROOT_ENV} environment variable not set"))
        .map(PathBuf::from)
}

/// Where the commands find the descriptor
#[derive(Debug, Clone)]
pub struct VfsContext {
    vfs_root: PathBuf,
}

/// A descriptor parsed into a tree, with the parser's report
pub struct LoadedTree {
    pub tree: Tree,
    pub report: ParseReport,
}

impl VfsContext {
    pub fn new<P: Into<PathBuf>>(vfs_root: P) -> Self {
        Self {
            vfs_root: vfs_root.into(),
        }
    }

    pub fn from_override(override_path: Option<PathBuf>) -> Result<Self> {
        get_vfs_root_with_override(override_path).map(Self::new)
    }

    #[must_use]
    pub fn vfs_root(&self) -> &Path {
        &self.vfs_root
    }

    #[must_use]
    pub fn descriptor_path(&self) -> PathBuf {
        self.vfs_root.join(DESCRIPTOR_FILE)
    }

    /// Reads vfs.json and builds its tree.
    ///
    /// A descriptor that stops early still yields the entries read so far.
    pub fn load_tree(&self) -> Result<LoadedTree> {
        let path = self.descriptor_path();
        log_debug!("Loading descriptor {path}", path: path.display().to_string());

        let bytes = std::fs::read(&path)
            .with_context(|| format!("Cannot read descriptor {}", path.display()))?;
        let text = descriptor::decode(&bytes);

        let mut tree = Tree::new();
        let root = tree.root();
        let report = descriptor::parse(&mut tree, root, &text);
        if let Some(error) = &report.error {
            log_warn!(
                "Descriptor {path} is incomplete: {error}",
                path: path.display().to_string(),
                error: error.to_string()
            );
        }
        Ok(LoadedTree { tree, report })
    }
}

/// A virtual path as typed by the operator: `/` accepted, no leading separator
#[must_use]
pub fn virtual_path_arg(arg: &str) -> String {
    normalize(arg).trim_start_matches('\\').to_string()
}

/// Counts `(folders, files)` below a snapshot, the snapshot itself excluded
#[must_use]
pub fn count_entries(snapshot: &NodeSnapshot) -> (usize, usize) {
    snapshot
        .children
        .iter()
        .fold((0, 0), |(folders, files), child| match child.entry_type {
            EntryType::File => (folders, files + 1),
            EntryType::Folder => {
                let (nested_folders, nested_files) = count_entries(child);
                (folders + 1 + nested_folders, files + nested_files)
            }
        })
}

/// One listing line: folders end with `\`, files show their backing path
#[must_use]
pub fn format_entry(name: &str, backing_path: Option<&str>) -> String {
    match backing_path {
        Some(backing) => format!("{name} -> {backing}"),
        None => format!("{name}\\"),
    }
}
