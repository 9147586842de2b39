use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use diagnostics::{log_debug, log_info};
use overlayfs::path::split;
use overlayfs::{NodeID, Tree, descriptor};

use crate::common::{count_entries, virtual_path_arg};

/// A host directory merged into the generated tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub dir: PathBuf,
    /// Virtual folder the layer lands in; the root when `None`
    pub under: Option<String>,
}

impl Layer {
    /// Parses `[<folder>=]<dir>`; `default_under` applies when no folder is named
    #[must_use]
    pub fn parse(spec: &str, default_under: Option<&str>) -> Self {
        match spec.split_once('=') {
            Some((folder, dir)) if !folder.is_empty() && !dir.is_empty() => Self {
                dir: PathBuf::from(dir),
                under: Some(folder.to_string()),
            },
            _ => Self {
                dir: PathBuf::from(spec),
                under: default_under.map(str::to_string),
            },
        }
    }
}

/// Generate command - builds a descriptor from host layer directories.
///
/// Later layers win: a file replaces any same-named entry merged before it,
/// and a directory replaces a same-named file. Directories of the same name
/// merge case-insensitively.
pub fn generate_command<F>(output: &Path, layers: &[Layer], mut handler: F) -> Result<()>
where
    F: FnMut(&str),
{
    let summary = generate_command_as_string(output, layers)?;
    handler(&summary);
    Ok(())
}

pub fn generate_command_as_string(output: &Path, layers: &[Layer]) -> Result<String> {
    let tree = build_tree(layers)?;
    let rendered = descriptor::render(&tree);
    fs::write(output, &rendered)
        .with_context(|| format!("Cannot write descriptor {}", output.display()))?;

    let (folders, files) = tree
        .snapshot(tree.root())
        .map_or((0, 0), |snapshot| count_entries(&snapshot));
    log_info!(
        "Wrote descriptor {path} with {files} files",
        path: output.display().to_string(),
        files: files
    );
    Ok(format!(
        "Wrote {} ({folders} folders, {files} files from {} layers)\n",
        output.display(),
        layers.len()
    ))
}

/// Merges every layer into one tree, in order
pub fn build_tree(layers: &[Layer]) -> Result<Tree> {
    let mut tree = Tree::new();
    for layer in layers {
        let mut parent = tree.root();
        if let Some(under) = &layer.under {
            for segment in split(&virtual_path_arg(under)) {
                parent = merge_folder(&mut tree, parent, segment)?;
            }
        }

        let dir = std::path::absolute(&layer.dir)
            .with_context(|| format!("Cannot resolve layer {}", layer.dir.display()))?;
        log_debug!(
            "Merging layer {dir} under {folder}",
            dir: dir.display().to_string(),
            folder: tree.virtual_path(parent)
        );
        merge_dir(&mut tree, parent, &dir)?;
    }
    Ok(tree)
}

/// The folder `name` under `parent`; a file in the way is replaced
fn merge_folder(tree: &mut Tree, parent: NodeID, name: &str) -> Result<NodeID> {
    if let Some(existing) = tree.child(parent, name)
        && tree.get(existing).is_some_and(|node| node.is_folder())
    {
        return Ok(existing);
    }
    Ok(tree.insert_folder(parent, name)?)
}

fn merge_dir(tree: &mut Tree, parent: NodeID, dir: &Path) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("Cannot read layer directory {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(fs::DirEntry::file_name);

    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();
        if path.is_dir() {
            let folder = merge_folder(tree, parent, &name)?;
            merge_dir(tree, folder, &path)?;
        } else {
            _ = tree.insert_file(parent, &name, &path.to_string_lossy())?;
        }
    }
    Ok(())
}
