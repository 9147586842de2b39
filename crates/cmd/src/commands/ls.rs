use anyhow::{Result, bail};
use diagnostics::log_debug;
use overlayfs::glob::matches;
use overlayfs::path::split_last;

use crate::common::{VfsContext, format_entry, virtual_path_arg};

/// Ls command - lists the entries of a virtual folder that match a pattern.
///
/// The argument is `<folder>\<pattern>`; a bare folder lists everything.
/// Only the virtual tree is listed, never the real directory beneath it.
pub fn ls_command<F>(ctx: &VfsContext, pattern: &str, dirs_only: bool, mut handler: F) -> Result<()>
where
    F: FnMut(&str),
{
    let output = ls_command_as_string(ctx, pattern, dirs_only)?;
    handler(&output);
    Ok(())
}

pub fn ls_command_as_string(ctx: &VfsContext, pattern: &str, dirs_only: bool) -> Result<String> {
    let loaded = ctx.load_tree()?;
    let tree = &loaded.tree;
    let argument = virtual_path_arg(pattern);

    // A bare folder name means "everything in it".
    let (folder, pattern) = match tree.resolve(tree.root(), &argument) {
        Some(id) if tree.get(id).is_some_and(|node| node.is_folder()) => (id, "*"),
        _ => {
            let (parent, leaf) = split_last(&argument);
            let Some(id) = tree.resolve(tree.root(), parent) else {
                bail!("{parent} is not in the virtual tree");
            };
            (id, leaf)
        }
    };
    let Some(children) = tree.get(folder).and_then(|node| node.children()) else {
        bail!("{} is a file, not a folder", tree.virtual_path(folder));
    };
    log_debug!(
        "Listing {folder} with {pattern}",
        folder: tree.virtual_path(folder),
        pattern: pattern
    );

    let mut output = String::new();
    for entry in children.iter().filter(|entry| matches(pattern, &entry.name)) {
        let backing = tree.get(entry.id).and_then(|node| node.backing_path());
        if dirs_only && backing.is_some() {
            continue;
        }
        output.push_str(&format_entry(&entry.name, backing));
        output.push('\n');
    }
    Ok(output)
}
