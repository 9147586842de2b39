use anyhow::{Result, bail};
use diagnostics::log_debug;

use crate::common::{VfsContext, virtual_path_arg};

/// Resolve command - shows what a virtual path is backed by
pub fn resolve_command<F>(ctx: &VfsContext, path: &str, mut handler: F) -> Result<()>
where
    F: FnMut(&str),
{
    let output = resolve_command_as_string(ctx, path)?;
    handler(&output);
    Ok(())
}

pub fn resolve_command_as_string(ctx: &VfsContext, path: &str) -> Result<String> {
    let virtual_path = virtual_path_arg(path);
    log_debug!("Resolving {path}", path: virtual_path.as_str());

    let loaded = ctx.load_tree()?;
    let tree = &loaded.tree;
    let Some(id) = tree.resolve(tree.root(), &virtual_path) else {
        bail!("{virtual_path} is not in the virtual tree");
    };
    let Some(node) = tree.get(id) else {
        bail!("{virtual_path} is not in the virtual tree");
    };

    let stored = tree.virtual_path(id);
    Ok(match node.backing_path() {
        Some(backing) => format!("{stored} -> {backing}\n"),
        None => {
            let entries = node.children().map_or(0, |children| children.len());
            format!("{stored}\\ (virtual folder, {entries} entries)\n")
        }
    })
}
