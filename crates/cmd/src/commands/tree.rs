use anyhow::{Result, anyhow};
use overlayfs::tree_format::format_tree;

use crate::common::{VfsContext, count_entries};

/// Tree command - prints the virtual tree described by vfs.json
pub fn tree_command<F>(ctx: &VfsContext, json: bool, mut handler: F) -> Result<()>
where
    F: FnMut(&str),
{
    let output = tree_command_as_string(ctx, json)?;
    handler(&output);
    Ok(())
}

pub fn tree_command_as_string(ctx: &VfsContext, json: bool) -> Result<String> {
    let loaded = ctx.load_tree()?;
    let snapshot = loaded
        .tree
        .snapshot(loaded.tree.root())
        .ok_or_else(|| anyhow!("Descriptor tree has no root"))?;

    if json {
        let mut output = serde_json::to_string_pretty(&snapshot)?;
        output.push('\n');
        return Ok(output);
    }

    let title = ctx.descriptor_path().display().to_string();
    let mut output = format_tree(&title, &snapshot);
    let (folders, files) = count_entries(&snapshot);
    output.push_str(&format!("\n{folders} folders, {files} files\n"));
    if let Some(error) = &loaded.report.error {
        output.push_str(&format!("warning: descriptor stopped early: {error}\n"));
    }
    Ok(output)
}
