//! Box-drawing rendering of tree snapshots.
//!
//! ```text
//! C:\Game
//! ├─┬ BepInEx\
//! │ └─┬ core\
//! │   └── BepInEx.dll -> D:\mods\BepInEx\core\BepInEx.dll
//! └── winhttp.dll -> D:\mods\winhttp.dll
//! ```

use crate::node::EntryType;
use crate::tree::NodeSnapshot;

fn label(node: &NodeSnapshot) -> String {
    match (&node.entry_type, &node.backing_path) {
        (EntryType::File, Some(backing)) => format!("{} -> {}", node.name, backing),
        (EntryType::File, None) => node.name.clone(),
        (EntryType::Folder, _) => format!("{}\\", node.name),
    }
}

fn format_children(out: &mut String, children: &[NodeSnapshot], prefix: &str) {
    for (index, child) in children.iter().enumerate() {
        let last = index + 1 == children.len();
        let connector = match (last, child.children.is_empty()) {
            (true, true) => "└──",
            (true, false) => "└─┬",
            (false, true) => "├──",
            (false, false) => "├─┬",
        };
        out.push_str(prefix);
        out.push_str(connector);
        out.push(' ');
        out.push_str(&label(child));
        out.push('\n');

        if !child.children.is_empty() {
            let nested = format!("{prefix}{} ", if last { ' ' } else { '│' });
            format_children(out, &child.children, &nested);
        }
    }
}

/// Renders `root` with its descendants; the root line shows `title`
#[must_use]
pub fn format_tree(title: &str, root: &NodeSnapshot) -> String {
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    format_children(&mut out, &root.children, "");
    out
}
