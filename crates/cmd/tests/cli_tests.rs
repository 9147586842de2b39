use std::fs;
use std::path::Path;

use anyhow::Result;
use tempfile::tempdir;

use cmd::commands::generate::{Layer, generate_command_as_string};
use cmd::commands::ls::ls_command_as_string;
use cmd::commands::resolve::resolve_command_as_string;
use cmd::commands::tree::tree_command_as_string;
use cmd::common::VfsContext;

const DESCRIPTOR: &str = r#"{
    "BepInEx": {
        "core": {"BepInEx.dll": "D:\\mods\\BepInEx\\core\\BepInEx.dll"},
        "config": {},
        "plugins": {"A.dll": "D:\\mods\\A.dll", "b.DLL": "D:\\mods\\b.DLL", "readme.md": "D:\\mods\\readme.md"}
    },
    "winhttp.dll": "D:\\mods\\winhttp.dll"
}"#;

/// Setup a vfs root holding `descriptor` as vfs.json
fn setup_vfs(descriptor: &str) -> Result<(tempfile::TempDir, VfsContext)> {
    let tmp = tempdir()?;
    fs::write(tmp.path().join("vfs.json"), descriptor)?;
    let ctx = VfsContext::new(tmp.path());
    Ok((tmp, ctx))
}

fn layer(dir: &Path) -> Layer {
    Layer::parse(&dir.to_string_lossy(), None)
}

#[test]
fn test_tree_prints_box_drawing() -> Result<()> {
    let (_tmp, ctx) = setup_vfs(DESCRIPTOR)?;
    let output = tree_command_as_string(&ctx, false)?;

    let expected = "\
├─┬ BepInEx\\
│ ├── config\\
│ ├─┬ core\\
│ │ └── BepInEx.dll -> D:\\mods\\BepInEx\\core\\BepInEx.dll
│ └─┬ plugins\\
│   ├── A.dll -> D:\\mods\\A.dll
│   ├── b.DLL -> D:\\mods\\b.DLL
│   └── readme.md -> D:\\mods\\readme.md
└── winhttp.dll -> D:\\mods\\winhttp.dll
";
    assert!(output.contains(expected), "{output}");
    assert!(output.ends_with("4 folders, 5 files\n"), "{output}");
    assert!(!output.contains("warning"));
    Ok(())
}

#[test]
fn test_tree_json() -> Result<()> {
    let (_tmp, ctx) = setup_vfs(DESCRIPTOR)?;
    let output = tree_command_as_string(&ctx, true)?;
    let value: serde_json::Value = serde_json::from_str(&output)?;

    let top = value["children"].as_array().expect("root children");
    assert_eq!(top.len(), 2);
    assert_eq!(top[0]["name"], "BepInEx");
    assert_eq!(top[0]["type"], "folder");
    assert_eq!(top[1]["backing_path"], "D:\\mods\\winhttp.dll");
    Ok(())
}

#[test]
fn test_tree_reports_partial_descriptor() -> Result<()> {
    let (_tmp, ctx) = setup_vfs(r#"{"ok": "D:\\ok.txt", "bad": [1]}"#)?;
    let output = tree_command_as_string(&ctx, false)?;
    assert!(output.contains("ok -> D:\\ok.txt"), "{output}");
    assert!(output.contains("warning: descriptor stopped early"), "{output}");
    Ok(())
}

#[test]
fn test_missing_descriptor_is_an_error() -> Result<()> {
    let tmp = tempdir()?;
    let ctx = VfsContext::new(tmp.path());
    let err = tree_command_as_string(&ctx, false).expect_err("no vfs.json");
    assert!(err.to_string().contains("Cannot read descriptor"), "{err}");
    Ok(())
}

#[test]
fn test_resolve() -> Result<()> {
    let (_tmp, ctx) = setup_vfs(DESCRIPTOR)?;

    assert_eq!(
        resolve_command_as_string(&ctx, "bepinex/CORE/bepinex.dll")?,
        "BepInEx\\core\\BepInEx.dll -> D:\\mods\\BepInEx\\core\\BepInEx.dll\n"
    );
    assert_eq!(
        resolve_command_as_string(&ctx, "BepInEx\\plugins\\")?,
        "BepInEx\\plugins\\ (virtual folder, 3 entries)\n"
    );
    assert!(resolve_command_as_string(&ctx, "BepInEx\\missing").is_err());
    assert!(resolve_command_as_string(&ctx, "winhttp.dll\\below").is_err());
    Ok(())
}

#[test]
fn test_ls_with_pattern() -> Result<()> {
    let (_tmp, ctx) = setup_vfs(DESCRIPTOR)?;

    assert_eq!(
        ls_command_as_string(&ctx, "BepInEx\\plugins\\*.dll", false)?,
        "A.dll -> D:\\mods\\A.dll\nb.DLL -> D:\\mods\\b.DLL\n"
    );
    assert_eq!(
        ls_command_as_string(&ctx, "BepInEx/plugins/?.*", false)?,
        "A.dll -> D:\\mods\\A.dll\nb.DLL -> D:\\mods\\b.DLL\n"
    );
    assert_eq!(ls_command_as_string(&ctx, "BepInEx\\plugins\\*.exe", false)?, "");
    Ok(())
}

#[test]
fn test_ls_folder_and_root() -> Result<()> {
    let (_tmp, ctx) = setup_vfs(DESCRIPTOR)?;

    assert_eq!(
        ls_command_as_string(&ctx, "bepinex", false)?,
        "config\\\ncore\\\nplugins\\\n"
    );
    assert_eq!(
        ls_command_as_string(&ctx, "", false)?,
        "BepInEx\\\nwinhttp.dll -> D:\\mods\\winhttp.dll\n"
    );
    assert_eq!(ls_command_as_string(&ctx, "*", true)?, "BepInEx\\\n");
    assert!(ls_command_as_string(&ctx, "nowhere\\*", false).is_err());
    Ok(())
}

#[test]
fn test_generate_then_inspect() -> Result<()> {
    let tmp = tempdir()?;
    let core = tmp.path().join("layers").join("BepInEx");
    let mod_a = tmp.path().join("layers").join("ModA");
    fs::create_dir_all(core.join("core"))?;
    fs::create_dir_all(mod_a.join("plugins"))?;
    fs::write(core.join("core").join("BepInEx.dll"), "core")?;
    fs::write(mod_a.join("plugins").join("ModA.dll"), "a")?;
    fs::write(mod_a.join("winhttp.dll"), "proxy")?;

    let vfs_root = tmp.path().join("vfs");
    fs::create_dir_all(&vfs_root)?;
    let ctx = VfsContext::new(&vfs_root);

    let layers = [
        Layer::parse(&format!("BepInEx={}", core.to_string_lossy()), None),
        layer(&mod_a),
    ];
    let summary = generate_command_as_string(&ctx.descriptor_path(), &layers)?;
    assert!(summary.contains("3 folders, 3 files from 2 layers"), "{summary}");

    let resolved = resolve_command_as_string(&ctx, "BepInEx\\core\\BepInEx.dll")?;
    assert!(resolved.ends_with("BepInEx.dll\n"), "{resolved}");
    assert!(resolved.contains(&*core.to_string_lossy()), "{resolved}");

    let listing = ls_command_as_string(&ctx, "*", false)?;
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines.len(), 3, "{listing}");
    assert_eq!(lines[0], "BepInEx\\");
    assert_eq!(lines[1], "plugins\\");
    assert!(lines[2].starts_with("winhttp.dll -> "));
    Ok(())
}

#[test]
fn test_generate_under_named_folder() -> Result<()> {
    let tmp = tempdir()?;
    let layer_dir = tmp.path().join("layer");
    fs::create_dir_all(&layer_dir)?;
    fs::write(layer_dir.join("a.txt"), "a")?;

    let output = tmp.path().join("out.json");
    let layers = [Layer::parse(&layer_dir.to_string_lossy(), Some("Mods/Extra"))];
    _ = generate_command_as_string(&output, &layers)?;

    let ctx = VfsContext::new(tmp.path());
    fs::rename(&output, ctx.descriptor_path())?;
    let resolved = resolve_command_as_string(&ctx, "mods\\extra\\A.TXT")?;
    assert!(resolved.starts_with("Mods\\Extra\\a.txt -> "), "{resolved}");
    Ok(())
}
