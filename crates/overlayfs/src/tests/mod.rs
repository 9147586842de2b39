mod cwd;

use crate::engine::Overlay;
use crate::memory::MemoryFs;

pub(crate) const SCOPE: &str = "C:\\Game";
pub(crate) const SCRATCH: &str = "D:\\vfs\\__temp__";

const DESCRIPTOR: &str = r#"{
    "BepInEx": {
        "core": {"BepInEx.dll": "D:\\mods\\BepInEx\\core\\BepInEx.dll"},
        "config": {}
    },
    "docs": {
        "a.txt": "D:\\mods\\a.txt",
        "b.TXT": "D:\\mods\\b.TXT",
        "c.ini": "D:\\mods\\c.ini"
    },
    "ghost.dat": "D:\\mods\\missing\\ghost.dat",
    "winhttp.dll": "D:\\mods\\winhttp.dll"
}"#;

/// An overlay over a game directory with a few mod files mapped in.
/// The journal starts empty.
pub(crate) fn new_overlay() -> Overlay<MemoryFs> {
    let fs = MemoryFs::new(SCOPE);
    fs.add_file("C:\\Game\\Game.exe", b"exe");
    fs.add_dir("C:\\Game\\Saves");
    fs.add_dir("C:\\Windows");
    fs.add_file("D:\\mods\\BepInEx\\core\\BepInEx.dll", b"dll");
    fs.add_file("D:\\mods\\a.txt", b"a");
    fs.add_file("D:\\mods\\b.TXT", b"bb");
    fs.add_file("D:\\mods\\c.ini", b"ccc");
    fs.add_file("D:\\mods\\winhttp.dll", b"proxy");

    let overlay = Overlay::new(fs, SCOPE, SCRATCH, DESCRIPTOR).unwrap();
    assert!(overlay.descriptor_report().is_complete());
    overlay.real().clear_calls();
    overlay
}
