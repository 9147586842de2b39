use super::new_overlay;
use crate::error::Error;
use crate::host::{Disposition, FileAttributes, OpenRequest, RealFs};
use crate::memory::Call;
use crate::proxy::CwdProxy;

#[test]
fn test_enable_proxy_on_virtual_folder() {
    let overlay = new_overlay();
    overlay.set_current_directory("C:\\Game\\BepInEx").unwrap();

    assert!(overlay.proxy().is_enabled());
    assert_eq!(
        overlay.real().calls(),
        vec![
            Call::CreateDirectory("D:\\vfs\\__temp__\\BepInEx".to_string()),
            Call::SetCurrentDirectory("D:\\vfs\\__temp__\\BepInEx\\".to_string()),
        ]
    );

    assert_eq!(overlay.current_directory().unwrap(), "C:\\Game\\BepInEx");
    assert_eq!(
        overlay.real().current_directory().unwrap(),
        "D:\\vfs\\__temp__\\BepInEx"
    );
}

#[test]
fn test_relative_calls_use_tracked_folder() {
    let overlay = new_overlay();
    overlay.set_current_directory("c:\\game\\bepinex\\").unwrap();

    let dll = overlay
        .open("core\\BepInEx.dll", &OpenRequest::read())
        .unwrap();
    assert_eq!(dll.path, "D:\\mods\\BepInEx\\core\\BepInEx.dll");

    let created = overlay
        .open("BepInEx.cfg", &OpenRequest::create(Disposition::CreateNew))
        .unwrap();
    assert_eq!(created.path, "D:\\vfs\\__temp__\\BepInEx\\BepInEx.cfg");
    assert!(overlay.lookup("BepInEx\\BepInEx.cfg").is_some());

    // The same file through its absolute apparent path.
    let again = overlay
        .open("C:\\Game\\BepInEx\\bepinex.cfg", &OpenRequest::read())
        .unwrap();
    assert_eq!(again.path, created.path);

    assert_eq!(
        overlay.attributes("core").unwrap(),
        FileAttributes::DIRECTORY
    );
}

#[test]
fn test_search_under_proxy_reports_apparent_names() {
    let overlay = new_overlay();
    overlay.set_current_directory("C:\\Game\\BepInEx").unwrap();

    let (mut handle, first) = overlay.find_first("*").unwrap();
    assert!(handle.is_virtual());
    let second = overlay.find_next(&mut handle).unwrap();
    let mut names = vec![first.file_name, second.file_name];
    names.sort();
    assert_eq!(names, vec!["config", "core"]);
    overlay.find_close(handle).unwrap();
}

#[test]
fn test_leaving_scope_disables_proxy() {
    let overlay = new_overlay();
    overlay.set_current_directory("C:\\Game\\BepInEx").unwrap();
    overlay.real().clear_calls();

    overlay.set_current_directory("C:\\Windows").unwrap();
    assert_eq!(overlay.proxy(), CwdProxy::Disabled);
    assert_eq!(
        overlay.real().calls(),
        vec![Call::SetCurrentDirectory("C:\\Windows".to_string())]
    );
    assert_eq!(overlay.current_directory().unwrap(), "C:\\Windows");
}

#[test]
fn test_scope_root_and_real_folders_do_not_proxy() {
    let overlay = new_overlay();

    for path in ["C:\\Game", "C:\\Game\\Saves"] {
        overlay.set_current_directory(path).unwrap();
        assert!(!overlay.proxy().is_enabled());
    }
    assert_eq!(
        overlay.real().calls(),
        vec![
            Call::SetCurrentDirectory("C:\\Game".to_string()),
            Call::SetCurrentDirectory("C:\\Game\\Saves".to_string()),
        ]
    );
    assert_eq!(overlay.current_directory().unwrap(), "C:\\Game\\Saves");
}

#[test]
fn test_virtual_file_target_passes_through() {
    let overlay = new_overlay();
    let err = overlay
        .set_current_directory("C:\\Game\\winhttp.dll")
        .unwrap_err();
    assert!(err.is_delegated());
    assert!(!overlay.proxy().is_enabled());
}

#[test]
fn test_relative_chdir_under_proxy() {
    let overlay = new_overlay();
    overlay.set_current_directory("C:\\Game\\BepInEx").unwrap();

    overlay.set_current_directory("core").unwrap();
    assert_eq!(overlay.current_directory().unwrap(), "C:\\Game\\BepInEx\\core");
    assert_eq!(
        overlay.real().current_directory().unwrap(),
        "D:\\vfs\\__temp__\\BepInEx\\core"
    );

    overlay.set_current_directory("..\\..").unwrap();
    assert!(!overlay.proxy().is_enabled());
    assert_eq!(overlay.current_directory().unwrap(), "C:\\Game");
}

#[test]
fn test_removing_tracked_folder_moves_to_virtual_parent() {
    let overlay = new_overlay();
    overlay
        .set_current_directory("C:\\Game\\BepInEx\\config")
        .unwrap();
    assert!(overlay.proxy().is_enabled());
    overlay.real().clear_calls();

    overlay
        .remove_directory("C:\\Game\\BepInEx\\config")
        .unwrap();
    assert!(overlay.lookup("BepInEx\\config").is_none());

    // The application now sits in the parent folder, still virtual.
    assert!(overlay.proxy().is_enabled());
    assert_eq!(overlay.current_directory().unwrap(), "C:\\Game\\BepInEx");
    assert_eq!(
        overlay.real().calls(),
        vec![
            Call::CreateDirectory("D:\\vfs\\__temp__\\BepInEx".to_string()),
            Call::SetCurrentDirectory("D:\\vfs\\__temp__\\BepInEx\\".to_string()),
            Call::RemoveDirectory("D:\\vfs\\__temp__\\BepInEx\\config".to_string()),
        ]
    );
    assert_eq!(
        overlay.real().current_directory().unwrap(),
        "D:\\vfs\\__temp__\\BepInEx"
    );

    let dll = overlay
        .open("core\\BepInEx.dll", &OpenRequest::read())
        .unwrap();
    assert_eq!(dll.path, "D:\\mods\\BepInEx\\core\\BepInEx.dll");
}

#[test]
fn test_removing_top_level_tracked_folder_returns_to_scope_root() {
    let overlay = new_overlay();
    overlay.create_directory("C:\\Game\\Logs").unwrap();
    overlay.set_current_directory("C:\\Game\\Logs").unwrap();
    overlay.real().clear_calls();

    overlay.remove_directory("C:\\Game\\Logs").unwrap();
    assert_eq!(overlay.proxy(), CwdProxy::Disabled);
    assert_eq!(overlay.current_directory().unwrap(), "C:\\Game");
    assert!(!overlay.real().exists("D:\\vfs\\__temp__\\Logs"));
    assert_eq!(
        overlay.real().calls(),
        vec![
            Call::SetCurrentDirectory("C:\\Game".to_string()),
            Call::RemoveDirectory("D:\\vfs\\__temp__\\Logs".to_string()),
            Call::CurrentDirectory,
        ]
    );
}

#[test]
fn test_failed_chdir_keeps_error_class() {
    let overlay = new_overlay();
    let err = overlay.set_current_directory("C:\\Nowhere").unwrap_err();
    assert!(matches!(err, Error::Delegated(_)));
    assert_eq!(err.last_error_code(), 0);
}
