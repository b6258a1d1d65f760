//! Declaration and settings file handling: error messages, atomic writes,
//! and on-disk layout under `~/.converge/`.

use assert_fs::prelude::*;
use converge_core::{declared, settings, AccountId, CoreError, Settings, WorkspaceId};
use predicates::prelude::predicate;

// ---------------------------------------------------------------------------
// 1. Declarations
// ---------------------------------------------------------------------------

#[test]
fn missing_declaration_names_the_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.child("absent.yaml");
    let err = declared::load_at(path.path()).unwrap_err();
    assert!(matches!(err, CoreError::DeclarationNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("absent.yaml"));
}

#[test]
fn malformed_declaration_is_a_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("core.yaml");
    file.write_str("name: core\ntag_ids: [unclosed\n").expect("write");

    let err = declared::load_at(file.path()).unwrap_err();
    assert!(matches!(err, CoreError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("core.yaml"));
}

#[test]
fn unknown_declaration_field_is_rejected() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("core.yaml");
    file.write_str("name: core\norganization: my-org\n").expect("write");

    let err = declared::load_at(file.path()).unwrap_err();
    assert!(err.to_string().contains("organization"), "got: {err}");
}

#[test]
fn declaration_loads_from_disk() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("core.yaml");
    file.write_str(
        "id: ws-1\nname: core\naccount_id: acc-1\ntag_ids: [t1]\nremote_state_consumers: ['*']\n",
    )
    .expect("write");

    let decl = declared::load_at(file.path()).expect("load");
    assert_eq!(decl.id, Some(WorkspaceId::from("ws-1")));
    assert_eq!(decl.account_id, Some(AccountId::from("acc-1")));
    assert_eq!(decl.tag_ids, vec!["t1".to_string()]);
    assert!(decl.provider_configuration.is_empty());
}

// ---------------------------------------------------------------------------
// 2. Settings
// ---------------------------------------------------------------------------

#[test]
fn settings_roundtrip_through_config_yaml() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let written = Settings {
        hostname: Some("converge.example.io".into()),
        token: Some("secret".into()),
        default_account_id: Some(AccountId::from("acc-1")),
        page_size: Some(50),
    };
    settings::save_at(home.path(), &written).expect("save");

    home.child(".converge/config.yaml")
        .assert(predicate::path::exists())
        .assert(predicate::str::contains("converge.example.io"));
    home.child(".converge/config.yaml.tmp")
        .assert(predicate::path::missing());

    let loaded = settings::load_at(home.path()).expect("load");
    assert_eq!(loaded, written);
    assert_eq!(loaded.page_size(), 50);
}

#[test]
fn corrupt_settings_report_the_file() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".converge/config.yaml")
        .write_str("hostname: [a, b\n")
        .expect("write");

    let err = settings::load_at(home.path()).unwrap_err();
    assert!(matches!(err, CoreError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"));
}

#[cfg(unix)]
#[test]
fn settings_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let home = assert_fs::TempDir::new().expect("tempdir");
    settings::save_at(home.path(), &Settings::default()).expect("save");
    let mode = std::fs::metadata(settings::path_at(home.path()))
        .expect("metadata")
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}
