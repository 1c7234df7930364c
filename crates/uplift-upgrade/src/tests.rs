use super::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use uplift_core::{PackageRecord, PackageStatus, RunLog, SettingsSnapshot};
use uplift_platform::{
    InstanceLayout, ProviderConfig, ProviderConfigStore, RecordStore, ORGANIZATION_NAME_PROPERTY,
};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const KEY: &str = "acme_connector";
const PROVIDER: &str = "acme";

static TEST_DIR_SEQ: AtomicU64 = AtomicU64::new(0);

fn test_layout(label: &str) -> InstanceLayout {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let seq = TEST_DIR_SEQ.fetch_add(1, Ordering::SeqCst);
    let root = std::env::temp_dir().join(format!("uplift-upgrade-{label}-{nanos}-{seq}"));
    let layout = InstanceLayout::new(root);
    layout.ensure_base_dirs().expect("must create base dirs");
    layout
}

fn cleanup(layout: &InstanceLayout) {
    let _ = fs::remove_dir_all(layout.instance_root());
}

fn open_log(layout: &InstanceLayout, label: &str) -> RunLog {
    RunLog::open(&layout.cache_dir().join(format!("{label}.log"))).expect("must open log")
}

fn read_log(log_path: &Path) -> String {
    fs::read_to_string(log_path).expect("must read log")
}

fn write_tree_file(layout: &InstanceLayout, relative: &str, content: &str) {
    let path = layout.connectors_dir().join(relative);
    fs::create_dir_all(path.parent().expect("must have parent")).expect("must create dirs");
    fs::write(&path, content).expect("must write file");
}

fn write_installed_record(layout: &InstanceLayout, id: &str, version: &str, files: &[&str]) {
    let record = PackageRecord {
        id: id.to_string(),
        key: KEY.to_string(),
        version: version.to_string(),
        status: PackageStatus::Installed,
        deleted: false,
        artifact_path: None,
        artifact_sha256: None,
        files: files.iter().map(|f| f.to_string()).collect(),
        updated_at_unix: 1,
    };
    RecordStore::new(layout).write(&record).expect("must write record");
}

fn write_provider_config(layout: &InstanceLayout, organization: &str, modules: &[&str]) {
    let mut config = ProviderConfig::default();
    config
        .properties
        .insert(ORGANIZATION_NAME_PROPERTY.to_string(), organization.to_string());
    for module in modules {
        config
            .mapping
            .beans
            .insert(module.to_string(), module.trim_end_matches('s').to_string());
    }
    ProviderConfigStore::new(layout)
        .save(PROVIDER, &config)
        .expect("must save provider config");
}

fn write_display_map(layout: &InstanceLayout, entries: &[(&str, &[&str])]) {
    let mut map = uplift_core::ModuleProviderMap::new();
    for (module, providers) in entries {
        map.insert(
            module.to_string(),
            providers.iter().map(|p| p.to_string()).collect(),
        );
    }
    ProviderConfigStore::new(layout)
        .save_module_map(&map)
        .expect("must save display map");
}

fn build_artifact(path: &Path, version: &str, files: &[(&str, &str)]) {
    let listed = files
        .iter()
        .map(|(name, _)| format!("\"{name}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let manifest = format!(
        "key = \"{KEY}\"\nversion = \"{version}\"\nprovider = \"{PROVIDER}\"\nfiles = [{listed}]\n"
    );

    let file = File::create(path).expect("must create archive");
    let mut writer = ZipWriter::new(file);
    writer
        .start_file("connector.toml".to_string(), SimpleFileOptions::default())
        .expect("must start manifest");
    writer
        .write_all(manifest.as_bytes())
        .expect("must write manifest");
    for (name, content) in files {
        writer
            .start_file(format!("payload/{name}"), SimpleFileOptions::default())
            .expect("must start payload");
        writer
            .write_all(content.as_bytes())
            .expect("must write payload");
    }
    writer.finish().expect("must finish archive");
}

#[test]
fn legacy_backup_threshold_uses_lenient_versions() {
    assert!(Upgrader::legacy_backup_needed("2.0").expect("must compare"));
    assert!(!Upgrader::legacy_backup_needed("2.2").expect("must compare"));
    assert!(!Upgrader::legacy_backup_needed("2.1").expect("must compare"));
}

#[test]
fn missing_installed_record_aborts_before_any_mutation() {
    let layout = test_layout("not-installed");
    let artifact = layout.instance_root().join("acme-2.2.zip");
    build_artifact(&artifact, "2.2", &[]);

    let mut log = open_log(&layout, "upgrade");
    let log_path = log.path().to_path_buf();
    let upgrader = Upgrader::new(&layout, KEY, PROVIDER, &artifact);
    let err = upgrader.run(&mut log).expect_err("must fail");
    log.close().expect("must close log");

    assert!(matches!(err, UpgradeError::NotInstalled { .. }));
    assert!(!layout.settings_snapshot_path().exists());
    assert!(!layout.backup_dir().exists());
    assert!(RecordStore::new(&layout).read_all().expect("must read").is_empty());
    assert!(!read_log(&log_path).contains("Uninstall"));

    cleanup(&layout);
}

#[test]
fn upgrade_from_legacy_version_backs_up_restores_and_merges_settings() {
    let layout = test_layout("scenario-a");

    write_tree_file(&layout, "sources/ext/rest/acme/acme.toml", "old payload");
    write_tree_file(&layout, "sources/ext/rest/custom_feed/feed.toml", "keep me");
    write_tree_file(&layout, "formatters/ext/rest/custom_fmt/fmt.toml", "keep me too");
    write_installed_record(
        &layout,
        "pkg-old",
        "2.0",
        &["sources/ext/rest/acme/acme.toml"],
    );
    write_provider_config(&layout, "Acme Corp", &["Accounts", "Contacts"]);
    write_display_map(
        &layout,
        &[
            ("Accounts", &["other"]),
            ("Contacts", &[PROVIDER]),
            ("Leads", &[PROVIDER]),
            ("Cases", &["other"]),
        ],
    );

    let artifact = layout.instance_root().join("acme-2.2.zip");
    build_artifact(
        &artifact,
        "2.2",
        &[
            ("sources/ext/rest/acme/client_v2.toml", "new payload"),
            (
                "acme/config.toml",
                "[properties]\norganization_name = \"\"\n\n[mapping.beans]\nAccounts = \"Account\"\nContacts = \"Contact\"\nLeads = \"Lead\"\n",
            ),
        ],
    );

    let mut log = open_log(&layout, "upgrade");
    let log_path = log.path().to_path_buf();
    let upgrader = Upgrader::new(&layout, KEY, PROVIDER, &artifact);
    let installed = upgrader.run(&mut log).expect("upgrade must succeed");
    log.close().expect("must close log");

    assert_eq!(installed.status, PackageStatus::Installed);
    assert_eq!(installed.version, "2.2");

    let connectors = layout.connectors_dir();
    assert!(connectors.join("sources/ext/rest/custom_feed/feed.toml").is_file());
    assert!(connectors.join("formatters/ext/rest/custom_fmt/fmt.toml").is_file());
    assert!(!connectors.join("sources/ext/rest/acme/acme.toml").exists());
    assert!(connectors.join("sources/ext/rest/acme/client_v2.toml").is_file());

    assert!(!layout.backup_dir().exists());
    assert!(!layout.settings_snapshot_path().exists());

    let store = ProviderConfigStore::new(&layout);
    let config = store.load(PROVIDER).expect("must load config");
    assert_eq!(
        config.properties.get(ORGANIZATION_NAME_PROPERTY).map(String::as_str),
        Some("Acme Corp")
    );
    let map = store.module_map().expect("must load map");
    assert!(map.get("Accounts").expect("Accounts must stay").contains(PROVIDER));
    assert!(map.get("Contacts").expect("Contacts must stay").contains(PROVIDER));
    assert!(!map.contains_key("Leads"));
    assert_eq!(
        map.get("Cases").expect("Cases must stay").iter().collect::<Vec<_>>(),
        vec!["other"]
    );

    let log_content = read_log(&log_path);
    assert!(log_content.contains("Backup connector files"));
    assert!(log_content.contains("Uninstall connector package"));
    assert!(log_content.contains("Install connector package"));
    assert!(log_content.contains("Restore connector settings"));

    cleanup(&layout);
}

#[test]
fn modern_version_skips_the_file_backup_pass() {
    let layout = test_layout("no-backup");
    write_tree_file(&layout, "sources/ext/rest/acme/acme.toml", "current payload");
    write_installed_record(
        &layout,
        "pkg-cur",
        "2.1",
        &["sources/ext/rest/acme/acme.toml"],
    );
    write_provider_config(&layout, "Acme Corp", &["Accounts"]);
    write_display_map(&layout, &[("Accounts", &[PROVIDER])]);

    let artifact = layout.instance_root().join("acme-2.2.zip");
    build_artifact(
        &artifact,
        "2.2",
        &[("sources/ext/rest/acme/client_v2.toml", "new payload")],
    );

    let mut log = open_log(&layout, "upgrade");
    let log_path = log.path().to_path_buf();
    let upgrader = Upgrader::new(&layout, KEY, PROVIDER, &artifact);
    upgrader.run(&mut log).expect("upgrade must succeed");
    log.close().expect("must close log");

    assert!(!layout.backup_dir().exists());
    assert!(!read_log(&log_path).contains("Backup connector files"));

    cleanup(&layout);
}

#[test]
fn install_reporting_failed_status_aborts_and_keeps_snapshot() {
    let layout = test_layout("scenario-b");
    write_installed_record(&layout, "pkg-cur", "2.2", &[]);
    write_provider_config(&layout, "Acme Corp", &["Accounts"]);
    write_display_map(&layout, &[("Accounts", &[PROVIDER])]);

    let artifact = layout.instance_root().join("acme-2.3.zip");
    build_artifact(&artifact, "2.3", &[("../outside.toml", "escape")]);

    let mut log = open_log(&layout, "upgrade");
    let upgrader = Upgrader::new(&layout, KEY, PROVIDER, &artifact);
    let err = upgrader.run(&mut log).expect_err("must fail");
    log.close().expect("must close log");

    assert!(matches!(err, UpgradeError::Install { .. }));
    assert!(err.to_string().contains("failed"));
    assert!(layout.settings_snapshot_path().exists());

    cleanup(&layout);
}

#[test]
fn rejected_upload_aborts_and_leaves_recovery_state() {
    let layout = test_layout("upload-rejected");
    write_tree_file(&layout, "sources/ext/rest/acme/acme.toml", "old payload");
    write_installed_record(
        &layout,
        "pkg-old",
        "2.0",
        &["sources/ext/rest/acme/acme.toml"],
    );
    write_provider_config(&layout, "Acme Corp", &["Accounts"]);
    write_display_map(&layout, &[("Accounts", &[PROVIDER])]);

    let artifact = layout.instance_root().join("acme-2.2.zip");
    fs::write(&artifact, "not an archive").expect("must write");

    let mut log = open_log(&layout, "upgrade");
    let upgrader = Upgrader::new(&layout, KEY, PROVIDER, &artifact);
    let err = upgrader.run(&mut log).expect_err("must fail");
    log.close().expect("must close log");

    assert!(matches!(err, UpgradeError::Upload { .. }));
    assert!(layout.settings_snapshot_path().exists());
    let records = RecordStore::new(&layout).read_all().expect("must read");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, PackageStatus::Uninstalled);

    cleanup(&layout);
}

#[test]
fn duplicate_installed_records_win_by_storage_order_with_a_warning() {
    let layout = test_layout("duplicates");
    write_installed_record(&layout, "pkg-a", "2.1", &[]);
    write_installed_record(&layout, "pkg-b", "2.2", &[]);
    write_provider_config(&layout, "Acme Corp", &["Accounts"]);
    write_display_map(&layout, &[("Accounts", &[PROVIDER])]);

    let artifact = layout.instance_root().join("acme-2.3.zip");
    build_artifact(
        &artifact,
        "2.3",
        &[("sources/ext/rest/acme/client_v2.toml", "new payload")],
    );

    let mut log = open_log(&layout, "upgrade");
    let log_path = log.path().to_path_buf();
    let upgrader = Upgrader::new(&layout, KEY, PROVIDER, &artifact);
    upgrader.run(&mut log).expect("upgrade must succeed");
    log.close().expect("must close log");

    let log_content = read_log(&log_path);
    assert!(log_content.contains("Warning: 2 installed records"));
    assert!(log_content.contains("proceeding with 'pkg-a'"));

    cleanup(&layout);
}

#[test]
fn fresh_run_overwrites_a_stale_snapshot_from_an_aborted_run() {
    let layout = test_layout("stale-snapshot");
    write_installed_record(&layout, "pkg-cur", "2.2", &[]);
    write_provider_config(&layout, "Acme Corp", &["Accounts"]);
    write_display_map(&layout, &[("Accounts", &[PROVIDER])]);

    let stale = SettingsSnapshot {
        organization_name: "Stale Org".to_string(),
        enabled_modules: ["Leads".to_string()].into_iter().collect(),
    };
    stale
        .save(&layout.settings_snapshot_path())
        .expect("must seed stale snapshot");

    let artifact = layout.instance_root().join("acme-2.3.zip");
    build_artifact(
        &artifact,
        "2.3",
        &[("sources/ext/rest/acme/client_v2.toml", "new payload")],
    );

    let mut log = open_log(&layout, "upgrade");
    let upgrader = Upgrader::new(&layout, KEY, PROVIDER, &artifact);
    upgrader.run(&mut log).expect("upgrade must succeed");
    log.close().expect("must close log");

    assert!(!layout.settings_snapshot_path().exists());
    let config = ProviderConfigStore::new(&layout)
        .load(PROVIDER)
        .expect("must load config");
    assert_eq!(
        config.properties.get(ORGANIZATION_NAME_PROPERTY).map(String::as_str),
        Some("Acme Corp")
    );

    cleanup(&layout);
}
