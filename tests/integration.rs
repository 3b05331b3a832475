//! Integration tests for the inventory store.

use chrono::NaiveDate;
use std::fs;
use std::time::Duration;
use stockroom::{
    AssetInput, AssetStatus, AuditLog, Department, ImageData, LogAction, Store, StoreConfig,
    StoreEvent, SubscriptionConfig, SubscriptionFilter, VerificationStatus, VerificationStep,
};
use tempfile::TempDir;

fn test_store(dir: &TempDir) -> Store {
    Store::create(StoreConfig {
        path: dir.path().join("inventory"),
        image_cache_size: 16,
        create_if_missing: true,
    })
    .unwrap()
}

fn reopen_store(dir: &TempDir) -> Store {
    Store::open(StoreConfig {
        path: dir.path().join("inventory"),
        image_cache_size: 16,
        create_if_missing: false,
    })
    .unwrap()
}

// --- Realistic Workflow Tests ---

#[test]
fn test_register_and_stock_in() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    let asset = store
        .add_asset(AssetInput::new("JTAPNB-000001", "PF00001"), "Alice")
        .unwrap();

    assert_eq!(store.assets().len(), 1);
    assert_eq!(asset.status, AssetStatus::InStock);

    let logs = store.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, LogAction::Add);
    assert_eq!(logs[0].details, "Initial stock in");
    assert_eq!(logs[0].admin_user, "Alice");
    assert_eq!(logs[0].computer_no, "JTAPNB-000001");
}

#[test]
fn test_check_out_then_check_in() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    let asset = store
        .add_asset(AssetInput::new("JTAPNB-000001", "PF00001"), "Alice")
        .unwrap();

    // Assign to Bob
    let mut checked_out = asset.clone();
    checked_out.status = AssetStatus::InUse;
    checked_out.owner = Some("Bob".into());
    checked_out.emp_id = Some("E1".into());
    checked_out.department = Some(Department::It);
    checked_out.distribution_date = NaiveDate::from_ymd_opt(2026, 3, 5);
    store
        .update_asset(
            checked_out,
            "Alice",
            LogAction::CheckOut,
            "Assigned to Bob (ID: E1, Dept: IT)",
        )
        .unwrap();

    // Return to stock
    let mut returned = store.assets()[0].clone();
    returned.status = AssetStatus::InStock;
    returned.owner = None;
    returned.emp_id = None;
    returned.department = None;
    store
        .update_asset(returned, "Alice", LogAction::CheckIn, "Returned from Bob")
        .unwrap();

    let final_asset = &store.assets()[0];
    assert_eq!(final_asset.status, AssetStatus::InStock);
    assert_eq!(final_asset.owner, None);

    // Newest first: Check-in, Check-out, Add
    let logs = store.logs();
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0].action, LogAction::CheckIn);
    assert_eq!(logs[1].action, LogAction::CheckOut);
    assert_eq!(logs[2].action, LogAction::Add);

    // Check-in details carry the distribution-date provenance
    assert_eq!(logs[0].details, "Returned from Bob (distributed 05 Mar 2026)");
}

#[test]
fn test_dispose_keeps_asset_queryable() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    let asset = store
        .add_asset(AssetInput::new("JTAPNB-000001", "PF00001"), "Alice")
        .unwrap();

    let mut disposed = asset.clone();
    disposed.status = AssetStatus::Disposed;
    store
        .update_asset(disposed, "Alice", LogAction::Dispose, "Asset Disposed")
        .unwrap();

    // Disposal is a status transition, not a deletion
    assert_eq!(store.assets().len(), 1);
    let current = store.get_asset(&asset.id).unwrap();
    assert_eq!(current.status, AssetStatus::Disposed);

    // Restore brings it back to stock
    let mut restored = current.clone();
    restored.status = AssetStatus::InStock;
    store
        .update_asset(restored, "Alice", LogAction::Update, "Asset Restored")
        .unwrap();
    assert_eq!(
        store.get_asset(&asset.id).unwrap().status,
        AssetStatus::InStock
    );
}

#[test]
fn test_delete_batch_skips_unknown_ids() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    let asset = store
        .add_asset(AssetInput::new("JTAPNB-000001", "PF00001"), "Alice")
        .unwrap();

    let removed = store
        .delete_assets(&[asset.id.clone(), "id2".into()], "Alice")
        .unwrap();

    assert_eq!(removed, 1);
    assert!(store.assets().is_empty());

    // Exactly one Delete entry, for the asset that existed, with the
    // business keys denormalized into it.
    let logs = store.logs();
    assert_eq!(logs[0].action, LogAction::Delete);
    assert_eq!(logs[0].asset_id, asset.id);
    assert_eq!(logs[0].computer_no, "JTAPNB-000001");
    assert_eq!(
        logs.iter().filter(|l| l.action == LogAction::Delete).count(),
        1
    );
}

#[test]
fn test_bulk_import_upserts_by_partial_key() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    let original = store
        .add_asset(AssetInput::new("A1", "S1"), "Alice")
        .unwrap();

    // Same serialNo, different computerNo: overwrites in place
    let mut overwrite = AssetInput::new("A2", "S1");
    overwrite.brand = Some("Lenovo".into());
    // No key overlap: appended as new
    let fresh = AssetInput::new("B1", "S9");

    let summary = store.import_assets(vec![overwrite, fresh], "Alice").unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.added, 1);

    let assets = store.assets();
    assert_eq!(assets.len(), 2);

    let updated = store.get_asset(&original.id).unwrap();
    assert_eq!(updated.computer_no, "A2");
    assert_eq!(updated.brand.as_deref(), Some("Lenovo"));

    // Batch logs prepended together, newest first
    let logs = store.logs();
    assert_eq!(logs[0].action, LogAction::Add);
    assert_eq!(logs[0].details, "Batch import");
    assert_eq!(logs[1].action, LogAction::Update);
    assert_eq!(logs[1].details, "Batch import overwrite");
}

// --- Audit Workflow ---

#[test]
fn test_audit_save_and_two_step_verification() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    let mut ids = Vec::new();
    for i in 0..10 {
        let asset = store
            .add_asset(
                AssetInput::new(format!("JTAPNB-{i:06}"), format!("PF{i:05}")),
                "Alice",
            )
            .unwrap();
        ids.push(asset.id);
    }

    let scanned: Vec<_> = ids[..7].to_vec();
    let missing: Vec<_> = ids[7..].to_vec();
    let log = AuditLog::new("Dana", scanned.clone(), missing.clone());
    let log_id = log.id.clone();

    store.save_audit_log(log).unwrap();

    let saved = &store.audit_logs()[0];
    assert_eq!(saved.total_assets, 10);
    assert_eq!(saved.scanned_count, 7);
    assert_eq!(saved.missing_count, 3);
    assert_eq!(saved.scanned_ids, scanned);
    assert_eq!(saved.missing_ids, missing);
    assert_eq!(saved.verification_status, VerificationStatus::Pending);

    // Step 1
    let found = store
        .verify_audit_log(&log_id, "Carol", VerificationStep::Supervisor1)
        .unwrap();
    assert!(found);
    let after_one = &store.audit_logs()[0];
    assert_eq!(after_one.supervisor1_verified_by.as_deref(), Some("Carol"));
    assert!(after_one.supervisor1_verified_at.is_some());
    assert_eq!(
        after_one.verification_status,
        VerificationStatus::Supervisor1Verified
    );

    // Step 2 mirrors into the legacy single-verifier fields
    store
        .verify_audit_log(&log_id, "Dave", VerificationStep::Supervisor2)
        .unwrap();
    let after_two = &store.audit_logs()[0];
    assert_eq!(after_two.supervisor2_verified_by.as_deref(), Some("Dave"));
    assert_eq!(after_two.verified_by.as_deref(), Some("Dave"));
    assert_eq!(after_two.verification_status, VerificationStatus::Verified);
}

#[test]
fn test_audit_snapshot_survives_asset_deletion() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    let asset = store
        .add_asset(AssetInput::new("JTAPNB-000001", "PF00001"), "Alice")
        .unwrap();

    store
        .save_audit_log(AuditLog::new("Dana", vec![asset.id.clone()], vec![]))
        .unwrap();
    store.delete_asset(&asset.id, "Alice").unwrap();

    // The snapshot still references the deleted asset
    let audit = &store.audit_logs()[0];
    assert_eq!(audit.scanned_ids, vec![asset.id.clone()]);
    assert!(store.get_asset(&asset.id).is_none());
}

// --- Image Handling ---

#[test]
fn test_images_live_in_the_image_store_only() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    let images = vec![
        ImageData::new("image/png", vec![0x89, 0x50, 0x4e, 0x47]),
        ImageData::new("image/jpeg", vec![0xff, 0xd8, 0xff, 0xe0]),
    ];
    let asset = store
        .add_asset(
            AssetInput::new("JTAPNB-000001", "PF00001").with_images(images.clone()),
            "Alice",
        )
        .unwrap();
    assert_eq!(asset.images, images);

    // Persisted metadata never carries an images field
    let raw = fs::read_to_string(
        dir.path()
            .join("inventory")
            .join("meta")
            .join("assets.json"),
    )
    .unwrap();
    assert!(!raw.contains("images"));
    assert!(raw.contains("computerNo"));
}

#[test]
fn test_update_with_empty_list_clears_images() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    let asset = store
        .add_asset(
            AssetInput::new("JTAPNB-000001", "PF00001")
                .with_images(vec![ImageData::new("image/png", vec![1, 2, 3])]),
            "Alice",
        )
        .unwrap();

    let mut cleared = asset.clone();
    cleared.images = Vec::new();
    store
        .update_asset(cleared, "Alice", LogAction::Update, "Photos removed")
        .unwrap();

    // Reload from disk: nothing merges back
    drop(store);
    let store = reopen_store(&dir);
    assert!(store.get_asset(&asset.id).unwrap().images.is_empty());
}

// --- Persistence Round-Trips ---

#[test]
fn test_reload_restores_collections_and_images() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    let images = vec![ImageData::new("image/png", vec![9, 9, 9])];
    let asset = store
        .add_asset(
            AssetInput::new("JTAPNB-000001", "PF00001").with_images(images.clone()),
            "Alice",
        )
        .unwrap();
    store
        .save_audit_log(AuditLog::new("Dana", vec![asset.id.clone()], vec![]))
        .unwrap();

    drop(store);
    let store = reopen_store(&dir);

    assert_eq!(store.assets().len(), 1);
    assert_eq!(store.logs().len(), 1);
    assert_eq!(store.audit_logs().len(), 1);

    let restored = store.get_asset(&asset.id).unwrap();
    assert_eq!(restored.computer_no, "JTAPNB-000001");
    assert_eq!(restored.images, images);
}

#[test]
fn test_legacy_spellings_migrate_on_open() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    let asset = store
        .add_asset(AssetInput::new("JTAPNB-000001", "PF00001"), "Alice")
        .unwrap();
    drop(store);

    // Age the snapshot back to legacy spellings
    let assets_path = dir
        .path()
        .join("inventory")
        .join("meta")
        .join("assets.json");
    let raw = fs::read_to_string(&assets_path).unwrap();
    let aged = raw.replace("\"In Stock\"", "\"Assigned\"");
    assert_ne!(raw, aged);
    fs::write(&assets_path, aged).unwrap();

    let store = reopen_store(&dir);
    assert_eq!(store.get_asset(&asset.id).unwrap().status, AssetStatus::InUse);

    // The corrected list was re-persisted
    let rewritten = fs::read_to_string(&assets_path).unwrap();
    assert!(rewritten.contains("\"In Use\""));
    assert!(!rewritten.contains("\"Assigned\""));
}

// --- Subscriptions ---

#[test]
fn test_subscribers_see_mutations() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    let handle = store.subscribe(SubscriptionConfig {
        filter: SubscriptionFilter::all(),
        ..Default::default()
    });

    let asset = store
        .add_asset(AssetInput::new("JTAPNB-000001", "PF00001"), "Alice")
        .unwrap();

    match handle.recv_timeout(Duration::from_millis(100)).unwrap() {
        StoreEvent::AssetUpserted { asset: summary } => {
            assert_eq!(summary.id, asset.id);
            assert_eq!(summary.computer_no, "JTAPNB-000001");
        }
        other => panic!("Expected AssetUpserted, got {:?}", other),
    }
    match handle.recv_timeout(Duration::from_millis(100)).unwrap() {
        StoreEvent::LogAppended { entry } => assert_eq!(entry.action, LogAction::Add),
        other => panic!("Expected LogAppended, got {:?}", other),
    }

    store.delete_asset(&asset.id, "Alice").unwrap();
    match handle.recv_timeout(Duration::from_millis(100)).unwrap() {
        StoreEvent::AssetsRemoved { ids } => assert_eq!(ids, vec![asset.id]),
        other => panic!("Expected AssetsRemoved, got {:?}", other),
    }
}

// --- Log Immutability ---

#[test]
fn test_log_is_append_only_across_operations() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    let mut seen_len = 0;
    let mut check = |logs: std::sync::Arc<Vec<stockroom::LogEntry>>, prior: &[stockroom::LogEntryId]| {
        assert!(logs.len() >= seen_len);
        seen_len = logs.len();
        // Previously written entries are untouched (newest-first: they form
        // the tail of the list)
        let tail: Vec<_> = logs[logs.len() - prior.len()..]
            .iter()
            .map(|l| l.id.clone())
            .collect();
        assert_eq!(tail, prior);
        logs.iter().map(|l| l.id.clone()).collect::<Vec<_>>()
    };

    let mut prior = Vec::new();

    let asset = store
        .add_asset(AssetInput::new("A1", "S1"), "Alice")
        .unwrap();
    prior = check(store.logs(), &prior);

    let mut update = asset.clone();
    update.remarks = Some("relabeled".into());
    store
        .update_asset(update, "Alice", LogAction::Update, "Relabel")
        .unwrap();
    prior = check(store.logs(), &prior);

    store.import_assets(vec![AssetInput::new("B1", "S2")], "Alice").unwrap();
    prior = check(store.logs(), &prior);

    store.delete_asset(&asset.id, "Alice").unwrap();
    check(store.logs(), &prior);
}
