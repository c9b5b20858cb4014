//! Integration test: full end-to-end workflow over a file-backed store.
//!
//! Tests the complete lifecycle:
//! 1. Register identities
//! 2. Scan known, inactive and unknown cards
//! 3. Edit and deactivate identities
//! 4. Reopen the store and check nothing was lost
//! 5. Clear the access log

use std::sync::{Arc, Mutex};

use gatekeep::{
    AccessController, AccessError, ControllerConfig, Decision, FileStore, GrantNotice,
    IdentityUpdate, ListenerError, ManualClock, ScanEvent, Tier,
};

fn open(dir: &std::path::Path, clock: &ManualClock) -> AccessController<FileStore> {
    let store = FileStore::open(dir).expect("open file store");
    AccessController::with_clock(store, ControllerConfig::default(), Box::new(clock.clone()))
        .expect("open controller")
}

fn scan(uid: &[u8], at: u64) -> ScanEvent {
    ScanEvent::new(uid, at).expect("valid UID")
}

#[test]
fn full_workflow_register_scan_reopen_clear() {
    let tmp = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(1_700_000_000);
    let mut ctl = open(tmp.path(), &clock);

    // ── Step 1: Register identities ─────────────────────────────────────
    let alice = ctl
        .create_identity("Alice", "AA:BB:CC", Tier::Member)
        .unwrap();
    let bob = ctl.create_identity("Bob", "de:ad:be:ef", Tier::Trainer).unwrap();
    let carol = ctl.create_identity("Carol", "01:02", Tier::Admin).unwrap();
    assert_eq!((alice, bob, carol), (0, 1, 2));
    assert_eq!(ctl.get_identity(bob).unwrap().token, "DE:AD:BE:EF");

    let doors = Arc::new(Mutex::new(Vec::new()));
    let sink = doors.clone();
    ctl.add_listener(move |n: &GrantNotice| -> Result<(), ListenerError> {
        sink.lock().unwrap().push(n.identity.name.clone());
        Ok(())
    });

    // ── Step 2: Scans ───────────────────────────────────────────────────
    clock.advance(30);
    let granted = ctl.handle_scan(&scan(&[0xAA, 0xBB, 0xCC], 10)).unwrap();
    assert_eq!(granted.decision, Decision::Granted { identity_id: alice });
    assert_eq!(granted.event.seq, 0);

    let denied = ctl.handle_scan(&scan(&[0xAA, 0xBB], 11)).unwrap();
    assert_eq!(denied.decision, Decision::Denied);
    assert_eq!(denied.event.token, "AA:BB");

    assert_eq!(*doors.lock().unwrap(), vec!["Alice".to_string()]);
    assert_eq!(ctl.get_identity(alice).unwrap().last_seen, 1_700_000_030);

    // ── Step 3: Edit and deactivate ─────────────────────────────────────
    ctl.update_identity(bob, IdentityUpdate::default().tier(Tier::Admin))
        .unwrap();
    ctl.delete_identity(alice).unwrap();
    let after_delete = ctl.handle_scan(&scan(&[0xAA, 0xBB, 0xCC], 12)).unwrap();
    assert_eq!(after_delete.decision, Decision::Denied);
    assert_eq!(after_delete.event.identity_id, 0);

    // The freed token goes to someone else.
    let dave = ctl.create_identity("Dave", "AA:BB:CC", Tier::Member).unwrap();
    assert_eq!(dave, 3);

    // ── Step 4: Reopen ──────────────────────────────────────────────────
    drop(ctl);
    let mut ctl = open(tmp.path(), &clock);
    let stats = ctl.stats().unwrap();
    assert_eq!(stats.identity_count, 4);
    assert_eq!(stats.event_count, 3);
    assert_eq!(stats.active_identities, 3);

    let alice_record = ctl.get_identity(alice).unwrap();
    assert!(!alice_record.active);
    assert_eq!(alice_record.last_seen, 1_700_000_030);
    assert_eq!(ctl.get_identity(bob).unwrap().tier, Tier::Admin);

    let again = ctl.handle_scan(&scan(&[0xAA, 0xBB, 0xCC], 13)).unwrap();
    assert_eq!(again.decision, Decision::Granted { identity_id: dave });
    assert_eq!(again.event.seq, 3);

    let seqs: Vec<_> = ctl
        .list_recent_events(Some(10))
        .iter()
        .map(|e| e.seq)
        .collect();
    assert_eq!(seqs, vec![0, 1, 2, 3]);

    // ── Step 5: Clear the log ───────────────────────────────────────────
    ctl.clear_events().unwrap();
    assert!(ctl.list_recent_events(Some(10)).is_empty());
    drop(ctl);

    let mut ctl = open(tmp.path(), &clock);
    assert_eq!(ctl.stats().unwrap().event_count, 0);
    let first = ctl.handle_scan(&scan(&[0x01, 0x02], 14)).unwrap();
    assert_eq!(first.event.seq, 0);
    assert_eq!(first.decision, Decision::Granted { identity_id: carol });
}

#[test]
fn deleted_members_scenario() {
    let tmp = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(100);
    let mut ctl = open(tmp.path(), &clock);

    for (name, token) in [("a", "0A"), ("b", "0B"), ("c", "0C")] {
        ctl.create_identity(name, token, Tier::Member).unwrap();
    }
    ctl.delete_identity(1).unwrap();

    let c = ctl.handle_scan(&scan(&[0x0C], 1)).unwrap();
    assert!(c.event.granted);
    assert_eq!(c.event.identity_id, 2);

    let unknown = ctl.handle_scan(&scan(&[0, 0, 0], 2)).unwrap();
    assert!(!unknown.event.granted);
    assert_eq!(unknown.event.identity_id, 0);
    assert_eq!(unknown.event.token, "00:00:00");
}

#[test]
fn uncommitted_changes_never_reach_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(100);
    {
        let mut ctl = open(tmp.path(), &clock);
        ctl.create_identity("Alice", "AA", Tier::Member).unwrap();
    }

    // A handle that writes without committing leaves the file untouched.
    {
        use gatekeep::BackingStore;
        let mut store = FileStore::open(tmp.path()).unwrap();
        store.set("identity_count", &[9, 0, 0, 0]).unwrap();
        assert!(store.has_uncommitted());
    }

    let ctl = open(tmp.path(), &clock);
    assert_eq!(ctl.stats().unwrap().identity_count, 1);
}

#[test]
fn admin_errors_surface_to_caller() {
    let tmp = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(100);
    let mut ctl = open(tmp.path(), &clock);
    let id = ctl.create_identity("Alice", "AA", Tier::Member).unwrap();

    assert!(matches!(
        ctl.create_identity("Eve", "AA", Tier::Member),
        Err(AccessError::Conflict(_))
    ));
    assert!(matches!(
        ctl.create_identity("x".repeat(64).as_str(), "BB", Tier::Member),
        Err(AccessError::InvalidArgument(_))
    ));
    assert!(matches!(
        ctl.update_identity(id + 1, IdentityUpdate::default().name("Bob")),
        Err(AccessError::NotFound(_))
    ));
    assert!(matches!(
        ctl.delete_identity(42),
        Err(AccessError::NotFound(_))
    ));
    assert!(matches!(
        "superuser".parse::<Tier>(),
        Err(AccessError::InvalidArgument(_))
    ));
}
