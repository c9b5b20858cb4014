//! Stress test: long access logs, windowed reads and repeated clears.

use gatekeep::{AccessController, ControllerConfig, FileStore, MemoryStore, ScanEvent, Tier};

#[test]
fn stress_5000_events_sequence_has_no_gaps() {
    let mut ctl = AccessController::open(MemoryStore::new(), ControllerConfig::default()).unwrap();
    ctl.create_identity("Alice", "AA:01", Tier::Member).unwrap();

    for i in 0..5_000u32 {
        let uid: &[u8] = if i % 3 == 0 { &[0xAA, 0x01] } else { &[0xBB] };
        let outcome = ctl
            .handle_scan(&ScanEvent::new(uid, u64::from(i)).unwrap())
            .unwrap();
        assert_eq!(outcome.event.seq, i);
    }

    let all = ctl.list_recent_events(Some(10_000));
    assert_eq!(all.len(), 5_000);
    assert!(all.windows(2).all(|w| w[1].seq == w[0].seq + 1));

    let tail = ctl.list_recent_events(Some(100));
    assert_eq!(tail.first().unwrap().seq, 4_900);
    assert_eq!(tail.last().unwrap().seq, 4_999);
    assert_eq!(tail.iter().filter(|e| e.granted).count(), 33);
}

#[test]
fn stress_repeated_clear_cycles() {
    let mut ctl = AccessController::open(MemoryStore::new(), ControllerConfig::default()).unwrap();

    for cycle in 0..20u32 {
        let n = 10 + cycle * 7;
        for i in 0..n {
            ctl.handle_scan(&ScanEvent::new(&[cycle as u8, i as u8], 0).unwrap())
                .unwrap();
        }
        assert_eq!(ctl.stats().unwrap().event_count, n);
        ctl.clear_events().unwrap();
        assert!(ctl.list_recent_events(Some(1_000)).is_empty());
    }

    let backend = ctl.into_backend();
    let leftovers: Vec<_> = backend
        .committed_keys()
        .into_iter()
        .filter(|k| k.starts_with("event_") && k != "event_count")
        .collect();
    assert!(leftovers.is_empty(), "stale event keys: {leftovers:?}");
}

#[test]
fn stress_file_store_300_events_survive_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let store = FileStore::open(tmp.path()).unwrap();
        let mut ctl = AccessController::open(store, ControllerConfig::default()).unwrap();
        for i in 0..300u32 {
            ctl.handle_scan(&ScanEvent::new(&i.to_be_bytes(), u64::from(i)).unwrap())
                .unwrap();
        }
    }

    let store = FileStore::open(tmp.path()).unwrap();
    let ctl = AccessController::open(store, ControllerConfig::default()).unwrap();
    let events = ctl.list_recent_events(Some(5));
    let seqs: Vec<_> = events.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![295, 296, 297, 298, 299]);
    assert_eq!(events[4].token, "00:00:01:2B");
}
