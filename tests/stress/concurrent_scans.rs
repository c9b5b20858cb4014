//! Concurrency test: one controller shared by reader and admin threads.
//!
//! The controller serializes through a `Mutex`; the log must come out with
//! one gap-free sequence and every grant accounted for.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use gatekeep::{
    AccessController, ControllerConfig, GrantNotice, ListenerError, MemoryStore, ScanEvent, Tier,
};

#[test]
fn stress_8_reader_threads_share_one_log() {
    let mut ctl = AccessController::open(MemoryStore::new(), ControllerConfig::default()).unwrap();
    for t in 0..8u8 {
        ctl.create_identity(&format!("reader-{t}"), &format!("{t:02X}:01"), Tier::Member)
            .unwrap();
    }
    let grants = Arc::new(AtomicUsize::new(0));
    let counter = grants.clone();
    ctl.add_listener(move |_: &GrantNotice| -> Result<(), ListenerError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let ctl = Arc::new(Mutex::new(ctl));
    let mut handles = Vec::new();
    for t in 0..8u8 {
        let ctl = Arc::clone(&ctl);
        handles.push(thread::spawn(move || {
            for i in 0..100u64 {
                // Odd scans use an unregistered card.
                let uid = if i % 2 == 0 { [t, 0x01] } else { [t, 0x02] };
                let scan = ScanEvent::new(&uid, i).unwrap();
                ctl.lock().unwrap().handle_scan(&scan).unwrap();
            }
        }));
    }

    // Admin writes interleave with the readers.
    {
        let ctl = Arc::clone(&ctl);
        handles.push(thread::spawn(move || {
            for i in 0..20u32 {
                ctl.lock()
                    .unwrap()
                    .create_identity(&format!("late-{i}"), &format!("FF:{i:02X}"), Tier::Trainer)
                    .unwrap();
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    let ctl = ctl.lock().unwrap();
    let events = ctl.list_recent_events(Some(10_000));
    assert_eq!(events.len(), 800);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.seq as usize, i);
    }
    assert_eq!(events.iter().filter(|e| e.granted).count(), 400);
    assert_eq!(grants.load(Ordering::SeqCst), 400);
    assert_eq!(ctl.stats().unwrap().identity_count, 28);
}
