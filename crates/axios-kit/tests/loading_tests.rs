//! Standalone loading counter tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::thread;

use axios_kit::{KitError, LoadingCounter};

#[test]
fn test_counter_across_threads() {
    let starts = Arc::new(AtomicU32::new(0));
    let stops = Arc::new(AtomicU32::new(0));
    let (s, e) = (starts.clone(), stops.clone());
    let counter = Arc::new(LoadingCounter::with_callbacks(
        move || {
            s.fetch_add(1, Ordering::SeqCst);
        },
        move || {
            e.fetch_add(1, Ordering::SeqCst);
        },
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    let _guard = counter.guard();
                    assert!(counter.is_loading());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(counter.count(), 0);
    assert!(starts.load(Ordering::SeqCst) >= 1);
    assert_eq!(starts.load(Ordering::SeqCst), stops.load(Ordering::SeqCst));
}

#[test]
fn test_edges_alternate() {
    // +1 on start, -1 on stop: the running sum must stay within 0..=1.
    let balance = Arc::new(AtomicI64::new(0));
    let (up, down) = (balance.clone(), balance.clone());
    let counter = Arc::new(LoadingCounter::with_callbacks(
        move || {
            let now = up.fetch_add(1, Ordering::SeqCst) + 1;
            assert_eq!(now, 1);
        },
        move || {
            let now = down.fetch_sub(1, Ordering::SeqCst) - 1;
            assert_eq!(now, 0);
        },
    ));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    counter.increment();
                    counter.decrement().unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(balance.load(Ordering::SeqCst), 0);
}

#[test]
fn test_decrement_at_zero() {
    let counter = LoadingCounter::new();
    assert!(matches!(counter.decrement(), Err(KitError::Underflow)));
    counter.increment();
    assert!(counter.decrement().is_ok());
    assert!(matches!(counter.decrement(), Err(KitError::Underflow)));
    assert_eq!(counter.count(), 0);
}

#[test]
fn test_replacing_callbacks() {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = LoadingCounter::new();
    counter.increment();
    counter.decrement().unwrap();

    let h = hits.clone();
    counter.set_callbacks(
        Some(Arc::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        })),
        None,
    );
    counter.increment();
    counter.decrement().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
