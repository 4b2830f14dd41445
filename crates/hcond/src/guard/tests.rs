// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::unwrap_used)] // test scaffolding

use super::*;
use crate::context::{default_context, Context};
use crate::waitset::WaitSet;
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

fn new_guard() -> GuardCondition {
    GuardCondition::new(&default_context(), GuardConditionOptions::default())
        .expect("guard condition")
}

/// Callback that records every delivered count.
fn recording_callback() -> (Arc<Mutex<Vec<usize>>>, impl Fn(usize) + Send + Sync + 'static) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    (calls, move |count| sink.lock().unwrap().push(count))
}

#[test]
fn construction_fails_on_shutdown_context() {
    let context = Arc::new(Context::new("dying"));
    context.shutdown();

    let result = GuardCondition::new(&context, GuardConditionOptions::default());
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}

#[test]
fn construction_retains_context() {
    let context = Arc::new(Context::new("retained"));
    let guard = GuardCondition::new(&context, GuardConditionOptions::default())
        .expect("guard condition");

    assert_eq!(guard.context().id(), context.id());
    assert!(Arc::strong_count(&context) >= 2);
}

#[test]
fn condition_ids_unique() {
    assert_ne!(new_guard().condition_id(), new_guard().condition_id());
}

#[test]
fn triggers_accumulate_without_callback() {
    let guard = new_guard();
    assert_eq!(guard.unread_count(), 0);

    for _ in 0..3 {
        guard.trigger().expect("trigger");
    }
    assert_eq!(guard.unread_count(), 3);
}

#[test]
fn callback_install_flushes_accumulated_count() {
    let guard = new_guard();
    for _ in 0..5 {
        guard.trigger().expect("trigger");
    }

    let (calls, callback) = recording_callback();
    guard.set_on_trigger_callback(callback);

    assert_eq!(*calls.lock().unwrap(), vec![5]);
    assert_eq!(guard.unread_count(), 0);
}

#[test]
fn callback_install_without_pending_stays_silent() {
    let guard = new_guard();
    let (calls, callback) = recording_callback();
    guard.set_on_trigger_callback(callback);

    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn installed_callback_receives_each_trigger() {
    let guard = new_guard();
    let (calls, callback) = recording_callback();
    guard.set_on_trigger_callback(callback);

    guard.trigger().expect("trigger");
    guard.trigger().expect("trigger");

    assert_eq!(*calls.lock().unwrap(), vec![1, 1]);
    assert_eq!(guard.unread_count(), 0);
}

#[test]
fn replacing_callback_performs_no_extra_flush() {
    let guard = new_guard();
    let (first_calls, first) = recording_callback();
    guard.set_on_trigger_callback(first);

    let (second_calls, second) = recording_callback();
    guard.set_on_trigger_callback(second);

    assert!(first_calls.lock().unwrap().is_empty());
    assert!(second_calls.lock().unwrap().is_empty());

    guard.trigger().expect("trigger");
    assert!(first_calls.lock().unwrap().is_empty());
    assert_eq!(*second_calls.lock().unwrap(), vec![1]);
}

#[test]
fn clearing_callback_resumes_accumulation() {
    let guard = new_guard();
    let (calls, callback) = recording_callback();
    guard.set_on_trigger_callback(callback);
    guard.clear_on_trigger_callback();

    guard.trigger().expect("trigger");
    guard.trigger().expect("trigger");

    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(guard.unread_count(), 2);
}

// Scenario from the wait-set notification contract: accumulated triggers
// flush once on install, later triggers deliver one by one, clearing goes
// back to counting.
#[test]
fn trigger_delivery_across_callback_changes() {
    let guard = Arc::new(new_guard());

    let mut threads = Vec::new();
    for _ in 0..3 {
        let guard = Arc::clone(&guard);
        threads.push(thread::spawn(move || guard.trigger().expect("trigger")));
    }
    for handle in threads {
        handle.join().expect("trigger thread");
    }

    let (calls, callback) = recording_callback();
    guard.set_on_trigger_callback(callback);
    assert_eq!(*calls.lock().unwrap(), vec![3]);

    guard.trigger().expect("trigger");
    assert_eq!(*calls.lock().unwrap(), vec![3, 1]);

    guard.clear_on_trigger_callback();
    guard.trigger().expect("trigger");
    guard.trigger().expect("trigger");

    assert_eq!(guard.unread_count(), 2);
    assert_eq!(*calls.lock().unwrap(), vec![3, 1]);
}

#[test]
fn concurrent_triggers_lose_no_updates() {
    const THREADS: usize = 16;
    const TRIGGERS_PER_THREAD: usize = 64;

    let guard = Arc::new(new_guard());

    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let guard = Arc::clone(&guard);
        handles.push(thread::spawn(move || {
            for _ in 0..TRIGGERS_PER_THREAD {
                guard.trigger().expect("trigger");
            }
        }));
    }
    for handle in handles {
        handle.join().expect("trigger thread");
    }

    assert_eq!(guard.unread_count(), THREADS * TRIGGERS_PER_THREAD);
}

#[test]
fn jittered_triggers_flush_exactly_once() {
    const THREADS: usize = 8;

    let guard = Arc::new(new_guard());

    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let guard = Arc::clone(&guard);
        handles.push(thread::spawn(move || {
            thread::sleep(Duration::from_millis(fastrand::u64(0..5)));
            guard.trigger().expect("trigger");
        }));
    }
    for handle in handles {
        handle.join().expect("trigger thread");
    }

    let (calls, callback) = recording_callback();
    guard.set_on_trigger_callback(callback);

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], THREADS);
    assert_eq!(guard.unread_count(), 0);
}

#[test]
fn exchange_enforces_single_owner() {
    let guard = new_guard();

    // first claim succeeds
    assert!(!guard.exchange_in_use_by_wait_set_state(true));
    // a second owner observes the claim and must back off
    assert!(guard.exchange_in_use_by_wait_set_state(true));

    // release, then the next claim succeeds again
    assert!(guard.exchange_in_use_by_wait_set_state(false));
    assert!(!guard.exchange_in_use_by_wait_set_state(true));
}

#[test]
fn add_to_wait_set_records_identity() {
    let mut ws = WaitSet::new();
    let guard = new_guard();
    assert_eq!(guard.wait_set_id(), None);

    assert!(!guard.exchange_in_use_by_wait_set_state(true));
    guard.add_to_wait_set(&mut ws).expect("registration");

    assert_eq!(guard.wait_set_id(), Some(ws.id()));
}

#[test]
fn callback_may_reenter_guard() {
    let guard = Arc::new(new_guard());
    let weak: Weak<GuardCondition> = Arc::downgrade(&guard);
    let observed = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&observed);
    guard.set_on_trigger_callback(move |count| {
        // re-enter the guard condition from inside the callback
        let inner = weak.upgrade().expect("guard alive during callback");
        sink.lock().unwrap().push((count, inner.unread_count()));
    });

    guard.trigger().expect("trigger");
    assert_eq!(*observed.lock().unwrap(), vec![(1, 0)]);
}

#[test]
fn trigger_keeps_working_after_callback_churn() {
    let guard = new_guard();

    for round in 0..4 {
        let (calls, callback) = recording_callback();
        guard.set_on_trigger_callback(callback);
        guard.trigger().expect("trigger");
        assert_eq!(*calls.lock().unwrap(), vec![1], "round {}", round);
        guard.clear_on_trigger_callback();
    }

    guard.trigger().expect("trigger");
    assert_eq!(guard.unread_count(), 1);
}
