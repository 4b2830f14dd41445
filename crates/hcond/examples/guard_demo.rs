// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Guard Condition Demo - Cross-Thread Wakeup
//!
//! Demonstrates the single-owner registration protocol, blocking wait and
//! coalesced trigger counting.
//!
//! Run with: cargo run --package hcond --example guard_demo

use hcond::{default_context, GuardCondition, GuardConditionOptions, WaitSet};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== hcond Guard Condition Demo ===\n");

    let context = default_context();
    let guard = Arc::new(GuardCondition::new(
        &context,
        GuardConditionOptions::default(),
    )?);
    println!("[OK] Guard condition created (id: {})", guard.condition_id());

    // 1. Claim the guard condition for this wait set, then register it.
    let mut wait_set = WaitSet::new();
    assert!(!guard.exchange_in_use_by_wait_set_state(true));
    guard.add_to_wait_set(&mut wait_set)?;
    println!("[OK] Claimed and registered with wait set {}\n", wait_set.id());

    // 2. Trigger thread: three bursts, each a batch of triggers.
    let trigger_guard = Arc::clone(&guard);
    let trigger_handle = thread::spawn(move || {
        for burst in 1..=3 {
            thread::sleep(Duration::from_millis(100));
            for _ in 0..burst {
                trigger_guard.trigger().expect("trigger");
            }
            println!("[Trigger] Burst of {} trigger(s) sent", burst);
        }
    });

    // 3. Wait loop: one wake per burst, counter keeps the exact totals.
    let mut wakeups = 0;
    while wakeups < 3 {
        match wait_set.wait(Some(Duration::from_secs(2))) {
            Ok(signaled) => {
                wakeups += 1;
                println!(
                    "[Waiter]  Woke up (conditions: {:?}, unread so far: {})",
                    signaled,
                    guard.unread_count()
                );
            }
            Err(e) => {
                eprintln!("[Waiter]  Wait error: {:?}", e);
                break;
            }
        }
    }

    trigger_handle.join().expect("trigger thread");

    // 4. Installing a callback flushes the accumulated count exactly once.
    guard.set_on_trigger_callback(|count| {
        println!("[Callback] Delivered accumulated trigger count: {}", count);
    });

    // 5. Teardown: release the claim so another wait set could take over.
    wait_set.clear();
    assert!(guard.exchange_in_use_by_wait_set_state(false));
    println!("\n[OK] Claim released");

    println!("=== Demo Complete ===");
    Ok(())
}
