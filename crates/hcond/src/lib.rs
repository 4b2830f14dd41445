// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # hcond - guard conditions and wait sets for cross-thread notification
//!
//! A [`GuardCondition`] lets one thread assert "something happened" and wake
//! exactly one concurrently-polling [`WaitSet`], with optional synchronous
//! delivery of the trigger count to a callback. Triggers observed by the OS
//! wake primitive may coalesce; the per-condition unread counter is the
//! source of truth for how many triggers occurred.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hcond::{default_context, GuardCondition, GuardConditionOptions, WaitSet};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! fn main() -> hcond::Result<()> {
//!     let guard = Arc::new(GuardCondition::new(
//!         &default_context(),
//!         GuardConditionOptions::default(),
//!     )?);
//!
//!     // Claim and register: at most one wait set owns a guard condition.
//!     let mut wait_set = WaitSet::new();
//!     assert!(!guard.exchange_in_use_by_wait_set_state(true));
//!     guard.add_to_wait_set(&mut wait_set)?;
//!
//!     let trigger_guard = Arc::clone(&guard);
//!     std::thread::spawn(move || {
//!         trigger_guard.trigger().expect("trigger");
//!     });
//!
//!     let signaled = wait_set.wait(Some(Duration::from_secs(1)))?;
//!     assert_eq!(signaled, vec![guard.condition_id()]);
//!     Ok(())
//! }
//! ```
//!
//! ## Ownership protocol
//!
//! Wait sets agree on ownership of a guard condition without locking:
//! [`GuardCondition::exchange_in_use_by_wait_set_state`] atomically swaps the
//! in-use flag and returns the prior value. A wait set that observes `true`
//! on its claim attempt must not register the condition. The flag and the
//! registration are not atomic together; callers branch on the exchange
//! result before calling [`GuardCondition::add_to_wait_set`].

/// Execution context scope (process-wide default instance lives here).
pub mod context;
/// GuardCondition - the triggerable notification primitive.
pub mod guard;
/// Native runtime layer (wake events, blocking multi-wait).
pub mod rt;
/// WaitSet - caller-owned blocking multiplexer.
pub mod waitset;

pub use context::{default_context, Context};
pub use guard::{GuardCondition, GuardConditionOptions};
pub use waitset::{WaitSet, WaitSetId, WAITSET_MAX_CONDITIONS};

/// Errors returned by hcond operations.
///
/// Construction failures are fatal to object creation: no partially
/// constructed object is observable and no native resource leaks. Runtime
/// failures leave the object usable for subsequent calls.
#[derive(Debug)]
pub enum Error {
    /// Invalid argument (e.g. shut-down context at construction).
    InvalidArgument(String),
    /// Native wake-primitive creation failed.
    ResourceInit(std::io::Error),
    /// A native operation (trigger, registration, poll) failed at runtime.
    Resource(std::io::Error),
    /// Condition already registered in this wait set.
    AlreadyAttached,
    /// Wait timed out before any condition signaled.
    WouldBlock,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::ResourceInit(e) => write!(f, "Wake primitive creation failed: {}", e),
            Error::Resource(e) => write!(f, "Native operation failed: {}", e),
            Error::AlreadyAttached => write!(f, "Condition already attached to this wait set"),
            Error::WouldBlock => write!(f, "Operation would block"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ResourceInit(e) | Error::Resource(e) => Some(e),
            _ => None,
        }
    }
}

/// Convenient alias for API results using the public `Error` type.
pub type Result<T> = core::result::Result<T, Error>;
