// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! GuardCondition - manually-triggered, wait-set-pollable notification.
//!
//! A guard condition owns one native [`WakeEvent`]. Any thread may call
//! [`GuardCondition::trigger`] to wake the wait set currently polling it and,
//! optionally, deliver the trigger count to an installed callback. At most one
//! wait set owns a guard condition at a time; wait sets agree on ownership
//! through the non-blocking [`exchange_in_use_by_wait_set_state`] protocol
//! rather than a lock.
//!
//! [`exchange_in_use_by_wait_set_state`]: GuardCondition::exchange_in_use_by_wait_set_state

use crate::context::Context;
use crate::rt::{RawEvent, WakeEvent};
use crate::waitset::{WaitSet, WaitSetId};
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type TriggerCallback = Arc<dyn Fn(usize) + Send + Sync>;

/// Guard condition configuration. Only default options are currently
/// meaningful; the struct exists so the constructor signature stays stable.
#[derive(Clone, Copy, Debug, Default)]
pub struct GuardConditionOptions {}

/// Callback/counter bookkeeping, always updated as one consistent pair:
/// while a callback is installed every trigger delivers immediately and the
/// counter stays 0; without one, triggers only accumulate.
#[derive(Default)]
struct TriggerState {
    callback: Option<TriggerCallback>,
    unread_count: usize,
}

/// A condition that can be waited on in a single wait set and asynchronously
/// triggered from any thread.
pub struct GuardCondition {
    context: Arc<Context>,
    wake: WakeEvent,
    id: u64,
    in_use_by_wait_set: AtomicBool,
    /// Identity token of the wait set last registered via `add_to_wait_set`
    /// (0 = none). Compared, never dereferenced.
    wait_set_id: AtomicU64,
    trigger_state: Mutex<TriggerState>,
}

impl GuardCondition {
    /// Create a guard condition bound to `context`.
    ///
    /// Shared ownership of the context is held until the guard condition is
    /// dropped.
    ///
    /// # Errors
    ///
    /// `Error::InvalidArgument` if the context has been shut down,
    /// `Error::ResourceInit` if the native wake event cannot be created.
    /// No native resource is allocated on either failure path.
    pub fn new(context: &Arc<Context>, _options: GuardConditionOptions) -> Result<Self> {
        if !context.is_valid() {
            return Err(Error::InvalidArgument(
                "guard condition requires a valid context".to_string(),
            ));
        }

        let wake = WakeEvent::new().map_err(Error::ResourceInit)?;

        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);

        Ok(Self {
            context: Arc::clone(context),
            wake,
            id,
            in_use_by_wait_set: AtomicBool::new(false),
            wait_set_id: AtomicU64::new(0),
            trigger_state: Mutex::new(TriggerState::default()),
        })
    }

    /// Signal that the condition has been met.
    ///
    /// Thread-safe; may be called concurrently with a wait set polling this
    /// guard condition. Repeated triggers before a wakeup coalesce into a
    /// single wake event; the callback/counter bookkeeping remains exact.
    ///
    /// # Errors
    ///
    /// `Error::Resource` if the native wake signal fails. Internal state is
    /// untouched in that case and the guard condition stays usable.
    pub fn trigger(&self) -> Result<()> {
        self.wake.signal().map_err(Error::Resource)?;

        // Copy the callback out and invoke it after the lock is released so
        // a callback may re-enter this guard condition without deadlocking.
        let callback = {
            let mut state = lock_trigger_state(&self.trigger_state);
            match &state.callback {
                Some(callback) => Some(Arc::clone(callback)),
                None => {
                    state.unread_count += 1;
                    None
                }
            }
        };

        if let Some(callback) = callback {
            callback(1);
        }

        Ok(())
    }

    /// Exchange the "in use by wait set" state, returning the previous value.
    ///
    /// Non-blocking; this is the synchronization primitive wait sets use to
    /// agree on ownership. A wait set attempting to attach calls this with
    /// `true`: observing a previous value of `true` means the guard condition
    /// is already claimed and must not be registered again. The owning wait
    /// set releases its claim with `false` during teardown/rebuild.
    pub fn exchange_in_use_by_wait_set_state(&self, in_use: bool) -> bool {
        self.in_use_by_wait_set.swap(in_use, Ordering::AcqRel)
    }

    /// Register this guard condition's wake event into `wait_set`.
    ///
    /// The exclusive borrow enforces the protocol precondition that the
    /// caller owns the wait set for the duration of the call; triggering
    /// from other threads remains safe throughout. The wait set identity is
    /// recorded for later comparison only.
    ///
    /// # Errors
    ///
    /// `Error::AlreadyAttached` if this condition is already registered in
    /// `wait_set`, `Error::Resource` if registration fails.
    pub fn add_to_wait_set(&self, wait_set: &mut WaitSet) -> Result<()> {
        wait_set.register(self.id, self.wake.raw())?;
        self.wait_set_id.store(wait_set.id(), Ordering::Release);
        Ok(())
    }

    /// Install a callback invoked on every trigger with the trigger count.
    ///
    /// Normally the count is 1, but if triggers accumulated while no callback
    /// was installed the new callback is immediately invoked once with the
    /// accumulated count and the counter resets to 0 - no trigger is ever
    /// dropped across a callback change. Replaces any previous callback.
    ///
    /// Thread-safe. The callback runs outside the internal lock, so it may
    /// call back into this guard condition.
    pub fn set_on_trigger_callback<F>(&self, callback: F)
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let (callback, pending): (TriggerCallback, usize) = {
            let mut state = lock_trigger_state(&self.trigger_state);
            let callback: TriggerCallback = Arc::new(callback);
            state.callback = Some(Arc::clone(&callback));
            (callback, std::mem::take(&mut state.unread_count))
        };

        if pending > 0 {
            callback(pending);
        }
    }

    /// Remove the installed callback, if any.
    ///
    /// Subsequent triggers resume accumulating into the unread counter,
    /// starting from 0.
    pub fn clear_on_trigger_callback(&self) {
        let mut state = lock_trigger_state(&self.trigger_state);
        state.callback = None;
    }

    /// Number of triggers not yet delivered to a callback.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        lock_trigger_state(&self.trigger_state).unread_count
    }

    /// Unique identifier for this guard condition.
    #[must_use]
    pub fn condition_id(&self) -> u64 {
        self.id
    }

    /// Identity of the wait set this guard condition was last registered
    /// with, if any.
    #[must_use]
    pub fn wait_set_id(&self) -> Option<WaitSetId> {
        match self.wait_set_id.load(Ordering::Acquire) {
            0 => None,
            id => Some(id),
        }
    }

    /// Raw handle of the underlying wake event, for native interop.
    #[must_use]
    pub fn raw_wake_handle(&self) -> RawEvent {
        self.wake.raw()
    }

    /// The context this guard condition keeps alive.
    #[must_use]
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }
}

fn lock_trigger_state(state: &Mutex<TriggerState>) -> MutexGuard<'_, TriggerState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::debug!("[guard] trigger state poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests;
