// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! WaitSet - blocking multiplexer over guard condition wake events.
//!
//! A wait set is owned and mutated by exactly one thread at a time (every
//! mutating operation takes `&mut self`); which guard conditions it may hold
//! is negotiated separately through each guard condition's in-use exchange.
//! Blocking happens in [`WaitSet::wait`], never inside the guard conditions
//! themselves.

use crate::rt::{self, RawEvent, WaitError};
use crate::{Error, Result};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Opaque identity token of a wait set (nonzero, stable for its lifetime).
pub type WaitSetId = u64;

/// Maximum number of conditions registered in one wait set.
///
/// Bounded by `MAXIMUM_WAIT_OBJECTS` of the Windows wait primitive.
pub const WAITSET_MAX_CONDITIONS: usize = 64;

/// Caller-owned set of wake events that blocks a thread until one signals.
pub struct WaitSet {
    id: WaitSetId,
    entries: Vec<WaitSetEntry>,
}

struct WaitSetEntry {
    condition_id: u64,
    event: RawEvent,
}

impl WaitSet {
    /// Create an empty wait set with a fresh identity token.
    #[must_use]
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);

        Self {
            id,
            entries: Vec::new(),
        }
    }

    /// Identity token, used by guard conditions for comparison only.
    #[must_use]
    pub fn id(&self) -> WaitSetId {
        self.id
    }

    /// Register a wake event under a condition id.
    ///
    /// Called by `GuardCondition::add_to_wait_set`; the registered event must
    /// stay alive until it is removed again (the in-use exchange protocol is
    /// how callers guarantee that).
    pub(crate) fn register(&mut self, condition_id: u64, event: RawEvent) -> Result<()> {
        if self
            .entries
            .iter()
            .any(|entry| entry.condition_id == condition_id)
        {
            return Err(Error::AlreadyAttached);
        }
        if self.entries.len() >= WAITSET_MAX_CONDITIONS {
            return Err(Error::Resource(io::Error::other(format!(
                "wait set capacity exceeded (max {})",
                WAITSET_MAX_CONDITIONS
            ))));
        }

        self.entries.push(WaitSetEntry {
            condition_id,
            event,
        });
        Ok(())
    }

    /// Drop all registrations (the owner's teardown/rebuild cycle).
    ///
    /// Callers release the matching in-use claims afterwards via
    /// `exchange_in_use_by_wait_set_state(false)`.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of registered conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Block until at least one registered condition signals.
    ///
    /// Returns the condition ids that woke the wait set; their pending wake
    /// payloads are drained so the next wait blocks again. Coalesced wakes
    /// are expected - the guard condition's unread counter, not the wake
    /// event, is the source of truth for how many triggers occurred.
    ///
    /// # Errors
    ///
    /// `Error::WouldBlock` on timeout, `Error::InvalidArgument` for an empty
    /// wait set, `Error::Resource` on native poll failure.
    pub fn wait(&mut self, timeout: Option<Duration>) -> Result<Vec<u64>> {
        if self.entries.is_empty() {
            return Err(Error::InvalidArgument(
                "wait set has no registered conditions".to_string(),
            ));
        }

        let events: Vec<RawEvent> = self.entries.iter().map(|entry| entry.event).collect();

        match rt::wait_any(&events, timeout) {
            Ok(signaled) => {
                let mut condition_ids = Vec::with_capacity(signaled.len());
                for index in signaled {
                    if let Some(entry) = self.entries.get(index) {
                        rt::drain_event(entry.event);
                        condition_ids.push(entry.condition_id);
                    }
                }
                log::debug!(
                    "[waitset] wait returning {} signaled condition(s)",
                    condition_ids.len()
                );
                Ok(condition_ids)
            }
            Err(WaitError::Timeout) => Err(Error::WouldBlock),
            Err(WaitError::Io(err)) => Err(Error::Resource(err)),
        }
    }
}

impl Default for WaitSet {
    fn default() -> Self {
        Self::new()
    }
}
