// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution context - process-wide scope that guard conditions belong to.
//!
//! A [`Context`] stays valid until [`Context::shutdown`] is called. Guard
//! conditions hold shared ownership of their context so the context always
//! outlives the native wake resources created under it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Process-wide execution scope.
pub struct Context {
    name: String,
    id: u64,
    valid: AtomicBool,
}

impl Context {
    /// Create a named context in the valid state.
    #[must_use]
    pub fn new(name: &str) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);

        Self {
            name: name.to_string(),
            id,
            valid: AtomicBool::new(true),
        }
    }

    /// Context name (diagnostics only).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable identifier for this context.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the context is still usable for creating entities.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Invalidate the context. Idempotent.
    ///
    /// Existing guard conditions keep working (they hold their own native
    /// resources); only the creation of new entities is refused.
    pub fn shutdown(&self) {
        if !self.valid.swap(false, Ordering::AcqRel) {
            return;
        }
        log::debug!("[context] '{}' shut down", self.name);
    }
}

/// Process-wide default context, created on first use.
///
/// Explicit factory rather than an implicit global: callers pass the returned
/// handle into constructors, which keeps ownership visible and testable.
#[must_use]
pub fn default_context() -> Arc<Context> {
    static DEFAULT: OnceLock<Arc<Context>> = OnceLock::new();
    Arc::clone(DEFAULT.get_or_init(|| Arc::new(Context::new("default"))))
}
