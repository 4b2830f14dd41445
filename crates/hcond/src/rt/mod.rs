// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native runtime layer: the wake primitive guard conditions are built on.

mod event;

pub use event::{drain_event, wait_any, RawEvent, WaitError, WakeEvent};
