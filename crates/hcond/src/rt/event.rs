// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native wake primitive backing guard conditions.
//!
//! Each [`WakeEvent`] wraps one OS-level signalable resource that a wait set
//! can block on:
//!
//! - On Linux/Unix: `eventfd` + `poll` for O(1) wakeup.
//! - On Windows: manual-reset kernel Event + `WaitForMultipleObjects`.
//!
//! Multiple signals before a wakeup coalesce into a single wake; callers that
//! need an exact count keep it themselves.

use std::io;
use std::time::Duration;

pub use platform::RawEvent;

#[cfg(all(test, unix))]
pub(super) use platform::raw_event_from_fd;

/// Errors returned by [`wait_any`].
#[derive(Debug)]
pub enum WaitError {
    Timeout,
    Io(io::Error),
}

/// Exclusively-owned native wake resource.
///
/// Created at construction, closed exactly once on drop. Signalling is
/// idempotent at the OS level: a saturated event simply stays signaled.
pub struct WakeEvent {
    raw: RawEvent,
}

impl WakeEvent {
    /// Create the native event in the non-signaled state.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            raw: platform::create_event()?,
        })
    }

    /// Signal the event, waking any blocked waiter.
    ///
    /// A saturated counter (`EWOULDBLOCK`) means a wake is already pending
    /// and is treated as success. Other OS errors are surfaced to the caller.
    pub fn signal(&self) -> io::Result<()> {
        platform::signal_event(self.raw)
    }

    /// Consume any pending wake so the next wait blocks again.
    pub fn drain(&self) {
        platform::drain_event(self.raw);
    }

    /// Raw pollable handle for wait-set registration and native interop.
    #[must_use]
    pub fn raw(&self) -> RawEvent {
        self.raw
    }
}

impl Drop for WakeEvent {
    fn drop(&mut self) {
        platform::close_event(self.raw);
    }
}

/// Drain a pending wake through its raw handle.
///
/// Used by wait sets after a wakeup; the owning [`WakeEvent`] must still be
/// alive (callers coordinate via the in-use registration protocol).
pub fn drain_event(event: RawEvent) {
    platform::drain_event(event);
}

/// Block until at least one event is signaled or the timeout elapses.
///
/// Returns the indices of the signaled events. `None` waits forever.
pub fn wait_any(events: &[RawEvent], timeout: Option<Duration>) -> Result<Vec<usize>, WaitError> {
    platform::wait_any(events, timeout)
}

// =============================================================================
// Unix implementation (eventfd + poll)
// =============================================================================
#[cfg(unix)]
mod platform {
    use std::io;
    use std::os::fd::RawFd;
    use std::time::{Duration, Instant};

    use super::WaitError;

    const EVENTFD_FLAGS: libc::c_int = libc::EFD_NONBLOCK | libc::EFD_CLOEXEC;

    /// Raw pollable handle of a wake event.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RawEvent(RawFd);

    impl RawEvent {
        /// Underlying file descriptor for native interop.
        #[must_use]
        pub fn as_raw_fd(&self) -> RawFd {
            self.0
        }
    }

    pub fn create_event() -> io::Result<RawEvent> {
        // SAFETY: eventfd is invoked with valid flags and no shared state.
        let fd = unsafe { libc::eventfd(0, EVENTFD_FLAGS) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(RawEvent(fd))
    }

    pub fn signal_event(event: RawEvent) -> io::Result<()> {
        let value: u64 = 1;
        let payload = value.to_ne_bytes();
        loop {
            // SAFETY: payload references a stack buffer with the 8-byte eventfd payload.
            let ret = unsafe { libc::write(event.0, payload.as_ptr().cast(), payload.len()) };
            if ret >= 0 {
                return Ok(());
            }

            let err = io::Error::last_os_error();
            match err.kind() {
                io::ErrorKind::Interrupted => continue,
                // Counter saturated: a wake is already pending.
                io::ErrorKind::WouldBlock => return Ok(()),
                _ => return Err(err),
            }
        }
    }

    pub fn drain_event(event: RawEvent) {
        let mut payload = [0u8; 8];
        loop {
            // SAFETY: payload is a stack buffer sized to the eventfd read requirements (8 bytes).
            let ret = unsafe { libc::read(event.0, payload.as_mut_ptr().cast(), payload.len()) };
            if ret >= 0 {
                break;
            }

            let err = io::Error::last_os_error();
            let kind = err.kind();
            if kind == io::ErrorKind::Interrupted {
                continue;
            }
            if kind == io::ErrorKind::WouldBlock {
                break;
            }
            log::debug!("[rt] wake event read failed: {}", err);
            break;
        }
    }

    pub fn wait_any(
        events: &[RawEvent],
        timeout: Option<Duration>,
    ) -> Result<Vec<usize>, WaitError> {
        let deadline = timeout.map(|d| Instant::now() + d);

        let mut pollfds: Vec<libc::pollfd> = events
            .iter()
            .map(|event| libc::pollfd {
                fd: event.0,
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();

        loop {
            // Recomputed on every iteration so EINTR retries honor the
            // original deadline. Sub-millisecond remainders round up to keep
            // the final retry blocking instead of busy-polling.
            let timeout_ms = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    i32::try_from(remaining.as_nanos().div_ceil(1_000_000)).unwrap_or(i32::MAX)
                }
                None => -1,
            };

            // SAFETY: poll reads/writes only the pollfd slice we own for nfds entries.
            let res = unsafe {
                libc::poll(
                    pollfds.as_mut_ptr(),
                    pollfds.len() as libc::nfds_t,
                    timeout_ms,
                )
            };
            if res == 0 {
                return Err(WaitError::Timeout);
            }
            if res < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(WaitError::Io(err));
            }
            break;
        }

        let mut signaled = Vec::new();
        for (index, pollfd) in pollfds.iter().enumerate() {
            // A handle in error state must surface as an error, not as a
            // silent no-op wake that callers would spin on.
            if pollfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
                return Err(WaitError::Io(io::Error::other(format!(
                    "wake event {} unusable (revents {:#06x})",
                    index, pollfd.revents
                ))));
            }
            if pollfd.revents & libc::POLLIN != 0 {
                signaled.push(index);
            }
        }
        Ok(signaled)
    }

    #[cfg(test)]
    pub(crate) fn raw_event_from_fd(fd: RawFd) -> RawEvent {
        RawEvent(fd)
    }

    pub fn close_event(event: RawEvent) {
        // SAFETY: the fd was obtained via libc::eventfd and is closed once here.
        let ret = unsafe { libc::close(event.0) };
        if ret < 0 {
            log::debug!(
                "[rt] wake event close failed: {}",
                io::Error::last_os_error()
            );
        }
    }
}

// =============================================================================
// Windows implementation (kernel Event object)
// =============================================================================
#[cfg(windows)]
mod platform {
    use std::io;
    use std::time::Duration;

    use super::WaitError;

    // Win32 constants
    const INFINITE: u32 = 0xFFFFFFFF;
    const WAIT_OBJECT_0: u32 = 0;
    const WAIT_TIMEOUT: u32 = 258;

    /// Raw pollable handle of a wake event (HANDLE is *mut c_void on Windows).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RawEvent(*mut std::ffi::c_void);

    impl RawEvent {
        /// Underlying kernel Event handle for native interop.
        #[must_use]
        pub fn as_raw_handle(&self) -> std::os::windows::io::RawHandle {
            self.0 as std::os::windows::io::RawHandle
        }
    }

    // SAFETY: Windows Event objects are inherently thread-safe kernel objects.
    unsafe impl Send for RawEvent {}
    unsafe impl Sync for RawEvent {}

    extern "system" {
        fn CreateEventW(
            lpEventAttributes: *const std::ffi::c_void,
            bManualReset: i32,
            bInitialState: i32,
            lpName: *const u16,
        ) -> *mut std::ffi::c_void;

        fn SetEvent(hEvent: *mut std::ffi::c_void) -> i32;
        fn ResetEvent(hEvent: *mut std::ffi::c_void) -> i32;
        fn WaitForMultipleObjects(
            nCount: u32,
            lpHandles: *const *mut std::ffi::c_void,
            bWaitAll: i32,
            dwMilliseconds: u32,
        ) -> u32;
        fn CloseHandle(hObject: *mut std::ffi::c_void) -> i32;
    }

    pub fn create_event() -> io::Result<RawEvent> {
        // Manual-reset event, initially non-signaled; reset happens in drain.
        // SAFETY: CreateEventW FFI with null security attributes and name (valid for unnamed event)
        let handle = unsafe { CreateEventW(std::ptr::null(), 1, 0, std::ptr::null()) };
        if handle.is_null() {
            return Err(io::Error::last_os_error());
        }
        Ok(RawEvent(handle))
    }

    pub fn signal_event(event: RawEvent) -> io::Result<()> {
        // SAFETY: SetEvent FFI with valid event handle from CreateEventW
        let ret = unsafe { SetEvent(event.0) };
        if ret == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn drain_event(event: RawEvent) {
        // Manual-reset event: reset it after wakeup so the next wait blocks.
        // SAFETY: ResetEvent FFI with valid event handle from CreateEventW
        let ret = unsafe { ResetEvent(event.0) };
        if ret == 0 {
            log::debug!(
                "[rt] wake event reset failed: {}",
                io::Error::last_os_error()
            );
        }
    }

    pub fn wait_any(
        events: &[RawEvent],
        timeout: Option<Duration>,
    ) -> Result<Vec<usize>, WaitError> {
        let timeout_ms = timeout
            .map(|d| {
                // Clamp just below INFINITE so a huge finite timeout stays
                // finite; sub-millisecond remainders round up.
                u32::try_from(d.as_nanos().div_ceil(1_000_000)).unwrap_or(INFINITE - 1)
            })
            .unwrap_or(INFINITE);

        let handles: Vec<*mut std::ffi::c_void> = events.iter().map(|event| event.0).collect();

        // SAFETY: WaitForMultipleObjects FFI with valid handles from CreateEventW
        let result = unsafe {
            WaitForMultipleObjects(handles.len() as u32, handles.as_ptr(), 0, timeout_ms)
        };

        if result == WAIT_TIMEOUT {
            return Err(WaitError::Timeout);
        }

        let index = result.wrapping_sub(WAIT_OBJECT_0) as usize;
        if index < events.len() {
            // Manual-reset events that fired together stay signaled and are
            // picked up by the caller's next wait.
            return Ok(vec![index]);
        }

        Err(WaitError::Io(io::Error::last_os_error()))
    }

    pub fn close_event(event: RawEvent) {
        // SAFETY: CloseHandle FFI with valid event handle from CreateEventW, called once in Drop
        let ret = unsafe { CloseHandle(event.0) };
        if ret == 0 {
            log::debug!(
                "[rt] wake event close failed: {}",
                io::Error::last_os_error()
            );
        }
    }
}
