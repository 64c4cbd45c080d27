//! Write-once dispatch slot

use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};

use once_cell::sync::OnceCell;

use super::{same_entry, BindOutcome, CallSite, EntryPoint};
use crate::error::{LoaderError, Result};

static GLOBAL: DispatchSlot = DispatchSlot::new();

/// A call site backed by a function pointer that is written at most once.
///
/// Unbound, the slot refuses to call anything. Once bound, every call is a
/// single indirect call through the stored pointer.
#[derive(Debug)]
pub struct DispatchSlot {
    target: OnceCell<EntryPoint>,
    writes: AtomicUsize,
}

impl Default for DispatchSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchSlot {
    /// Create an unbound slot
    pub const fn new() -> Self {
        Self {
            target: OnceCell::new(),
            writes: AtomicUsize::new(0),
        }
    }

    /// Process-wide slot used by the host
    pub fn global() -> &'static DispatchSlot {
        &GLOBAL
    }

    /// Number of times the slot has been written (0 or 1)
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Acquire)
    }

    /// Current target, if bound
    pub fn target(&self) -> Option<EntryPoint> {
        self.target.get().copied()
    }
}

impl CallSite for DispatchSlot {
    fn bind(&self, target: EntryPoint) -> Result<BindOutcome> {
        let mut written = false;
        let current = *self.target.get_or_init(|| {
            written = true;
            target
        });

        if written {
            self.writes.fetch_add(1, Ordering::AcqRel);
            return Ok(BindOutcome::Bound);
        }

        if same_entry(current, target) {
            Ok(BindOutcome::AlreadyBound)
        } else {
            Err(LoaderError::patch(
                "call site is already bound to a different entry point",
            ))
        }
    }

    unsafe fn call(&self, instance: *mut c_void, config: *mut c_void) -> Result<()> {
        let target = self
            .target
            .get()
            .ok_or_else(|| LoaderError::patch("call site is not bound"))?;
        target(instance, config);
        Ok(())
    }

    fn is_bound(&self) -> bool {
        self.target.get().is_some()
    }
}
