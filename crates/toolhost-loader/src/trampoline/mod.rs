//! Call-site binding and invocation.
//!
//! The host calls every tool through one fixed call site whose signature,
//! `(instance, config) -> ()`, is known when the host is compiled. The
//! tool's real entry point is only known after its module is loaded, so the
//! call site is bound to it once, during setup, and every later call costs
//! what a direct call through that site costs.
//!
//! Two bindings exist:
//!
//! - [`DispatchSlot`] (default): a write-once function-pointer slot. One
//!   pointer load per call, no executable memory is touched.
//! - `PatchedStub` (feature `code-patch`): overwrites the machine code of a
//!   compiled placeholder with a jump to the entry point (see [`JumpStub`]).

mod jump;
#[cfg(all(
    feature = "code-patch",
    unix,
    any(target_arch = "x86", target_arch = "x86_64")
))]
mod patch;
mod slot;

use std::ffi::c_void;
use std::fmt;
use std::sync::Arc;

use toolhost_api::abi::ExecuteFn;
use tracing::debug;

use crate::bridge::ConfigValue;
use crate::error::{LoaderError, Result};
use crate::scanner::Capability;

pub use jump::{AddressWidth, JumpStub};
#[cfg(all(
    feature = "code-patch",
    unix,
    any(target_arch = "x86", target_arch = "x86_64")
))]
pub use patch::{write_code, PatchedStub, ProtectionGuard};
pub use slot::DispatchSlot;

/// Entry point signature shared by the call site and every tool
pub type EntryPoint = ExecuteFn;

/// Result of binding a call site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// The call site now targets the entry point
    Bound,
    /// The call site already targeted the entry point; nothing was written
    AlreadyBound,
}

/// A fixed call site that is bound to a tool entry point at run time.
///
/// A call site is bound at most once per lifetime. Binding the same target
/// again is a no-op; binding a different target fails.
pub trait CallSite: Send + Sync + fmt::Debug {
    /// Bind the call site to `target`
    fn bind(&self, target: EntryPoint) -> Result<BindOutcome>;

    /// Call through the call site.
    ///
    /// # Safety
    ///
    /// `instance` and `config` must be what the bound entry point expects;
    /// `config` is consumed.
    unsafe fn call(&self, instance: *mut c_void, config: *mut c_void) -> Result<()>;

    /// Check if the call site has been bound
    fn is_bound(&self) -> bool;
}

pub(crate) fn same_entry(a: EntryPoint, b: EntryPoint) -> bool {
    a as usize == b as usize
}

/// Invokes tools through a [`CallSite`]
#[derive(Debug, Clone, Copy)]
pub struct Trampoline<'a> {
    call_site: &'a dyn CallSite,
}

impl<'a> Trampoline<'a> {
    /// Create a trampoline over `call_site`
    pub fn new(call_site: &'a dyn CallSite) -> Self {
        Self { call_site }
    }

    /// Bind the call site to `capability`'s entry point and call it with
    /// `config`.
    ///
    /// Nothing is invoked unless binding succeeds. Returns once the tool's
    /// entry point returns.
    pub fn invoke(&self, capability: &mut Capability, config: ConfigValue) -> Result<()> {
        if !Arc::ptr_eq(config.module(), capability.module())
            || config.config_type() != capability.config_type()
        {
            return Err(LoaderError::ConfigMismatch {
                expected: capability.config_type().to_string(),
                found: config.config_type().to_string(),
            });
        }

        let target = capability.descriptor().execute;
        let outcome = self.call_site.bind(target)?;
        debug!(
            tool = %capability.type_name(),
            ?outcome,
            "Call site bound"
        );

        let instance = capability.instance_ptr();
        let config = config.into_raw();

        // SAFETY: the call site targets the entry point of the descriptor
        // that created `instance`, and `config` was parsed by the same
        // descriptor (checked above).
        unsafe { self.call_site.call(instance, config) }
    }
}
