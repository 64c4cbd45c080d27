//! Tool discovery inside a loaded module

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use toolhost_api::ToolDescriptor;
use tracing::{debug, info, warn};

use crate::error::{LoaderError, Result};
use crate::module::LoadedModule;

/// A discovered tool: its descriptor and a live instance.
///
/// The instance is destroyed through the module when the capability is
/// dropped.
pub struct Capability {
    module: Arc<LoadedModule>,
    descriptor: NonNull<ToolDescriptor>,
    instance: NonNull<c_void>,
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("module", &self.module.name())
            .field("type_name", &self.type_name())
            .field("config_type", &self.config_type())
            .finish()
    }
}

impl Capability {
    /// Module the tool came from
    pub fn module(&self) -> &Arc<LoadedModule> {
        &self.module
    }

    /// The tool's descriptor
    pub fn descriptor(&self) -> &ToolDescriptor {
        // SAFETY: the descriptor lives in the module's table, and `self`
        // keeps the module loaded.
        unsafe { self.descriptor.as_ref() }
    }

    /// Tool type name
    pub fn type_name(&self) -> &str {
        self.descriptor().type_name()
    }

    /// Configuration type name
    pub fn config_type(&self) -> &str {
        self.descriptor().config_type()
    }

    /// The tool's display title (may be empty)
    pub fn title(&self) -> String {
        // SAFETY: the instance is live until drop; the returned string is
        // copied before any other call into the module.
        unsafe {
            (self.descriptor().title)(self.instance.as_ptr())
                .as_str()
                .to_string()
        }
    }

    /// Raw pointer to the live instance, valid while `self` lives
    pub fn instance_ptr(&mut self) -> *mut c_void {
        self.instance.as_ptr()
    }
}

impl Drop for Capability {
    fn drop(&mut self) {
        // SAFETY: the instance was produced by this descriptor's `create`.
        unsafe { (self.descriptor().destroy)(self.instance.as_ptr()) };
    }
}

/// Finds the tool type of a module
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityScanner;

impl CapabilityScanner {
    /// Discover the module's tool and instantiate it.
    ///
    /// Walks the module's table in declaration order and accepts the first
    /// entry implementing the single-parameter tool contract. Further
    /// matches are reported but never chosen.
    pub fn discover(module: &Arc<LoadedModule>) -> Result<Capability> {
        let table = module.tool_table()?;
        table
            .validate()
            .map_err(|e| LoaderError::plugin_not_found(module.name(), e))?;

        let descriptors = table.descriptors();
        let mut chosen: Option<&ToolDescriptor> = None;
        let mut extra = 0usize;

        for descriptor in descriptors {
            if !descriptor.is_tool() {
                debug!(
                    module = %module.name(),
                    type_name = %descriptor.type_name(),
                    contract = descriptor.contract,
                    arity = descriptor.config_arity,
                    "Skipping type that does not implement the tool contract"
                );
                continue;
            }

            if chosen.is_none() {
                chosen = Some(descriptor);
            } else {
                extra += 1;
            }
        }

        let descriptor = chosen.ok_or_else(|| {
            LoaderError::plugin_not_found(
                module.name(),
                format!(
                    "none of {} exported types implements Tool<Config>",
                    descriptors.len()
                ),
            )
        })?;

        if extra > 0 {
            warn!(
                module = %module.name(),
                chosen = %descriptor.type_name(),
                ignored = extra,
                "Module exports several tools, using the first one"
            );
        }

        // SAFETY: `create` is the zero-argument constructor of the type the
        // descriptor was built for.
        let instance = NonNull::new(unsafe { (descriptor.create)() }).ok_or_else(|| {
            LoaderError::plugin_not_found(
                module.name(),
                format!("{} could not be instantiated", descriptor.type_name()),
            )
        })?;

        info!(
            module = %module.name(),
            tool = %descriptor.type_name(),
            config = %descriptor.config_type(),
            "Tool discovered"
        );

        Ok(Capability {
            module: Arc::clone(module),
            descriptor: NonNull::from(descriptor),
            instance,
        })
    }
}
