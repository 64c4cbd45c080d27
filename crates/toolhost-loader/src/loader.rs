//! Module loader for tool libraries

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use libloading::Library;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use toolhost_api::ToolTable;
use tracing::{debug, info};

use crate::error::{LoaderError, Result};
use crate::module::{logical_name, LoadedModule};

static GLOBAL: Lazy<ModuleLoader> = Lazy::new(ModuleLoader::new);

/// Loads modules, at most once per logical name.
///
/// Logical names are file stems compared case-insensitively, so
/// `Tools/Sample.so` and `tools/SAMPLE.so` resolve to the same module.
#[derive(Default)]
pub struct ModuleLoader {
    modules: Mutex<HashMap<String, Arc<LoadedModule>>>,
}

impl fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("modules", &self.names())
            .finish()
    }
}

impl ModuleLoader {
    /// Create an empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide loader
    pub fn global() -> &'static ModuleLoader {
        &GLOBAL
    }

    /// Load the module at `path`.
    ///
    /// Returns the already loaded module when one with the same logical name
    /// exists, without touching the filesystem. Otherwise the path must name
    /// an existing shared library compatible with the host.
    ///
    /// # Safety
    ///
    /// Loading a library runs its initialisers with full host privileges.
    /// Only load modules from trusted sources.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Arc<LoadedModule>> {
        let path = path.as_ref();
        let name = logical_name(path)?;

        // Held across the load so one name is never opened twice.
        let mut modules = self.modules.lock();

        if let Some(module) = modules.get(&name) {
            debug!(module = %name, "Module already loaded");
            return Ok(Arc::clone(module));
        }

        let absolute = fs::canonicalize(path)
            .map_err(|e| LoaderError::module_load(path, format!("cannot resolve path: {e}")))?;

        if !absolute.is_file() {
            return Err(LoaderError::module_load(path, "not a file"));
        }

        debug!(module = %name, path = %absolute.display(), "Loading module");

        // SAFETY: see the method documentation.
        let library =
            unsafe { Library::new(&absolute) }.map_err(|e| LoaderError::module_load(path, e))?;

        let module = Arc::new(LoadedModule::from_library(name.clone(), absolute, library));
        modules.insert(name.clone(), Arc::clone(&module));

        info!(module = %name, "Module loaded");

        Ok(module)
    }

    /// Register a table linked into the host binary under `name`.
    ///
    /// Idempotent by logical name like [`ModuleLoader::load`].
    pub fn register_static(
        &self,
        name: impl Into<String>,
        table: &'static ToolTable,
    ) -> Arc<LoadedModule> {
        let module = LoadedModule::from_static(name, table);
        let mut modules = self.modules.lock();

        Arc::clone(
            modules
                .entry(module.name().to_string())
                .or_insert_with(|| Arc::new(module)),
        )
    }

    /// Get a loaded module by logical name
    pub fn get(&self, name: &str) -> Option<Arc<LoadedModule>> {
        self.modules.lock().get(&name.to_lowercase()).cloned()
    }

    /// Logical names of all loaded modules
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of loaded modules
    pub fn len(&self) -> usize {
        self.modules.lock().len()
    }

    /// Check if no module has been loaded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
