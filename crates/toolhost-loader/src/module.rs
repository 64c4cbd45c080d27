//! Loaded modules

use std::fmt;
use std::path::{Path, PathBuf};

use libloading::Library;
use toolhost_api::abi::{ToolTable, ToolTableFn};
use toolhost_api::TOOL_TABLE_SYMBOL;

use crate::error::{LoaderError, Result};

/// Module kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// Table linked into the host binary
    Static,
    /// Shared library loaded at run time
    Dynamic,
}

/// Product metadata declared by a module's table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMetadata {
    /// Product name
    pub product: String,
    /// Version
    pub version: String,
    /// Authors, as declared by the module (may be empty)
    pub authors: String,
}

impl ModuleMetadata {
    /// Display title in the form `"{product} v{version} by {authors}"`.
    ///
    /// The author part is omitted when no authors are declared.
    pub fn title(&self) -> String {
        let authors = self.authors.replace(':', ", ");
        if authors.trim().is_empty() {
            format!("{} v{}", self.product, self.version)
        } else {
            format!("{} v{} by {}", self.product, self.version, authors)
        }
    }
}

enum Backing {
    Static(&'static ToolTable),
    Dynamic(Library),
}

/// A unit of loaded code.
///
/// Tool instances and configuration values keep an `Arc<LoadedModule>`, so
/// a library is never unloaded while code from it can still run.
pub struct LoadedModule {
    name: String,
    path: Option<PathBuf>,
    backing: Backing,
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("kind", &self.kind())
            .finish()
    }
}

impl LoadedModule {
    /// Wrap a table linked into the host binary
    pub fn from_static(name: impl Into<String>, table: &'static ToolTable) -> Self {
        Self {
            name: logical_name_of(&name.into()),
            path: None,
            backing: Backing::Static(table),
        }
    }

    pub(crate) fn from_library(name: String, path: PathBuf, library: Library) -> Self {
        Self {
            name,
            path: Some(path),
            backing: Backing::Dynamic(library),
        }
    }

    /// Logical name (lower-cased file stem)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute path of the library, `None` for static modules
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Module kind
    pub fn kind(&self) -> ModuleKind {
        match self.backing {
            Backing::Static(_) => ModuleKind::Static,
            Backing::Dynamic(_) => ModuleKind::Dynamic,
        }
    }

    /// The module's capability-description table
    pub fn tool_table(&self) -> Result<&ToolTable> {
        match &self.backing {
            Backing::Static(table) => Ok(*table),
            Backing::Dynamic(library) => {
                // SAFETY: the symbol is declared by `export_tools!` with the
                // `ToolTableFn` signature; the table it returns lives as long
                // as the library, which `self` owns.
                let table = unsafe {
                    let entry = library
                        .get::<ToolTableFn>(TOOL_TABLE_SYMBOL)
                        .map_err(|e| {
                            LoaderError::plugin_not_found(
                                &self.name,
                                format!("missing toolhost_tool_table export: {e}"),
                            )
                        })?;
                    entry().as_ref()
                };

                table.ok_or_else(|| {
                    LoaderError::plugin_not_found(&self.name, "toolhost_tool_table returned null")
                })
            }
        }
    }

    /// Product metadata from the module's table
    pub fn metadata(&self) -> Result<ModuleMetadata> {
        let table = self.tool_table()?;
        Ok(ModuleMetadata {
            product: table.product().to_string(),
            version: table.version().to_string(),
            authors: table.authors().to_string(),
        })
    }
}

/// Logical module name of `path`: its file stem, lower-cased.
pub fn logical_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(logical_name_of)
        .ok_or_else(|| LoaderError::module_load(path, "path has no file name"))
}

fn logical_name_of(name: &str) -> String {
    name.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;

    static EMPTY_TABLE: Lazy<ToolTable> =
        Lazy::new(|| ToolTable::new("empty-module", "0.3.1", "Ada:Grace", &[]));

    #[test]
    fn test_logical_name() {
        assert_eq!(
            logical_name(Path::new("/opt/tools/SampleTool.so")).unwrap(),
            "sampletool"
        );
        assert_eq!(
            logical_name(Path::new("libsample_tool.dylib")).unwrap(),
            "libsample_tool"
        );
        assert!(logical_name(Path::new("/")).is_err());
    }

    #[test]
    fn test_static_module() {
        let module = LoadedModule::from_static("Empty", &EMPTY_TABLE);
        assert_eq!(module.name(), "empty");
        assert_eq!(module.kind(), ModuleKind::Static);
        assert!(module.path().is_none());
        assert!(module.tool_table().unwrap().descriptors().is_empty());
    }

    #[test]
    fn test_metadata_title() {
        let module = LoadedModule::from_static("empty", &EMPTY_TABLE);
        let metadata = module.metadata().unwrap();
        assert_eq!(metadata.product, "empty-module");
        assert_eq!(metadata.title(), "empty-module v0.3.1 by Ada, Grace");

        let anonymous = ModuleMetadata {
            product: "tool".to_string(),
            version: "1.0.0".to_string(),
            authors: String::new(),
        };
        assert_eq!(anonymous.title(), "tool v1.0.0");
    }
}
