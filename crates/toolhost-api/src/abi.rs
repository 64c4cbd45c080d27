//! ABI definitions for loadable tool modules.
//!
//! A module describes its tools with a [`ToolTable`] built when the module
//! is compiled and returned by the exported `toolhost_tool_table` function.
//! Each [`ToolDescriptor`] carries monomorphised `extern "C"` shims, so the
//! host never needs to know a tool's concrete type or its configuration
//! type: the generic boundary is crossed inside the module, once.

use std::any::type_name;
use std::ffi::c_void;
use std::{ptr, slice, str};

use crate::error::{Result, ToolError};
use crate::tool::{short_type_name, ParseResult, Tool, ToolConfig};

/// Current ABI version. Modules must match this version to be loaded.
pub const TOOLHOST_ABI_VERSION: u32 = 1;

/// Symbol name of the table entry point (null-terminated).
pub const TOOL_TABLE_SYMBOL: &[u8] = b"toolhost_tool_table\0";

/// Contract kind of [`Tool`]
pub const CONTRACT_TOOL: u32 = 1;

/// Borrowed UTF-8 string passed across the module boundary.
///
/// The referenced bytes are owned by whichever side created the value and
/// must outlive every use on the other side.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct StrRef {
    /// Pointer to the first byte
    pub ptr: *const u8,
    /// Length in bytes
    pub len: usize,
}

impl StrRef {
    /// Borrow `value`
    pub fn new(value: &str) -> Self {
        Self {
            ptr: value.as_ptr(),
            len: value.len(),
        }
    }

    /// Empty string
    pub const fn empty() -> Self {
        Self {
            ptr: ptr::null(),
            len: 0,
        }
    }

    /// View the referenced bytes as a string.
    ///
    /// Invalid UTF-8 yields an empty string.
    ///
    /// # Safety
    ///
    /// The referenced bytes must be live for `'a`.
    pub unsafe fn as_str<'a>(&self) -> &'a str {
        if self.ptr.is_null() || self.len == 0 {
            return "";
        }
        str::from_utf8(slice::from_raw_parts(self.ptr, self.len)).unwrap_or("")
    }
}

/// Host-supplied callback receiving text produced inside a module
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TextSink {
    /// Opaque context handed back to `write`
    pub context: *mut c_void,
    /// Receives one chunk of text
    pub write: unsafe extern "C" fn(context: *mut c_void, text: StrRef),
}

impl TextSink {
    /// Sink appending to `buffer`.
    ///
    /// The sink must not be used after `buffer` is dropped or moved.
    pub fn collect(buffer: &mut String) -> Self {
        Self {
            context: (buffer as *mut String).cast(),
            write: write_into_string,
        }
    }

    /// Sink discarding everything
    pub fn discard() -> Self {
        Self {
            context: ptr::null_mut(),
            write: write_nowhere,
        }
    }

    /// Send `text` to the sink
    ///
    /// # Safety
    ///
    /// `context` must still satisfy whatever `write` expects.
    pub unsafe fn emit(&self, text: &str) {
        (self.write)(self.context, StrRef::new(text));
    }
}

unsafe extern "C" fn write_into_string(context: *mut c_void, text: StrRef) {
    if let Some(buffer) = context.cast::<String>().as_mut() {
        buffer.push_str(text.as_str());
    }
}

unsafe extern "C" fn write_nowhere(_context: *mut c_void, _text: StrRef) {}

/// Status of a [`RawParse`]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// `config` holds a boxed configuration value
    Parsed = 0,
    /// Usage text was requested
    ShowUsage = 1,
    /// Parsing failed; the diagnostic went to the sink
    Failed = 2,
}

/// Parse result as it crosses the module boundary
#[repr(C)]
#[derive(Debug)]
pub struct RawParse {
    /// Outcome
    pub status: ParseStatus,
    /// Boxed `Tool::Config`, non-null only when `status` is `Parsed`
    pub config: *mut c_void,
}

/// Zero-argument construction of a boxed tool instance.
pub type CreateFn = unsafe extern "C" fn() -> *mut c_void;

/// Destroys an instance returned by [`CreateFn`].
pub type DestroyFn = unsafe extern "C" fn(instance: *mut c_void);

/// Borrows the instance's display title.
pub type TitleFn = unsafe extern "C" fn(instance: *const c_void) -> StrRef;

/// Parses tool arguments into a boxed configuration value.
pub type ParseFn =
    unsafe extern "C" fn(args: *const StrRef, len: usize, diagnostics: TextSink) -> RawParse;

/// Writes usage text to the sink.
pub type UsageFn = unsafe extern "C" fn(sink: TextSink);

/// Drops a configuration value that was never handed to [`ExecuteFn`].
pub type DropConfigFn = unsafe extern "C" fn(config: *mut c_void);

/// The tool's entry point: `(instance, config) -> ()`.
///
/// Takes ownership of `config`. Every tool's entry point has this exact
/// shape, which is what lets the host bind it to a fixed call site.
pub type ExecuteFn = unsafe extern "C" fn(instance: *mut c_void, config: *mut c_void);

/// Signature of the exported `toolhost_tool_table` function.
pub type ToolTableFn = unsafe extern "C" fn() -> *const ToolTable;

/// Describes one tool type exported by a module
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ToolDescriptor {
    /// Contract implemented by the type, [`CONTRACT_TOOL`] for [`Tool`]
    pub contract: u32,
    /// Number of type parameters of the contract
    pub config_arity: u32,
    /// Fully qualified type name of the tool
    pub type_name: StrRef,
    /// Fully qualified type name of the tool's configuration
    pub config_type: StrRef,
    /// Instance construction
    pub create: CreateFn,
    /// Instance destruction
    pub destroy: DestroyFn,
    /// Display title
    pub title: TitleFn,
    /// Argument parsing
    pub parse: ParseFn,
    /// Usage rendering
    pub usage: UsageFn,
    /// Configuration disposal
    pub drop_config: DropConfigFn,
    /// Entry point
    pub execute: ExecuteFn,
}

// Descriptors only hold 'static type names and function pointers.
unsafe impl Send for ToolDescriptor {}
unsafe impl Sync for ToolDescriptor {}

impl ToolDescriptor {
    /// Build the descriptor for `T`
    pub fn of<T: Tool>() -> Self {
        Self {
            contract: CONTRACT_TOOL,
            config_arity: 1,
            type_name: StrRef::new(type_name::<T>()),
            config_type: StrRef::new(type_name::<T::Config>()),
            create: create_shim::<T>,
            destroy: destroy_shim::<T>,
            title: title_shim::<T>,
            parse: parse_shim::<T>,
            usage: usage_shim::<T>,
            drop_config: drop_config_shim::<T>,
            execute: execute_shim::<T>,
        }
    }

    /// Check if this entry implements the single-parameter tool contract
    pub fn is_tool(&self) -> bool {
        self.contract == CONTRACT_TOOL && self.config_arity == 1
    }

    /// Tool type name
    pub fn type_name(&self) -> &str {
        // SAFETY: descriptors only reference 'static strings of the module
        // that produced them.
        unsafe { self.type_name.as_str() }
    }

    /// Configuration type name
    pub fn config_type(&self) -> &str {
        // SAFETY: see `type_name`.
        unsafe { self.config_type.as_str() }
    }
}

/// Capability-description table exported by a module
#[repr(C)]
#[derive(Debug)]
pub struct ToolTable {
    /// ABI version the module was compiled against
    pub abi_version: u32,
    /// Module product name
    pub product: StrRef,
    /// Module version
    pub version: StrRef,
    /// Module authors
    pub authors: StrRef,
    /// First descriptor
    pub tools: *const ToolDescriptor,
    /// Number of descriptors
    pub tool_count: usize,
}

// Tables only reference 'static data of the module that produced them.
unsafe impl Send for ToolTable {}
unsafe impl Sync for ToolTable {}

impl ToolTable {
    /// Build a table over `tools`, in declaration order
    pub fn new(
        product: &'static str,
        version: &'static str,
        authors: &'static str,
        tools: &'static [ToolDescriptor],
    ) -> Self {
        Self {
            abi_version: TOOLHOST_ABI_VERSION,
            product: StrRef::new(product),
            version: StrRef::new(version),
            authors: StrRef::new(authors),
            tools: tools.as_ptr(),
            tool_count: tools.len(),
        }
    }

    /// Check ABI compatibility and table shape
    pub fn validate(&self) -> Result<()> {
        if self.abi_version != TOOLHOST_ABI_VERSION {
            return Err(ToolError::AbiMismatch {
                module: self.abi_version,
                host: TOOLHOST_ABI_VERSION,
            });
        }

        if self.tools.is_null() && self.tool_count != 0 {
            return Err(ToolError::invalid_descriptor(format!(
                "table declares {} tools but has no entries",
                self.tool_count
            )));
        }

        Ok(())
    }

    /// Descriptors in declaration order
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        if self.tools.is_null() || self.tool_count == 0 {
            return &[];
        }
        // SAFETY: tables are built by `ToolTable::new` from a 'static slice.
        unsafe { slice::from_raw_parts(self.tools, self.tool_count) }
    }

    /// Module product name
    pub fn product(&self) -> &str {
        unsafe { self.product.as_str() }
    }

    /// Module version
    pub fn version(&self) -> &str {
        unsafe { self.version.as_str() }
    }

    /// Module authors
    pub fn authors(&self) -> &str {
        unsafe { self.authors.as_str() }
    }
}

unsafe extern "C" fn create_shim<T: Tool>() -> *mut c_void {
    Box::into_raw(Box::<T>::default()).cast()
}

unsafe extern "C" fn destroy_shim<T: Tool>(instance: *mut c_void) {
    if !instance.is_null() {
        drop(Box::from_raw(instance.cast::<T>()));
    }
}

unsafe extern "C" fn title_shim<T: Tool>(instance: *const c_void) -> StrRef {
    match instance.cast::<T>().as_ref() {
        Some(tool) => StrRef::new(tool.title()),
        None => StrRef::empty(),
    }
}

unsafe extern "C" fn parse_shim<T: Tool>(
    args: *const StrRef,
    len: usize,
    diagnostics: TextSink,
) -> RawParse {
    let args: Vec<String> = if args.is_null() || len == 0 {
        Vec::new()
    } else {
        slice::from_raw_parts(args, len)
            .iter()
            .map(|arg| arg.as_str().to_owned())
            .collect()
    };

    match T::Config::parse_args(short_type_name(type_name::<T>()), &args) {
        ParseResult::Parsed(config) => RawParse {
            status: ParseStatus::Parsed,
            config: Box::into_raw(Box::new(config)).cast(),
        },
        ParseResult::ShowUsage => RawParse {
            status: ParseStatus::ShowUsage,
            config: ptr::null_mut(),
        },
        ParseResult::Failed(message) => {
            diagnostics.emit(&message);
            RawParse {
                status: ParseStatus::Failed,
                config: ptr::null_mut(),
            }
        }
    }
}

unsafe extern "C" fn usage_shim<T: Tool>(sink: TextSink) {
    sink.emit(&T::Config::usage_text(short_type_name(type_name::<T>())));
}

unsafe extern "C" fn drop_config_shim<T: Tool>(config: *mut c_void) {
    if !config.is_null() {
        drop(Box::from_raw(config.cast::<T::Config>()));
    }
}

unsafe extern "C" fn execute_shim<T: Tool>(instance: *mut c_void, config: *mut c_void) {
    crate::logging::init();

    if config.is_null() {
        tracing::error!(tool = type_name::<T>(), "execute called without a configuration");
        return;
    }
    let config = *Box::from_raw(config.cast::<T::Config>());

    match instance.cast::<T>().as_mut() {
        Some(tool) => tool.execute(config),
        None => tracing::error!(tool = type_name::<T>(), "execute called without an instance"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static EXECUTED: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug, Parser)]
    struct CounterOptions {
        #[arg(long)]
        step: usize,
    }

    #[derive(Default)]
    struct Counter;

    impl Tool for Counter {
        type Config = CounterOptions;

        fn title(&self) -> &str {
            "Counter"
        }

        fn execute(&mut self, config: CounterOptions) {
            EXECUTED.fetch_add(config.step, Ordering::SeqCst);
        }
    }

    fn str_refs(values: &[&'static str]) -> Vec<StrRef> {
        values.iter().map(|v| StrRef::new(v)).collect()
    }

    #[test]
    fn test_abi_version() {
        assert_eq!(TOOLHOST_ABI_VERSION, 1);
        assert_eq!(TOOL_TABLE_SYMBOL.last(), Some(&0));
    }

    #[test]
    fn test_str_ref() {
        let value = String::from("hello");
        let raw = StrRef::new(&value);
        assert_eq!(unsafe { raw.as_str() }, "hello");
        assert_eq!(unsafe { StrRef::empty().as_str() }, "");
    }

    #[test]
    fn test_text_sink_collects() {
        let mut buffer = String::new();
        let sink = TextSink::collect(&mut buffer);
        unsafe {
            sink.emit("one ");
            sink.emit("two");
        }
        assert_eq!(buffer, "one two");

        unsafe { TextSink::discard().emit("dropped") };
    }

    #[test]
    fn test_descriptor_of() {
        let descriptor = ToolDescriptor::of::<Counter>();
        assert!(descriptor.is_tool());
        assert!(descriptor.type_name().ends_with("Counter"));
        assert!(descriptor.config_type().ends_with("CounterOptions"));
    }

    #[test]
    fn test_descriptor_shims_round_trip() {
        let descriptor = ToolDescriptor::of::<Counter>();

        unsafe {
            let instance = (descriptor.create)();
            assert!(!instance.is_null());
            assert_eq!((descriptor.title)(instance).as_str(), "Counter");

            let args = str_refs(&["--step", "5"]);
            let parsed = (descriptor.parse)(args.as_ptr(), args.len(), TextSink::discard());
            assert_eq!(parsed.status, ParseStatus::Parsed);
            assert!(!parsed.config.is_null());

            let before = EXECUTED.load(Ordering::SeqCst);
            (descriptor.execute)(instance, parsed.config);
            assert_eq!(EXECUTED.load(Ordering::SeqCst), before + 5);

            (descriptor.destroy)(instance);
        }
    }

    #[test]
    fn test_parse_shim_failure_reports_diagnostic() {
        let descriptor = ToolDescriptor::of::<Counter>();
        let mut diagnostics = String::new();

        let args = str_refs(&["--step", "not-a-number"]);
        let parsed = unsafe {
            (descriptor.parse)(
                args.as_ptr(),
                args.len(),
                TextSink::collect(&mut diagnostics),
            )
        };

        assert_eq!(parsed.status, ParseStatus::Failed);
        assert!(parsed.config.is_null());
        assert!(diagnostics.contains("not-a-number"));
    }

    #[test]
    fn test_parse_shim_help_and_usage() {
        let descriptor = ToolDescriptor::of::<Counter>();

        let args = str_refs(&["--help"]);
        let parsed = unsafe { (descriptor.parse)(args.as_ptr(), args.len(), TextSink::discard()) };
        assert_eq!(parsed.status, ParseStatus::ShowUsage);

        let mut usage = String::new();
        unsafe { (descriptor.usage)(TextSink::collect(&mut usage)) };
        assert!(usage.contains("Counter"));
        assert!(usage.contains("--step"));
    }

    #[test]
    fn test_drop_config_shim() {
        let descriptor = ToolDescriptor::of::<Counter>();
        let args = str_refs(&["--step", "1"]);
        unsafe {
            let parsed = (descriptor.parse)(args.as_ptr(), args.len(), TextSink::discard());
            (descriptor.drop_config)(parsed.config);
            (descriptor.drop_config)(ptr::null_mut());
        }
    }

    #[test]
    fn test_table_validate() {
        static TOOLS: once_cell::sync::Lazy<Vec<ToolDescriptor>> =
            once_cell::sync::Lazy::new(|| vec![ToolDescriptor::of::<Counter>()]);

        let table = ToolTable::new("counter-module", "1.2.3", "Someone", TOOLS.as_slice());
        assert!(table.validate().is_ok());
        assert_eq!(table.descriptors().len(), 1);
        assert_eq!(table.product(), "counter-module");
        assert_eq!(table.version(), "1.2.3");
        assert_eq!(table.authors(), "Someone");

        let mut stale = ToolTable::new("old", "0.1.0", "", TOOLS.as_slice());
        stale.abi_version = TOOLHOST_ABI_VERSION + 1;
        assert!(matches!(
            stale.validate(),
            Err(ToolError::AbiMismatch { .. })
        ));

        let broken = ToolTable {
            tools: ptr::null(),
            ..ToolTable::new("broken", "0.1.0", "", TOOLS.as_slice())
        };
        assert!(broken.validate().is_err());
        assert!(broken.descriptors().is_empty());
    }
}
