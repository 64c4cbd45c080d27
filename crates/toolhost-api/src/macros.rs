//! Module export macro

/// Export the capability-description table of a tool module.
///
/// Generates the `toolhost_tool_table` entry point listing the given tool
/// types in declaration order. Use it once per module, in a crate built as a
/// `cdylib`.
///
/// # Example
///
/// ```rust,ignore
/// use toolhost_api::prelude::*;
///
/// #[derive(Debug, clap::Parser)]
/// struct Options {
///     #[arg(long)]
///     name: String,
/// }
///
/// #[derive(Default)]
/// struct Hello;
///
/// impl Tool for Hello {
///     type Config = Options;
///
///     fn execute(&mut self, options: Options) {
///         tracing::info!("hello, {}", options.name);
///     }
/// }
///
/// toolhost_api::export_tools!(Hello);
/// ```
#[macro_export]
macro_rules! export_tools {
    ($($tool:ty),+ $(,)?) => {
        #[no_mangle]
        pub extern "C" fn toolhost_tool_table() -> *const $crate::abi::ToolTable {
            static TOOLS: $crate::__private::Lazy<::std::vec::Vec<$crate::abi::ToolDescriptor>> =
                $crate::__private::Lazy::new(|| {
                    ::std::vec![$($crate::abi::ToolDescriptor::of::<$tool>()),+]
                });

            static TABLE: $crate::__private::Lazy<$crate::abi::ToolTable> =
                $crate::__private::Lazy::new(|| {
                    $crate::abi::ToolTable::new(
                        env!("CARGO_PKG_NAME"),
                        env!("CARGO_PKG_VERSION"),
                        env!("CARGO_PKG_AUTHORS"),
                        TOOLS.as_slice(),
                    )
                });

            &*TABLE
        }
    };
}
