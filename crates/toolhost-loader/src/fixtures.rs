//! Tools shared by the unit tests

use std::sync::atomic::{AtomicUsize, Ordering};

use clap::Parser;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use toolhost_api::abi::CONTRACT_TOOL;
use toolhost_api::{Tool, ToolDescriptor, ToolTable};

static RECORDS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(Vec::new()));

static DROPPED_CONFIGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(Vec::new()));

static TRACKED_LIVE: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Parser)]
pub(crate) struct EchoOptions {
    #[arg(long)]
    pub(crate) required: String,
}

/// Appends its `--required` value to the shared record list
#[derive(Debug, Default)]
pub(crate) struct Echo;

impl Tool for Echo {
    type Config = EchoOptions;

    fn title(&self) -> &str {
        "Echo"
    }

    fn execute(&mut self, config: EchoOptions) {
        RECORDS.lock().push(config.required);
    }
}

/// Appends its `--required` value upper-cased
#[derive(Debug, Default)]
pub(crate) struct Shout;

impl Tool for Shout {
    type Config = EchoOptions;

    fn execute(&mut self, config: EchoOptions) {
        RECORDS.lock().push(config.required.to_uppercase());
    }
}

/// Counts live instances
#[derive(Debug)]
pub(crate) struct Tracked;

impl Default for Tracked {
    fn default() -> Self {
        TRACKED_LIVE.fetch_add(1, Ordering::SeqCst);
        Tracked
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        TRACKED_LIVE.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Tool for Tracked {
    type Config = EchoOptions;

    fn execute(&mut self, _config: EchoOptions) {}
}

/// Options that record their value when dropped
#[derive(Debug, Clone, Parser)]
pub(crate) struct CountedOptions {
    #[arg(long)]
    pub(crate) required: String,
}

impl Drop for CountedOptions {
    fn drop(&mut self) {
        DROPPED_CONFIGS.lock().push(self.required.clone());
    }
}

/// Takes [`CountedOptions`] and does nothing with them
#[derive(Debug, Default)]
pub(crate) struct Counted;

impl Tool for Counted {
    type Config = CountedOptions;

    fn execute(&mut self, _config: CountedOptions) {}
}

static ECHO_TOOLS: Lazy<Vec<ToolDescriptor>> = Lazy::new(|| vec![ToolDescriptor::of::<Echo>()]);
static ECHO_TABLE: Lazy<ToolTable> =
    Lazy::new(|| ToolTable::new("echo-module", "2.0.0", "Echo Authors", ECHO_TOOLS.as_slice()));

static SHOUT_TOOLS: Lazy<Vec<ToolDescriptor>> =
    Lazy::new(|| vec![ToolDescriptor::of::<Shout>()]);
static SHOUT_TABLE: Lazy<ToolTable> =
    Lazy::new(|| ToolTable::new("shout-module", "1.0.0", "", SHOUT_TOOLS.as_slice()));

static TRACKED_TOOLS: Lazy<Vec<ToolDescriptor>> =
    Lazy::new(|| vec![ToolDescriptor::of::<Tracked>()]);
static TRACKED_TABLE: Lazy<ToolTable> =
    Lazy::new(|| ToolTable::new("tracked-module", "1.0.0", "", TRACKED_TOOLS.as_slice()));

static COUNTED_TOOLS: Lazy<Vec<ToolDescriptor>> =
    Lazy::new(|| vec![ToolDescriptor::of::<Counted>()]);
static COUNTED_TABLE: Lazy<ToolTable> =
    Lazy::new(|| ToolTable::new("counted-module", "1.0.0", "", COUNTED_TOOLS.as_slice()));

pub(crate) fn echo_table() -> &'static ToolTable {
    &ECHO_TABLE
}

pub(crate) fn shout_table() -> &'static ToolTable {
    &SHOUT_TABLE
}

pub(crate) fn tracked_table() -> &'static ToolTable {
    &TRACKED_TABLE
}

pub(crate) fn counted_table() -> &'static ToolTable {
    &COUNTED_TABLE
}

pub(crate) fn tracked_instances() -> usize {
    TRACKED_LIVE.load(Ordering::SeqCst)
}

/// Descriptor of a type implementing some other contract
pub(crate) fn foreign_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        contract: CONTRACT_TOOL + 1,
        config_arity: 2,
        ..ToolDescriptor::of::<Shout>()
    }
}

/// Whether `value` has been recorded by [`Echo`] or [`Shout`]
pub(crate) fn recorded(value: &str) -> bool {
    RECORDS.lock().iter().any(|r| r == value)
}

/// Whether a [`CountedOptions`] holding `value` has been dropped
pub(crate) fn config_dropped(value: &str) -> bool {
    DROPPED_CONFIGS.lock().iter().any(|v| v == value)
}
