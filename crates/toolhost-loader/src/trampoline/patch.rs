//! Binding by rewriting a compiled placeholder

use std::ffi::{c_int, c_void};
use std::fs;
use std::ptr;

use once_cell::sync::OnceCell;
use tracing::{debug, error};

use super::{same_entry, BindOutcome, CallSite, EntryPoint, JumpStub};
use crate::error::{LoaderError, Result};

static GLOBAL: PatchedStub = PatchedStub::new();

/// Placeholder overwritten with a jump to the bound entry point.
///
/// Only reachable unpatched through a bug; the body is large enough to
/// hold the widest [`JumpStub`].
#[inline(never)]
unsafe extern "C" fn execute_placeholder(instance: *mut c_void, config: *mut c_void) {
    error!(
        ?instance,
        ?config,
        "Unpatched tool entry point called, aborting"
    );
    std::process::abort();
}

/// Makes a code range writable and restores its protection on drop
#[derive(Debug)]
pub struct ProtectionGuard {
    start: usize,
    len: usize,
    restore: c_int,
}

impl ProtectionGuard {
    /// Make `len` bytes at `addr` readable, writable and executable
    pub fn new(addr: *const u8, len: usize) -> Result<Self> {
        // SAFETY: sysconf has no preconditions.
        let page = match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
            size if size > 0 => size as usize,
            _ => 4096,
        };

        let addr = addr as usize;
        let start = addr & !(page - 1);
        let end = (addr + len + page - 1) & !(page - 1);

        let restore = fs::read_to_string("/proc/self/maps")
            .ok()
            .and_then(|maps| parse_maps_protection(&maps, addr))
            .unwrap_or(libc::PROT_READ | libc::PROT_EXEC);

        // SAFETY: the range is page aligned and covers mapped pages holding
        // `addr`.
        let rc = unsafe {
            libc::mprotect(
                start as *mut c_void,
                end - start,
                libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC,
            )
        };
        if rc != 0 {
            return Err(LoaderError::patch(format!(
                "mprotect failed: {}",
                std::io::Error::last_os_error()
            )));
        }

        Ok(Self {
            start,
            len: end - start,
            restore,
        })
    }
}

impl Drop for ProtectionGuard {
    fn drop(&mut self) {
        // SAFETY: same range that was successfully reprotected in `new`.
        let rc = unsafe { libc::mprotect(self.start as *mut c_void, self.len, self.restore) };
        if rc != 0 {
            error!(
                start = self.start,
                len = self.len,
                "Failed to restore code protection: {}",
                std::io::Error::last_os_error()
            );
        }
    }
}

/// Protection of the mapping containing `addr`, from `/proc/self/maps`
/// content.
pub(crate) fn parse_maps_protection(maps: &str, addr: usize) -> Option<c_int> {
    maps.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        let range = fields.next()?;
        let perms = fields.next()?;

        let (start, end) = range.split_once('-')?;
        let start = usize::from_str_radix(start, 16).ok()?;
        let end = usize::from_str_radix(end, 16).ok()?;
        if addr < start || addr >= end {
            return None;
        }

        let mut prot = libc::PROT_NONE;
        for (flag, bit) in perms.chars().zip([libc::PROT_READ, libc::PROT_WRITE, libc::PROT_EXEC]) {
            if flag != '-' {
                prot |= bit;
            }
        }
        Some(prot)
    })
}

/// Write `bytes` over executable code at `addr`.
///
/// # Safety
///
/// `addr..addr + bytes.len()` must be mapped, and no thread may be executing
/// that range while it is written.
pub unsafe fn write_code(addr: *mut u8, bytes: &[u8]) -> Result<()> {
    let _guard = ProtectionGuard::new(addr, bytes.len())?;
    ptr::copy_nonoverlapping(bytes.as_ptr(), addr, bytes.len());
    Ok(())
}

/// A call site backed by a placeholder function whose code is replaced with
/// a jump to the bound entry point.
///
/// Calls go through the placeholder address, so once patched they cost one
/// direct call plus one jump.
#[derive(Debug)]
pub struct PatchedStub {
    target: OnceCell<EntryPoint>,
}

impl PatchedStub {
    const fn new() -> Self {
        Self {
            target: OnceCell::new(),
        }
    }

    /// The process-wide stub. There is exactly one placeholder to patch.
    pub fn global() -> &'static PatchedStub {
        &GLOBAL
    }

    fn placeholder() -> EntryPoint {
        // Through `black_box` so the optimiser cannot see the unpatched body
        // at call sites.
        std::hint::black_box(execute_placeholder as EntryPoint)
    }
}

impl CallSite for PatchedStub {
    fn bind(&self, target: EntryPoint) -> Result<BindOutcome> {
        let mut first = None;
        let current = *self.target.get_or_try_init(|| {
            let address = Self::placeholder() as usize;

            if address == target as usize {
                debug!(
                    address = format_args!("{address:#x}"),
                    "Placeholder already is the entry point, nothing to patch"
                );
                first = Some(BindOutcome::AlreadyBound);
                return Ok::<_, LoaderError>(target);
            }

            let stub = JumpStub::for_native(address, target as usize);
            debug!(
                address = format_args!("{address:#x}"),
                target = format_args!("{:#x}", target as usize),
                len = stub.len(),
                "Patching tool entry point"
            );

            // SAFETY: the placeholder is a compiled function at least as long
            // as the stub, and is never executed before it is bound.
            unsafe { write_code(address as *mut u8, stub.as_bytes())? };
            first = Some(BindOutcome::Bound);
            Ok(target)
        })?;

        match first {
            Some(outcome) => Ok(outcome),
            None if same_entry(current, target) => Ok(BindOutcome::AlreadyBound),
            None => Err(LoaderError::patch(
                "call site is already bound to a different entry point",
            )),
        }
    }

    unsafe fn call(&self, instance: *mut c_void, config: *mut c_void) -> Result<()> {
        if !self.is_bound() {
            return Err(LoaderError::patch("call site is not bound"));
        }
        Self::placeholder()(instance, config);
        Ok(())
    }

    fn is_bound(&self) -> bool {
        self.target.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPS: &str = "\
55d0c0a00000-55d0c0a22000 r--p 00000000 08:01 1234 /usr/bin/toolhost
55d0c0a22000-55d0c0b00000 r-xp 00022000 08:01 1234 /usr/bin/toolhost
7f0000000000-7f0000021000 rw-p 00000000 00:00 0
";

    #[test]
    fn test_parse_maps_protection() {
        assert_eq!(
            parse_maps_protection(MAPS, 0x55d0_c0a2_3000),
            Some(libc::PROT_READ | libc::PROT_EXEC)
        );
        assert_eq!(
            parse_maps_protection(MAPS, 0x7f00_0000_0010),
            Some(libc::PROT_READ | libc::PROT_WRITE)
        );
        assert_eq!(parse_maps_protection(MAPS, 0x1000), None);
    }

    #[test]
    fn test_write_code_on_anonymous_page() {
        unsafe {
            let page = libc::mmap(
                ptr::null_mut(),
                4096,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            );
            assert_ne!(page, libc::MAP_FAILED);

            let addr = (page as *mut u8).add(64);
            let stub = JumpStub::for_native(addr as usize, 0x4000);
            write_code(addr, stub.as_bytes()).unwrap();

            let written = std::slice::from_raw_parts(addr, stub.len());
            assert_eq!(written, stub.as_bytes());

            libc::munmap(page, 4096);
        }
    }

    // Serialises tests that read or write the placeholder's code.
    static PLACEHOLDER_LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());

    fn placeholder_bytes(len: usize) -> Vec<u8> {
        let address = PatchedStub::placeholder() as usize as *const u8;
        unsafe { std::slice::from_raw_parts(address, len) }.to_vec()
    }

    #[test]
    fn test_binding_placeholder_to_itself_writes_nothing() {
        let _lock = PLACEHOLDER_LOCK.lock();
        let stub = PatchedStub::new();
        let len = JumpStub::for_native(0, 0).len();
        let before = placeholder_bytes(len);

        let outcome = stub.bind(PatchedStub::placeholder()).unwrap();

        assert_eq!(outcome, BindOutcome::AlreadyBound);
        assert!(stub.is_bound());
        assert_eq!(placeholder_bytes(len), before);
        assert_eq!(
            stub.bind(PatchedStub::placeholder()).unwrap(),
            BindOutcome::AlreadyBound
        );
    }

    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    #[test]
    fn test_patched_call_reaches_target() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static CALLS: AtomicUsize = AtomicUsize::new(0);

        unsafe extern "C" fn target(_instance: *mut c_void, config: *mut c_void) {
            CALLS.fetch_add(config as usize, Ordering::SeqCst);
        }

        unsafe extern "C" fn other(_instance: *mut c_void, _config: *mut c_void) {}

        let _lock = PLACEHOLDER_LOCK.lock();
        let stub = PatchedStub::global();
        assert!(matches!(
            unsafe { stub.call(ptr::null_mut(), ptr::null_mut()) },
            Err(LoaderError::Patch(_))
        ));

        assert_eq!(stub.bind(target).unwrap(), BindOutcome::Bound);
        assert_eq!(stub.bind(target).unwrap(), BindOutcome::AlreadyBound);
        assert!(stub.bind(other).is_err());

        unsafe { stub.call(ptr::null_mut(), 3 as *mut c_void) }.unwrap();
        assert_eq!(CALLS.load(Ordering::SeqCst), 3);
    }
}
