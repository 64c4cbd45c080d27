//! Jump instruction encoding

/// Address width of the target architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressWidth {
    /// 32-bit addresses
    Bits32,
    /// 64-bit addresses
    Bits64,
}

impl AddressWidth {
    /// Width of the running process
    pub const fn native() -> Self {
        if cfg!(target_pointer_width = "64") {
            AddressWidth::Bits64
        } else {
            AddressWidth::Bits32
        }
    }
}

const MAX_STUB_LEN: usize = 12;

/// An unconditional x86 jump to a fixed target.
///
/// - 32-bit: `E9 rel32`, where `rel32 = target - address - 5` (5 bytes)
/// - 64-bit: `mov rax, imm64; jmp rax`, i.e. `48 B8 imm64 FF E0` (12 bytes)
///
/// The 64-bit form clobbers `rax`, which is caller-saved and never carries
/// an argument in the C calling convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpStub {
    bytes: [u8; MAX_STUB_LEN],
    len: usize,
}

impl JumpStub {
    /// Encode a jump placed at `address` that transfers control to `target`
    pub fn encode(address: usize, target: usize, width: AddressWidth) -> Self {
        let mut bytes = [0u8; MAX_STUB_LEN];
        let len = match width {
            AddressWidth::Bits32 => {
                // Truncation keeps the two's complement low 32 bits.
                let rel = (target as u64)
                    .wrapping_sub(address as u64)
                    .wrapping_sub(5) as u32;
                bytes[0] = 0xE9;
                bytes[1..5].copy_from_slice(&rel.to_le_bytes());
                5
            }
            AddressWidth::Bits64 => {
                bytes[0] = 0x48;
                bytes[1] = 0xB8;
                bytes[2..10].copy_from_slice(&(target as u64).to_le_bytes());
                bytes[10] = 0xFF;
                bytes[11] = 0xE0;
                12
            }
        };
        Self { bytes, len }
    }

    /// Encode for the running process
    pub fn for_native(address: usize, target: usize) -> Self {
        Self::encode(address, target, AddressWidth::native())
    }

    /// Encoded instruction bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Encoded length in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; a stub is never empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
