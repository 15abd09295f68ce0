//! Remote memory access primitives.

use crate::error::{Error, Result};

/// Read-only access to a remote address space.
///
/// Implemented by the live process reader on Windows and by the mock reader
/// in tests; every decoding layer above is generic over this trait and has
/// no other way to touch the target.
pub trait ReadMemory {
    /// Read exactly `len` bytes starting at `address`.
    ///
    /// A short or failed read is an error. Callers treat it as a decode
    /// failure for the whole poll step; partial buffers are never returned.
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>>;

    fn read_u8(&self, address: u64) -> Result<u8> {
        Ok(self.read_bytes(address, 1)?[0])
    }

    fn read_u32(&self, address: u64) -> Result<u32> {
        Ok(u32_at(&self.read_bytes(address, 4)?, 0))
    }

    fn read_u64(&self, address: u64) -> Result<u64> {
        Ok(u64_at(&self.read_bytes(address, 8)?, 0))
    }

    /// Read a remote pointer. The target is a 64-bit process.
    fn read_ptr(&self, address: u64) -> Result<u64> {
        self.read_u64(address)
    }
}

/// Remote base address plus field offset.
///
/// Pointers decoded from the target may be torn into garbage near the top
/// of the address space; a sum that would wrap fails the read instead.
pub fn remote_field(base: u64, offset: u64) -> Result<u64> {
    base.checked_add(offset).ok_or(Error::MemoryReadFailed {
        address: base,
        message: format!("field offset {offset:#x} overflows the address space"),
    })
}

// Little-endian field accessors for decoded buffers. The caller must have
// requested a buffer covering the full field; indexing past the end is a
// contract violation, not a runtime condition.

pub fn u16_at(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

pub fn u32_at(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

pub fn u64_at(buf: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

/// Reads the live target process via `ReadProcessMemory`.
#[cfg(target_os = "windows")]
pub struct MemoryReader<'a> {
    process: &'a super::process::ProcessHandle,
}

#[cfg(target_os = "windows")]
impl<'a> MemoryReader<'a> {
    pub fn new(process: &'a super::process::ProcessHandle) -> Self {
        Self { process }
    }
}

#[cfg(target_os = "windows")]
impl ReadMemory for MemoryReader<'_> {
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>> {
        use std::ffi::c_void;
        use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;

        if len == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = vec![0u8; len];
        let mut bytes_read = 0usize;

        // SAFETY: the buffer outlives the call and is exactly `len` bytes.
        unsafe {
            ReadProcessMemory(
                self.process.raw(),
                address as *const c_void,
                buffer.as_mut_ptr() as *mut c_void,
                len,
                Some(&mut bytes_read),
            )
        }
        .map_err(|e| Error::MemoryReadFailed {
            address,
            message: e.to_string(),
        })?;

        if bytes_read != len {
            return Err(Error::ShortRead {
                address,
                expected: len,
                actual: bytes_read,
            });
        }

        Ok(buffer)
    }
}
