//! Mock memory reader backed by a sparse synthetic address space.
//!
//! Tests build an image of the target process with [`MockMemoryBuilder`],
//! then hand the reader to any code generic over [`ReadMemory`]. Every read
//! is logged so tests can assert how often a structure was decoded, and the
//! image can be patched in place to simulate torn reads between polls.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::memory::ReadMemory;

#[derive(Default)]
pub struct MockMemoryBuilder {
    bytes: HashMap<u64, u8>,
}

impl MockMemoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(mut self, address: u64, data: &[u8]) -> Self {
        for (i, byte) in data.iter().enumerate() {
            self.bytes.insert(address + i as u64, *byte);
        }
        self
    }

    /// Map `len` zeroed bytes; later writes overlay individual fields.
    pub fn zeros(self, address: u64, len: usize) -> Self {
        self.bytes(address, &vec![0u8; len])
    }

    pub fn u8(self, address: u64, value: u8) -> Self {
        self.bytes(address, &[value])
    }

    pub fn u16(self, address: u64, value: u16) -> Self {
        self.bytes(address, &value.to_le_bytes())
    }

    pub fn u32(self, address: u64, value: u32) -> Self {
        self.bytes(address, &value.to_le_bytes())
    }

    pub fn u64(self, address: u64, value: u64) -> Self {
        self.bytes(address, &value.to_le_bytes())
    }

    /// Alias for [`Self::u64`]; the target is a 64-bit process.
    pub fn ptr(self, address: u64, value: u64) -> Self {
        self.u64(address, value)
    }

    pub fn build(self) -> MockMemoryReader {
        MockMemoryReader {
            bytes: RefCell::new(self.bytes),
            log: RefCell::new(Vec::new()),
        }
    }
}

pub struct MockMemoryReader {
    bytes: RefCell<HashMap<u64, u8>>,
    log: RefCell<Vec<(u64, usize)>>,
}

impl MockMemoryReader {
    /// All reads performed so far, as (address, length) pairs.
    pub fn reads(&self) -> Vec<(u64, usize)> {
        self.log.borrow().clone()
    }

    /// Number of reads that started at `address`.
    pub fn reads_at(&self, address: u64) -> usize {
        self.log.borrow().iter().filter(|(a, _)| *a == address).count()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    /// Overwrite mapped bytes in place, simulating the target mutating its
    /// own memory between polls.
    pub fn patch_bytes(&self, address: u64, data: &[u8]) {
        let mut bytes = self.bytes.borrow_mut();
        for (i, byte) in data.iter().enumerate() {
            bytes.insert(address + i as u64, *byte);
        }
    }

    pub fn patch_u32(&self, address: u64, value: u32) {
        self.patch_bytes(address, &value.to_le_bytes());
    }

    pub fn patch_u64(&self, address: u64, value: u64) {
        self.patch_bytes(address, &value.to_le_bytes());
    }

    /// Unmap a range so subsequent reads of it fail.
    pub fn unmap(&self, address: u64, len: usize) {
        let mut bytes = self.bytes.borrow_mut();
        for i in 0..len as u64 {
            bytes.remove(&(address + i));
        }
    }
}

impl ReadMemory for MockMemoryReader {
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>> {
        self.log.borrow_mut().push((address, len));

        let bytes = self.bytes.borrow();
        let mut buffer = Vec::with_capacity(len);
        for i in 0..len as u64 {
            match bytes.get(&(address + i)) {
                Some(byte) => buffer.push(*byte),
                None => {
                    return Err(Error::MemoryReadFailed {
                        address,
                        message: format!("unmapped at {:#x}", address + i),
                    });
                }
            }
        }
        Ok(buffer)
    }
}
