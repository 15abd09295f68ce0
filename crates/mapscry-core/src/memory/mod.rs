pub mod layout;
#[cfg(target_os = "windows")]
mod process;
mod reader;

// Mock memory reader for testing (always available for unit and integration tests)
#[doc(hidden)]
pub mod mock;

#[cfg(target_os = "windows")]
pub use process::{ProcessHandle, ProcessInfo};
#[cfg(target_os = "windows")]
pub use reader::MemoryReader;
pub use reader::{ReadMemory, remote_field, u16_at, u32_at, u64_at};

// Re-export mock for convenient access in tests
#[doc(hidden)]
pub use mock::{MockMemoryBuilder, MockMemoryReader};
