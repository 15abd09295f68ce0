//! Target process discovery and scoped read handles.

use tracing::debug;
use windows::Win32::Foundation::{BOOL, CloseHandle, HANDLE};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, MODULEENTRY32W, Module32FirstW, PROCESSENTRY32W, Process32FirstW,
    Process32NextW, TH32CS_SNAPMODULE, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ};
use windows::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowThreadProcessId};

use crate::error::{Error, Result};

/// A running instance of the target executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    /// Main window handle, non-zero only when this instance owns the
    /// foreground window.
    pub window: isize,
}

/// Scoped read-only capability on the target process.
///
/// Opened at the start of a poll cycle and closed on drop, so the handle is
/// released on every exit path, success or failure.
pub struct ProcessHandle {
    handle: HANDLE,
    pub pid: u32,
    pub base_address: u64,
    pub module_size: u64,
    pub window: isize,
}

impl ProcessHandle {
    /// Find the target process and open it for reading.
    ///
    /// When several instances are running, the one owning the foreground
    /// window wins; otherwise the first instance found by name is used.
    pub fn find_and_open(process_name: &str) -> Result<Self> {
        let info = select_process(process_name)?;
        Self::open(info)
    }

    pub fn open(info: ProcessInfo) -> Result<Self> {
        // SAFETY: plain Win32 call; the returned handle is owned by Self.
        let handle = unsafe {
            OpenProcess(
                PROCESS_VM_READ | PROCESS_QUERY_INFORMATION,
                BOOL::from(false),
                info.pid,
            )
        }
        .map_err(|e| Error::ProcessOpenFailed(format!("pid {}: {e}", info.pid)))?;

        let (base_address, module_size) = match main_module(info.pid) {
            Ok(module) => module,
            Err(e) => {
                // SAFETY: handle came from OpenProcess above.
                unsafe {
                    let _ = CloseHandle(handle);
                }
                return Err(e);
            }
        };

        debug!(
            "opened pid {} (base {:#x}, {:#x} bytes)",
            info.pid, base_address, module_size
        );

        Ok(Self {
            handle,
            pid: info.pid,
            base_address,
            module_size,
            window: info.window,
        })
    }

    pub(crate) fn raw(&self) -> HANDLE {
        self.handle
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        // SAFETY: the handle is owned by this struct and not yet closed.
        unsafe {
            let _ = CloseHandle(self.handle);
        }
    }
}

/// Pick the candidate instance of the target executable.
fn select_process(process_name: &str) -> Result<ProcessInfo> {
    let pids = enumerate_processes(process_name)?;
    if pids.is_empty() {
        return Err(Error::ProcessNotFound(process_name.to_string()));
    }

    if let Some((pid, window)) = foreground_window() {
        if pids.contains(&pid) {
            return Ok(ProcessInfo { pid, window });
        }
    }

    Ok(ProcessInfo {
        pid: pids[0],
        window: 0,
    })
}

/// All pids whose executable name matches (case-insensitive).
fn enumerate_processes(process_name: &str) -> Result<Vec<u32>> {
    // SAFETY: toolhelp snapshot enumeration per the Win32 contract; the
    // snapshot handle is closed before returning.
    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)
            .map_err(|e| Error::ProcessOpenFailed(format!("process snapshot: {e}")))?;

        let mut pids = Vec::new();
        let mut entry: PROCESSENTRY32W = std::mem::zeroed();
        entry.dwSize = std::mem::size_of::<PROCESSENTRY32W>() as u32;

        let mut more = Process32FirstW(snapshot, &mut entry).is_ok();
        while more {
            if utf16_until_nul(&entry.szExeFile).eq_ignore_ascii_case(process_name) {
                pids.push(entry.th32ProcessID);
            }
            more = Process32NextW(snapshot, &mut entry).is_ok();
        }

        let _ = CloseHandle(snapshot);
        Ok(pids)
    }
}

/// Base address and size of the process's main module.
fn main_module(pid: u32) -> Result<(u64, u64)> {
    // SAFETY: as in enumerate_processes; the first module in the snapshot is
    // the executable itself.
    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPMODULE, pid)
            .map_err(|e| Error::ProcessOpenFailed(format!("module snapshot pid {pid}: {e}")))?;

        let mut entry: MODULEENTRY32W = std::mem::zeroed();
        entry.dwSize = std::mem::size_of::<MODULEENTRY32W>() as u32;

        let first = Module32FirstW(snapshot, &mut entry);
        let _ = CloseHandle(snapshot);

        first.map_err(|e| Error::ProcessOpenFailed(format!("main module pid {pid}: {e}")))?;
        Ok((entry.modBaseAddr as u64, entry.modBaseSize as u64))
    }
}

/// Pid and handle of the window currently holding input focus.
fn foreground_window() -> Option<(u32, isize)> {
    // SAFETY: plain Win32 queries with no ownership transfer.
    unsafe {
        let hwnd = GetForegroundWindow();
        if hwnd.is_invalid() {
            return None;
        }
        let mut pid = 0u32;
        GetWindowThreadProcessId(hwnd, Some(&mut pid));
        (pid != 0).then_some((pid, hwnd.0 as isize))
    }
}

fn utf16_until_nul(buf: &[u16]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}
