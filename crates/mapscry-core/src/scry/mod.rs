//! Poll engine: one tick, one attempt at a full validated snapshot.
//!
//! The model is single-threaded and tick-driven. A poll either yields a
//! complete [`GameData`] or nothing; transient failures are absorbed and the
//! next tick starts from whatever cached state survived.

mod collect;
mod locate;
mod snapshot;

pub use collect::{Entity, EntityBuckets, Position, collect_entities};
pub use locate::{PlayerRoot, locate_player};
pub use snapshot::{GameData, StableFacts, build_snapshot, decode_player_name};

use tracing::{debug, warn};

use crate::error::Result;
use crate::memory::ReadMemory;
use crate::memory::layout::LayoutProfile;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct ScryConfig {
    /// Target process executable name.
    pub process_name: String,
}

impl Default for ScryConfig {
    fn default() -> Self {
        Self {
            process_name: "D2R.exe".to_string(),
        }
    }
}

/// Per-session engine state: the cached player root and the stable facts.
///
/// Reset at exactly two points: the target process identity changed, or a
/// poll failed in a way that says the cached pointers are garbage.
#[derive(Debug, Default)]
pub struct SessionState {
    pid: Option<u32>,
    player_root: Option<PlayerRoot>,
    stable: StableFacts,
}

impl SessionState {
    pub fn reset(&mut self) {
        debug!("session state reset");
        self.player_root = None;
        self.stable.reset();
    }

    pub fn player_root(&self) -> Option<&PlayerRoot> {
        self.player_root.as_ref()
    }

    /// Track the target process identity; a restart invalidates every
    /// pointer learned from the previous instance.
    fn attach(&mut self, pid: u32) {
        if self.pid != Some(pid) {
            if self.pid.is_some() {
                debug!("target process changed, dropping cached roots");
            }
            self.reset();
            self.pid = Some(pid);
        }
    }
}

/// The snapshot engine. Owns the session state; `poll` is the only entry
/// point the overlay layer calls.
#[derive(Default)]
pub struct Scry {
    config: ScryConfig,
    session: SessionState,
}

impl Scry {
    pub fn new(config: ScryConfig) -> Self {
        Self {
            config,
            session: SessionState::default(),
        }
    }

    pub fn config(&self) -> &ScryConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// One full poll cycle against the live target process.
    ///
    /// The read handle is scoped to this call and released on every exit
    /// path before the poll returns. `None` means "no usable snapshot this
    /// tick"; the caller keeps showing its last good snapshot.
    #[cfg(target_os = "windows")]
    pub fn poll(&mut self) -> Option<GameData> {
        use crate::memory::{MemoryReader, ProcessHandle};

        let process = match ProcessHandle::find_and_open(&self.config.process_name) {
            Ok(process) => process,
            Err(e) => {
                debug!("attach failed: {e}");
                return None;
            }
        };
        let reader = MemoryReader::new(&process);
        self.poll_with_reader(&reader, process.pid, process.base_address, process.window)
    }

    /// One OS-independent tick against an already-attached address space.
    ///
    /// The Windows `poll` wrapper delegates here; tests drive it directly
    /// with a mock reader.
    pub fn poll_with_reader<R: ReadMemory>(
        &mut self,
        reader: &R,
        pid: u32,
        module_base: u64,
        window: isize,
    ) -> Option<GameData> {
        self.session.attach(pid);

        match self.tick(reader, module_base, window) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("poll failed: {e}");
                if e.clears_session() {
                    self.session.reset();
                }
                None
            }
        }
    }

    fn tick<R: ReadMemory>(
        &mut self,
        reader: &R,
        module_base: u64,
        window: isize,
    ) -> Result<GameData> {
        let profile = LayoutProfile::detect(reader, module_base)?;

        let root = match self.session.player_root {
            Some(root) => root,
            None => {
                let root = locate_player(reader, module_base, profile)?;
                self.session.player_root = Some(root);
                root
            }
        };

        build_snapshot(reader, module_base, &root, &mut self.session.stable, window)
    }
}
