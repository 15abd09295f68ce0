//! # mapscry-core
//!
//! Core library for the mapscry map overlay: reconstructs a consistent,
//! validated snapshot of a running game's simulation state by reading the
//! target's process memory, with no cooperation from the target.
//!
//! This crate provides:
//! - Windows process discovery and scoped read-only memory access
//! - Fixed-layout record decoding (units, rooms, acts, paths)
//! - Local-player discovery via the global unit hash table
//! - Cycle-safe room-graph traversal and entity classification
//! - Snapshot validation with a session-scoped stable-fact cache
//!
//! The target mutates its memory concurrently and without coordination, so
//! every read may be torn or dangling. The engine never trusts a scalar
//! outside its known domain, bounds every traversal with a visited set, and
//! fails a whole poll rather than emit a partial snapshot.

pub mod error;
pub mod game;
pub mod memory;
pub mod scry;

pub use error::{Error, Result};
pub use game::{Area, Difficulty, UnitKind};
pub use game::records::{ActRecord, PathRecord, RoomRecord, UnitRecord};
pub use memory::ReadMemory;
#[cfg(target_os = "windows")]
pub use memory::{MemoryReader, ProcessHandle, ProcessInfo};
pub use scry::{
    Entity, EntityBuckets, GameData, PlayerRoot, Position, Scry, ScryConfig, SessionState,
    StableFacts, build_snapshot, collect_entities, locate_player,
};
