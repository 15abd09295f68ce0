//! Memory layout constants for the target's data structures.
//!
//! This module centralizes all fixed field offsets used for reading game
//! data. Offsets inside a record are `usize` (buffer-relative); offsets from
//! the module base are `u64` (address-relative). One versioned binary layout
//! is targeted; see [`LayoutProfile`] for the single layout-variant switch.

use crate::error::Result;
use crate::memory::ReadMemory;

/// Roots at fixed offsets from the module base
pub mod roots {
    /// Global unit hash table: an array of bucket head pointers
    pub const UNIT_TABLE: u64 = 0x20A_F660;
    pub const UNIT_TABLE_BUCKETS: usize = 128;

    /// UI settings block
    pub const UI_SETTINGS: u64 = 0x20B_F310;

    /// One discriminant byte selecting the layout variant (1 = expansion)
    pub const EXPANSION_FLAG: u64 = 0x20B_F322;
}

/// UI settings block fields
pub mod ui {
    /// In-game map toggle; truth is "value equals 1"
    pub const MAP_SHOWN: u64 = 0x08;
}

/// Unit record (any in-simulation entity)
pub mod unit {
    pub const UNIT_TYPE: usize = 0x00; // u32
    pub const TXT_FILE_NO: usize = 0x04; // u32
    pub const UNIT_ID: usize = 0x08; // u32
    pub const MODE: usize = 0x0C; // u32
    pub const UNIT_DATA: usize = 0x10; // ptr, type-specific payload
    pub const ACT: usize = 0x20; // ptr
    pub const PATH: usize = 0x38; // ptr
    pub const INVENTORY: usize = 0x90; // ptr
    pub const ROOM_NEXT: usize = 0x150; // ptr, next unit in the same room
    pub const LIST_NEXT: usize = 0x158; // ptr, next unit in the hash bucket
    pub const SIZE: usize = 0x160;
}

/// Room graph node
pub mod room {
    pub const ROOMS_NEAR: usize = 0x00; // ptr to array of neighbor room ptrs
    pub const ROOM_EX: usize = 0x18; // ptr
    pub const NUM_ROOMS_NEAR: usize = 0x40; // u32
    pub const ROOM_NEXT: usize = 0xB0; // ptr, second linkage through the graph
    pub const UNIT_FIRST: usize = 0xC0; // ptr, head of the room's unit list
    pub const SIZE: usize = 0xC8;
}

/// Room extension (links a room to its level)
pub mod room_ex {
    pub const LEVEL: usize = 0x90; // ptr
}

/// Level record
pub mod level {
    pub const LEVEL_NO: usize = 0x1F8; // u32 area id
}

/// Path record (unit position within the room grid)
pub mod path {
    pub const X: usize = 0x02; // u16
    pub const Y: usize = 0x06; // u16
    pub const ROOM: usize = 0x20; // ptr, the unit's current room
    pub const SIZE: usize = 0x28;
}

/// Act record
pub mod act {
    pub const MAP_SEED: usize = 0x14; // u64, validated as unsigned 32-bit
    pub const ACT_ID: usize = 0x28; // u32
    pub const ACT_MISC: usize = 0x70; // ptr
    pub const SIZE: usize = 0x78;
}

/// Act misc record
pub mod act_misc {
    pub const DIFFICULTY: u64 = 0x830; // u32
}

/// Player payload behind a player unit's unit-data pointer
pub mod player_data {
    pub const NAME: usize = 0x00;
    pub const NAME_LEN: usize = 16;
}

/// One of the two known binary layout variants.
///
/// The variants differ in where the ownership discriminant sits inside the
/// inventory record and in which value marks a unit as a *remote* player.
/// The active variant is selected once per poll from a single byte at a
/// fixed module offset; all other offsets are shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutProfile {
    pub name: &'static str,
    /// Offset of the ownership discriminant inside the inventory record.
    pub inventory_check: u64,
    /// Discriminant value meaning "this player is not the local player".
    pub remote_marker: u32,
}

pub static EXPANSION: LayoutProfile = LayoutProfile {
    name: "expansion",
    inventory_check: 0x70,
    remote_marker: 0,
};

pub static CLASSIC: LayoutProfile = LayoutProfile {
    name: "classic",
    inventory_check: 0x30,
    remote_marker: 1,
};

impl LayoutProfile {
    /// Select the active layout by reading the discriminant byte.
    pub fn detect<R: ReadMemory>(reader: &R, module_base: u64) -> Result<&'static LayoutProfile> {
        let flag = reader.read_u8(module_base + roots::EXPANSION_FLAG)?;
        Ok(if flag == 1 { &EXPANSION } else { &CLASSIC })
    }

    /// A unit with a live inventory is the local player exactly when its
    /// discriminant differs from the remote marker.
    pub fn is_local(&self, discriminant: u32) -> bool {
        discriminant != self.remote_marker
    }
}
