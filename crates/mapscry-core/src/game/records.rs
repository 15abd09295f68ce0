//! Fixed-layout decodes of the target's in-memory records.
//!
//! Decoding is purely a byte-layout operation; semantic validation happens
//! in the snapshot builder. Records are read fresh every poll and never
//! cached across polls: the target may free or reuse the backing memory at
//! any time.

use crate::error::Result;
use crate::game::enums::UnitKind;
use crate::memory::layout::{act, path, room, unit};
use crate::memory::{ReadMemory, u16_at, u32_at, u64_at};

/// Monster mode values that carry the Monster tag without being a live,
/// fightable monster.
pub mod monster_mode {
    pub const DEATH: u32 = 0;
    pub const DEAD: u32 = 12;
}

/// Object txt ids that are shrines rather than plain scenery.
pub const SHRINE_TXT_IDS: std::ops::RangeInclusive<u32> = 81..=97;

/// One entity record: a player, monster, item, scenery object or missile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitRecord {
    pub address: u64,
    pub unit_type: u32,
    pub txt_file_no: u32,
    pub unit_id: u32,
    pub mode: u32,
    pub unit_data: u64,
    pub act: u64,
    pub path: u64,
    pub inventory: u64,
    pub room_next: u64,
    pub list_next: u64,
}

impl UnitRecord {
    /// Reinterpret a buffer of at least [`unit::SIZE`] bytes.
    pub fn decode(address: u64, buf: &[u8]) -> Self {
        Self {
            address,
            unit_type: u32_at(buf, unit::UNIT_TYPE),
            txt_file_no: u32_at(buf, unit::TXT_FILE_NO),
            unit_id: u32_at(buf, unit::UNIT_ID),
            mode: u32_at(buf, unit::MODE),
            unit_data: u64_at(buf, unit::UNIT_DATA),
            act: u64_at(buf, unit::ACT),
            path: u64_at(buf, unit::PATH),
            inventory: u64_at(buf, unit::INVENTORY),
            room_next: u64_at(buf, unit::ROOM_NEXT),
            list_next: u64_at(buf, unit::LIST_NEXT),
        }
    }

    pub fn read<R: ReadMemory>(reader: &R, address: u64) -> Result<Self> {
        Ok(Self::decode(address, &reader.read_bytes(address, unit::SIZE)?))
    }

    pub fn kind(&self) -> Option<UnitKind> {
        UnitKind::from_u32(self.unit_type)
    }

    /// Secondary check behind the coarse Monster tag: corpses, death
    /// animations and records with no monster payload are excluded.
    pub fn is_true_monster(&self) -> bool {
        self.kind() == Some(UnitKind::Monster)
            && self.mode != monster_mode::DEATH
            && self.mode != monster_mode::DEAD
            && self.unit_data != 0
    }

    pub fn is_shrine(&self) -> bool {
        self.kind() == Some(UnitKind::Object) && SHRINE_TXT_IDS.contains(&self.txt_file_no)
    }
}

/// One node of the room graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomRecord {
    pub address: u64,
    /// Pointer to an array of `num_rooms_near` neighbor room pointers.
    pub rooms_near: u64,
    pub room_ex: u64,
    pub num_rooms_near: u32,
    /// Second linkage through the graph; may loop back on itself.
    pub room_next: u64,
    /// Head of this room's singly-linked unit list.
    pub unit_first: u64,
}

impl RoomRecord {
    pub fn decode(address: u64, buf: &[u8]) -> Self {
        Self {
            address,
            rooms_near: u64_at(buf, room::ROOMS_NEAR),
            room_ex: u64_at(buf, room::ROOM_EX),
            num_rooms_near: u32_at(buf, room::NUM_ROOMS_NEAR),
            room_next: u64_at(buf, room::ROOM_NEXT),
            unit_first: u64_at(buf, room::UNIT_FIRST),
        }
    }

    pub fn read<R: ReadMemory>(reader: &R, address: u64) -> Result<Self> {
        Ok(Self::decode(address, &reader.read_bytes(address, room::SIZE)?))
    }
}

/// A unit's position and current room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathRecord {
    pub x: u16,
    pub y: u16,
    pub room: u64,
}

impl PathRecord {
    pub fn decode(buf: &[u8]) -> Self {
        Self {
            x: u16_at(buf, path::X),
            y: u16_at(buf, path::Y),
            room: u64_at(buf, path::ROOM),
        }
    }

    pub fn read<R: ReadMemory>(reader: &R, address: u64) -> Result<Self> {
        Ok(Self::decode(&reader.read_bytes(address, path::SIZE)?))
    }
}

/// The act record hanging off the player unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActRecord {
    /// Raw seed field, wider than the valid unsigned 32-bit domain so torn
    /// high bytes are caught by validation.
    pub map_seed_raw: u64,
    pub act_id: u32,
    pub act_misc: u64,
}

impl ActRecord {
    pub fn decode(buf: &[u8]) -> Self {
        Self {
            map_seed_raw: u64_at(buf, act::MAP_SEED),
            act_id: u32_at(buf, act::ACT_ID),
            act_misc: u64_at(buf, act::ACT_MISC),
        }
    }

    pub fn read<R: ReadMemory>(reader: &R, address: u64) -> Result<Self> {
        Ok(Self::decode(&reader.read_bytes(address, act::SIZE)?))
    }
}
