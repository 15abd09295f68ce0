//! Room-graph traversal and entity collection.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};
use crate::game::enums::UnitKind;
use crate::game::records::{PathRecord, RoomRecord, UnitRecord};
use crate::memory::{ReadMemory, u64_at};

/// Grid position inside the current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

/// One classified entity from a room's unit list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub unit_id: u32,
    pub kind: UnitKind,
    pub txt_file_no: u32,
    pub position: Position,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityBuckets {
    pub players: Vec<Entity>,
    pub monsters: Vec<Entity>,
    pub items: Vec<Entity>,
    pub objects: Vec<Entity>,
    pub shrines: Vec<Entity>,
}

impl EntityBuckets {
    pub fn total(&self) -> usize {
        self.players.len()
            + self.monsters.len()
            + self.items.len()
            + self.objects.len()
            + self.shrines.len()
    }
}

/// Neighbor counts come from foreign memory and size a read request; the
/// target never links more than a handful of adjacent rooms, so anything
/// larger is a torn read.
const MAX_ROOMS_NEAR: u32 = 64;

/// Walk the room graph from `start_room` and classify every live unit.
///
/// Rooms commonly reference each other bidirectionally and the next-room
/// chain can loop back on itself, so the traversal is an iterative worklist
/// with an address-keyed visited set: no pointer is followed before the set
/// is checked, and each room and unit is decoded at most once per poll.
///
/// Any failed read aborts the whole collection. A partial entity set is
/// never returned as if it were ground truth.
pub fn collect_entities<R: ReadMemory>(reader: &R, start_room: u64) -> Result<EntityBuckets> {
    let mut buckets = EntityBuckets::default();
    let mut visited: HashSet<u64> = HashSet::new();
    let mut seen_units: HashSet<u64> = HashSet::new();
    let mut pending = vec![start_room];

    while let Some(address) = pending.pop() {
        if address == 0 || !visited.insert(address) {
            continue;
        }
        let room = RoomRecord::read(reader, address)?;

        if room.rooms_near != 0 && room.num_rooms_near > 0 {
            if room.num_rooms_near > MAX_ROOMS_NEAR {
                return Err(Error::Validation {
                    field: "numRoomsNear",
                    value: room.num_rooms_near as u64,
                });
            }
            let count = room.num_rooms_near as usize;
            let neighbors = reader.read_bytes(room.rooms_near, count * 8)?;
            for i in 0..count {
                let near = u64_at(&neighbors, i * 8);
                if near != 0 && !visited.contains(&near) {
                    pending.push(near);
                }
            }
        }
        if room.room_next != 0 && !visited.contains(&room.room_next) {
            pending.push(room.room_next);
        }

        let mut unit_addr = room.unit_first;
        while unit_addr != 0 && seen_units.insert(unit_addr) {
            let unit = UnitRecord::read(reader, unit_addr)?;
            classify(reader, &unit, &mut buckets)?;
            unit_addr = unit.room_next;
        }
    }

    trace!(
        "collected {} entities across {} rooms",
        buckets.total(),
        visited.len()
    );
    Ok(buckets)
}

fn classify<R: ReadMemory>(
    reader: &R,
    unit: &UnitRecord,
    buckets: &mut EntityBuckets,
) -> Result<()> {
    let kind = match unit.kind() {
        Some(kind) => kind,
        None => return Ok(()),
    };
    let bucket = match kind {
        UnitKind::Player => &mut buckets.players,
        UnitKind::Monster => {
            if !unit.is_true_monster() {
                return Ok(());
            }
            &mut buckets.monsters
        }
        UnitKind::Item => &mut buckets.items,
        UnitKind::Object => {
            if unit.is_shrine() {
                &mut buckets.shrines
            } else {
                &mut buckets.objects
            }
        }
        UnitKind::Missile | UnitKind::Tile => return Ok(()),
    };

    let position = if unit.path != 0 {
        let path = PathRecord::read(reader, unit.path)?;
        Position {
            x: path.x,
            y: path.y,
        }
    } else {
        Position::default()
    };

    bucket.push(Entity {
        unit_id: unit.unit_id,
        kind,
        txt_file_no: unit.txt_file_no,
        position,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::layout::{path, room, unit};
    use crate::memory::MockMemoryBuilder;

    const R1: u64 = 0x2000_0000;
    const R2: u64 = 0x2100_0000;
    const R3: u64 = 0x2200_0000;
    const NEAR_R1: u64 = 0x2300_0000;
    const NEAR_R2: u64 = 0x2400_0000;

    fn room_at(
        builder: MockMemoryBuilder,
        address: u64,
        near_array: u64,
        near: &[u64],
        next: u64,
        unit_first: u64,
    ) -> MockMemoryBuilder {
        let mut builder = builder
            .zeros(address, room::SIZE)
            .ptr(address + room::ROOMS_NEAR as u64, near_array)
            .u32(address + room::NUM_ROOMS_NEAR as u64, near.len() as u32)
            .ptr(address + room::ROOM_NEXT as u64, next)
            .ptr(address + room::UNIT_FIRST as u64, unit_first);
        for (i, neighbor) in near.iter().enumerate() {
            builder = builder.ptr(near_array + i as u64 * 8, *neighbor);
        }
        builder
    }

    fn unit_at(
        builder: MockMemoryBuilder,
        address: u64,
        kind: UnitKind,
        unit_id: u32,
        mode: u32,
        room_next: u64,
    ) -> MockMemoryBuilder {
        let path_addr = address + 0x10_000;
        builder
            .zeros(address, unit::SIZE)
            .u32(address + unit::UNIT_TYPE as u64, kind as u32)
            .u32(address + unit::UNIT_ID as u64, unit_id)
            .u32(address + unit::MODE as u64, mode)
            .ptr(address + unit::UNIT_DATA as u64, 0x5000)
            .ptr(address + unit::PATH as u64, path_addr)
            .ptr(address + unit::ROOM_NEXT as u64, room_next)
            .zeros(path_addr, path::SIZE)
            .u16(path_addr + path::X as u64, unit_id as u16)
            .u16(path_addr + path::Y as u64, unit_id as u16 + 1)
    }

    /// R1 near R2, R2 near R3, R3 next R1: a cycle through both linkages.
    fn three_room_cycle(monster_mode: u32) -> crate::memory::MockMemoryReader {
        let builder = MockMemoryBuilder::new();
        let builder = room_at(builder, R1, NEAR_R1, &[R2], 0, 0);
        let builder = room_at(builder, R2, NEAR_R2, &[R3], 0, 0x3000_0000);
        let builder = room_at(builder, R3, 0, &[], R1, 0x3100_0000);
        let builder = unit_at(builder, 0x3000_0000, UnitKind::Monster, 7, monster_mode, 0);
        let builder = unit_at(builder, 0x3100_0000, UnitKind::Item, 9, 0, 0);
        builder.build()
    }

    #[test]
    fn test_cycle_terminates_with_one_decode_per_room() {
        let reader = three_room_cycle(5);
        let buckets = collect_entities(&reader, R1).unwrap();

        assert_eq!(buckets.monsters.len(), 1);
        assert_eq!(buckets.items.len(), 1);
        assert_eq!(buckets.monsters[0].position, Position { x: 7, y: 8 });

        for room_addr in [R1, R2, R3] {
            assert_eq!(reader.reads_at(room_addr), 1);
        }
    }

    #[test]
    fn test_dead_monster_excluded() {
        let reader = three_room_cycle(12);
        let buckets = collect_entities(&reader, R1).unwrap();
        assert!(buckets.monsters.is_empty());
        assert_eq!(buckets.items.len(), 1);
    }

    #[test]
    fn test_no_double_count_when_unit_listed_twice() {
        // The same item heads the unit list of two rooms
        let builder = MockMemoryBuilder::new();
        let builder = room_at(builder, R1, NEAR_R1, &[R2], 0, 0x3100_0000);
        let builder = room_at(builder, R2, 0, &[], 0, 0x3100_0000);
        let reader = unit_at(builder, 0x3100_0000, UnitKind::Item, 9, 0, 0).build();

        let buckets = collect_entities(&reader, R1).unwrap();
        assert_eq!(buckets.items.len(), 1);
        assert_eq!(buckets.total(), 1);
    }

    #[test]
    fn test_self_looping_unit_list_terminates() {
        let builder = MockMemoryBuilder::new();
        let builder = room_at(builder, R1, 0, &[], 0, 0x3000_0000);
        let reader = unit_at(builder, 0x3000_0000, UnitKind::Monster, 7, 5, 0x3000_0000).build();

        let buckets = collect_entities(&reader, R1).unwrap();
        assert_eq!(buckets.monsters.len(), 1);
    }

    #[test]
    fn test_torn_neighbor_count_rejected() {
        // An all-ones count would size a multi-gigabyte read request
        let builder = MockMemoryBuilder::new();
        let reader = room_at(builder, R1, NEAR_R1, &[], 0, 0)
            .u32(R1 + room::NUM_ROOMS_NEAR as u64, 0xFFFF_FFFF)
            .build();

        assert!(matches!(
            collect_entities(&reader, R1),
            Err(Error::Validation {
                field: "numRoomsNear",
                ..
            })
        ));
        // The bad count never turned into a read request
        assert!(reader.reads().iter().all(|(_, len)| *len <= room::SIZE));
    }

    #[test]
    fn test_failed_read_aborts_collection() {
        // R2's unit list points into unmapped memory
        let builder = MockMemoryBuilder::new();
        let builder = room_at(builder, R1, NEAR_R1, &[R2], 0, 0);
        let reader = room_at(builder, R2, 0, &[], 0, 0xDEAD_0000).build();

        assert!(collect_entities(&reader, R1).is_err());
    }

    #[test]
    fn test_shrine_and_object_split() {
        let builder = MockMemoryBuilder::new();
        let builder = room_at(builder, R1, 0, &[], 0, 0x3000_0000);
        let builder = unit_at(builder, 0x3000_0000, UnitKind::Object, 1, 0, 0x3100_0000)
            .u32(0x3000_0000 + unit::TXT_FILE_NO as u64, 85);
        let reader = unit_at(builder, 0x3100_0000, UnitKind::Object, 2, 0, 0)
            .u32(0x3100_0000 + unit::TXT_FILE_NO as u64, 300)
            .build();

        let buckets = collect_entities(&reader, R1).unwrap();
        assert_eq!(buckets.shrines.len(), 1);
        assert_eq!(buckets.objects.len(), 1);
    }
}
