//! End-to-end poll tests against a synthetic target memory image.
//!
//! The image carries a valid unit hash table with one remote and one local
//! player, a three-room graph forming a cycle (R1 near R2, R2 near R3,
//! R3 next R1), one live monster in R2 and one item in R3.

use mapscry_core::memory::layout::{self, act, act_misc, level, path, room, room_ex, roots, ui, unit};
use mapscry_core::memory::{MockMemoryBuilder, MockMemoryReader};
use mapscry_core::{Area, Difficulty, Scry, UnitKind};

const BASE: u64 = 0x7FF6_0000_0000;
const PID: u32 = 4242;

const REMOTE_PLAYER: u64 = 0x1000_0000;
const LOCAL_PLAYER: u64 = 0x1100_0000;
const REMOTE_INV: u64 = 0x1200_0000;
const LOCAL_INV: u64 = 0x1300_0000;
const PLAYER_DATA: u64 = 0x1400_0000;
const ACT: u64 = 0x1500_0000;
const PLAYER_PATH: u64 = 0x1600_0000;
const ACT_MISC: u64 = 0x1700_0000;

const R1: u64 = 0x2000_0000;
const R2: u64 = 0x2100_0000;
const R3: u64 = 0x2200_0000;
const NEAR_R1: u64 = 0x2300_0000;
const NEAR_R2: u64 = 0x2400_0000;
const ROOM_EX: u64 = 0x2500_0000;
const LEVEL: u64 = 0x2600_0000;

const MONSTER: u64 = 0x3000_0000;
const ITEM: u64 = 0x3100_0000;

const SEED: u64 = 0xDEAD_BEEF;

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
        .ptr(address + room::ROOM_EX as u64, ROOM_EX)
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
    x: u16,
    y: u16,
) -> MockMemoryBuilder {
    let path_addr = address + 0x10_000;
    builder
        .zeros(address, unit::SIZE)
        .u32(address + unit::UNIT_TYPE as u64, kind as u32)
        .u32(address + unit::UNIT_ID as u64, unit_id)
        .u32(address + unit::MODE as u64, mode)
        .ptr(address + unit::UNIT_DATA as u64, 0x5000)
        .ptr(address + unit::PATH as u64, path_addr)
        .zeros(path_addr, path::SIZE)
        .u16(path_addr + path::X as u64, x)
        .u16(path_addr + path::Y as u64, y)
}

fn build_image() -> MockMemoryReader {
    let builder = MockMemoryBuilder::new()
        // Expansion layout in effect
        .u8(BASE + roots::EXPANSION_FLAG, 1)
        .u8(BASE + roots::UI_SETTINGS + ui::MAP_SHOWN, 1)
        // Hash table: bucket 5 chains remote -> local
        .zeros(BASE + roots::UNIT_TABLE, roots::UNIT_TABLE_BUCKETS * 8)
        .ptr(BASE + roots::UNIT_TABLE + 5 * 8, REMOTE_PLAYER)
        // Remote player: discriminant equals the remote marker
        .zeros(REMOTE_PLAYER, unit::SIZE)
        .ptr(REMOTE_PLAYER + unit::INVENTORY as u64, REMOTE_INV)
        .ptr(REMOTE_PLAYER + unit::LIST_NEXT as u64, LOCAL_PLAYER)
        .u32(REMOTE_INV + layout::EXPANSION.inventory_check, 0)
        // Local player unit
        .zeros(LOCAL_PLAYER, unit::SIZE)
        .u32(LOCAL_PLAYER + unit::UNIT_TYPE as u64, UnitKind::Player as u32)
        .u32(LOCAL_PLAYER + unit::UNIT_ID as u64, 1)
        .ptr(LOCAL_PLAYER + unit::UNIT_DATA as u64, PLAYER_DATA)
        .ptr(LOCAL_PLAYER + unit::ACT as u64, ACT)
        .ptr(LOCAL_PLAYER + unit::PATH as u64, PLAYER_PATH)
        .ptr(LOCAL_PLAYER + unit::INVENTORY as u64, LOCAL_INV)
        .u32(LOCAL_INV + layout::EXPANSION.inventory_check, 5)
        .bytes(PLAYER_DATA, b"Aliza\0\0\0\0\0\0\0\0\0\0\0")
        // Act: seed, difficulty
        .zeros(ACT, act::SIZE)
        .u64(ACT + act::MAP_SEED as u64, SEED)
        .ptr(ACT + act::ACT_MISC as u64, ACT_MISC)
        .u32(ACT_MISC + act_misc::DIFFICULTY, Difficulty::Nightmare as u32)
        // Player path into R1
        .zeros(PLAYER_PATH, path::SIZE)
        .u16(PLAYER_PATH + path::X as u64, 5600)
        .u16(PLAYER_PATH + path::Y as u64, 5700)
        .ptr(PLAYER_PATH + path::ROOM as u64, R1)
        // Level chain shared by all rooms
        .ptr(ROOM_EX + room_ex::LEVEL as u64, LEVEL)
        .u32(LEVEL + level::LEVEL_NO as u64, Area::ColdPlains as u32);

    // Room cycle: R1 near R2, R2 near R3, R3 next R1. Local player sits in
    // R1's unit list; the monster and item in R2 and R3.
    let builder = room_at(builder, R1, NEAR_R1, &[R2], 0, LOCAL_PLAYER);
    let builder = room_at(builder, R2, NEAR_R2, &[R3], 0, MONSTER);
    let builder = room_at(builder, R3, 0, &[], R1, ITEM);
    let builder = unit_at(builder, MONSTER, UnitKind::Monster, 7, 5, 5610, 5690);
    unit_at(builder, ITEM, UnitKind::Item, 9, 0, 5620, 5680).build()
}

#[test]
fn test_end_to_end_snapshot() {
    let reader = build_image();
    let mut scry = Scry::default();

    let data = scry
        .poll_with_reader(&reader, PID, BASE, 42)
        .expect("poll should produce a snapshot");

    assert_eq!(data.player_name, "Aliza");
    assert_eq!((data.player_position.x, data.player_position.y), (5600, 5700));
    assert_eq!(data.map_seed, SEED as u32);
    assert_eq!(data.difficulty, Difficulty::Nightmare);
    assert_eq!(data.area, Area::ColdPlains);
    assert!(data.map_shown);
    assert_eq!(data.main_window, 42);

    assert_eq!(data.entities.monsters.len(), 1);
    assert_eq!(data.entities.items.len(), 1);
    assert_eq!(data.entities.players.len(), 1);
    assert!(data.entities.objects.is_empty());

    // Exactly one decode per distinct room despite the cycle
    for room_addr in [R1, R2, R3] {
        assert_eq!(reader.reads_at(room_addr), 1);
    }
}

#[test]
fn test_no_entity_double_counting() {
    let reader = build_image();
    let mut scry = Scry::default();
    let data = scry.poll_with_reader(&reader, PID, BASE, 0).unwrap();

    let mut ids: Vec<u32> = data
        .entities
        .players
        .iter()
        .chain(&data.entities.monsters)
        .chain(&data.entities.items)
        .chain(&data.entities.objects)
        .chain(&data.entities.shrines)
        .map(|e| e.unit_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), data.entities.total());
}

#[test]
fn test_player_root_cached_across_polls() {
    let reader = build_image();
    let mut scry = Scry::default();

    scry.poll_with_reader(&reader, PID, BASE, 0).unwrap();
    scry.poll_with_reader(&reader, PID, BASE, 0).unwrap();

    // The hash table walk happened once; the second poll reused the root
    assert_eq!(reader.reads_at(BASE + roots::UNIT_TABLE), 1);
}

#[test]
fn test_stable_facts_survive_torn_seed() {
    let reader = build_image();
    let mut scry = Scry::default();
    scry.poll_with_reader(&reader, PID, BASE, 0).unwrap();

    // The seed field goes to garbage between polls; the cached fact wins
    reader.patch_u64(ACT + act::MAP_SEED as u64, 0);
    let data = scry.poll_with_reader(&reader, PID, BASE, 0).unwrap();
    assert_eq!(data.map_seed, SEED as u32);
}

#[test]
fn test_validation_failure_forces_reresolution() {
    let reader = build_image();
    let mut scry = Scry::default();
    scry.poll_with_reader(&reader, PID, BASE, 0).unwrap();
    assert_eq!(reader.reads_at(BASE + roots::UNIT_TABLE), 1);

    // Level id leaves the known enumeration: the poll fails and drops the
    // cached root and stable facts
    reader.patch_u32(LEVEL + level::LEVEL_NO as u64, 999);
    assert!(scry.poll_with_reader(&reader, PID, BASE, 0).is_none());
    assert!(scry.session().player_root().is_none());

    // Next poll re-runs the full hash table walk and recovers
    reader.patch_u32(LEVEL + level::LEVEL_NO as u64, Area::ColdPlains as u32);
    let data = scry.poll_with_reader(&reader, PID, BASE, 0).unwrap();
    assert_eq!(data.area, Area::ColdPlains);
    assert_eq!(reader.reads_at(BASE + roots::UNIT_TABLE), 2);
}

#[test]
fn test_process_change_resets_session() {
    let reader = build_image();
    let mut scry = Scry::default();
    scry.poll_with_reader(&reader, PID, BASE, 0).unwrap();
    assert_eq!(reader.reads_at(BASE + roots::UNIT_TABLE), 1);

    // Same image, different pid: everything is re-resolved
    scry.poll_with_reader(&reader, PID + 1, BASE, 0).unwrap();
    assert_eq!(reader.reads_at(BASE + roots::UNIT_TABLE), 2);
}

#[test]
fn test_short_read_fails_poll_but_keeps_root() {
    let reader = build_image();
    let mut scry = Scry::default();
    scry.poll_with_reader(&reader, PID, BASE, 0).unwrap();

    // The monster's record becomes unreadable: the poll fails rather than
    // returning a partial entity set, but the cached root survives
    reader.unmap(MONSTER, unit::SIZE);
    assert!(scry.poll_with_reader(&reader, PID, BASE, 0).is_none());
    assert!(scry.session().player_root().is_some());
    assert_eq!(reader.reads_at(BASE + roots::UNIT_TABLE), 1);
}
