//! Local-player discovery via the global unit hash table.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{Error, Result};
use crate::game::records::UnitRecord;
use crate::memory::layout::{LayoutProfile, roots};
use crate::memory::{ReadMemory, remote_field, u64_at};

/// Resolved local-player root: the unit's remote address plus the record
/// decoded from the same read. Cached across polls until invalidated.
#[derive(Debug, Clone, Copy)]
pub struct PlayerRoot {
    pub address: u64,
    pub unit: UnitRecord,
}

/// Walk the unit hash table and return the first unit that owns a live
/// inventory and whose ownership discriminant says "local".
///
/// Bucket chains come from foreign memory and may be torn into loops, so
/// every chain node is checked against a visited set. An unreadable node
/// ends its chain without failing the walk; only a fully-walked table with
/// no match is a resolution failure.
pub fn locate_player<R: ReadMemory>(
    reader: &R,
    module_base: u64,
    profile: &LayoutProfile,
) -> Result<PlayerRoot> {
    let table = reader.read_bytes(
        module_base + roots::UNIT_TABLE,
        roots::UNIT_TABLE_BUCKETS * 8,
    )?;
    let mut walked: HashSet<u64> = HashSet::new();

    for bucket in 0..roots::UNIT_TABLE_BUCKETS {
        let mut unit_addr = u64_at(&table, bucket * 8);

        while unit_addr != 0 && walked.insert(unit_addr) {
            let unit = match UnitRecord::read(reader, unit_addr) {
                Ok(unit) => unit,
                Err(e) => {
                    debug!("bucket {bucket}: unreadable unit at {unit_addr:#x}: {e}");
                    break;
                }
            };

            if unit.inventory != 0 {
                match remote_field(unit.inventory, profile.inventory_check)
                    .and_then(|address| reader.read_u32(address))
                {
                    Ok(discriminant) if profile.is_local(discriminant) => {
                        debug!(
                            "local player at {unit_addr:#x} (bucket {bucket}, {} layout)",
                            profile.name
                        );
                        return Ok(PlayerRoot {
                            address: unit_addr,
                            unit,
                        });
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!("bucket {bucket}: unreadable inventory at {unit_addr:#x}: {e}");
                    }
                }
            }

            unit_addr = unit.list_next;
        }
    }

    Err(Error::PlayerNotFound)
}
