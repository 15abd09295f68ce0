pub mod enums;
pub mod records;

pub use enums::{Area, Difficulty, UnitKind};
pub use records::{ActRecord, PathRecord, RoomRecord, UnitRecord};
