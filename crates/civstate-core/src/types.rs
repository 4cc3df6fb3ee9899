//! Core type aliases used throughout the crate.

use serde::{Deserialize, Serialize};

/// Player slot index. Slots are the stable identity of a player.
pub type PlayerId = u8;

/// Team index.
pub type TeamId = u8;

/// Globally unique identity number of a city.
pub type CityId = u32;

/// Globally unique identity number of a unit.
pub type UnitId = u32;

/// Index of a tile in the map's row-major tile vector.
pub type TileIndex = usize;

/// Ruleset terrain index.
pub type TerrainId = usize;

/// Ruleset resource index.
pub type ResourceId = usize;

/// Ruleset extra index (roads, bases, irrigation, huts, ...).
pub type ExtraId = usize;

/// Ruleset improvement (building) index.
pub type ImprovementId = usize;

/// Ruleset technology index.
pub type TechId = usize;

/// Ruleset unit type index.
pub type UnitTypeId = usize;

/// Ruleset government index.
pub type GovernmentId = usize;

/// Ruleset specialist index.
pub type SpecialistId = usize;

/// Maximum number of simultaneous player slots.
pub const MAX_PLAYER_SLOTS: usize = 128;

/// Identity number that is never handed out; used as "none" on disk.
pub const IDENTITY_NUMBER_ZERO: u32 = 0;

/// Terrain class of a terrain type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TerrainClass {
    #[default]
    Land,
    Oceanic,
}

/// Movement domain of a unit type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UnitDomain {
    #[default]
    Land,
    Sea,
    Air,
}

impl UnitDomain {
    /// Whether units of this domain may stand on tiles of the given class
    /// without being carried.
    pub const fn is_native_to(&self, class: TerrainClass) -> bool {
        match self {
            UnitDomain::Land => matches!(class, TerrainClass::Land),
            UnitDomain::Sea => matches!(class, TerrainClass::Oceanic),
            UnitDomain::Air => true,
        }
    }
}
