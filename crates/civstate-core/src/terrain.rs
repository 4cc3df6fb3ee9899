//! Ruleset definitions for terrain, resources and tile extras.

use crate::types::TerrainClass;
use serde::{Deserialize, Serialize};

/// A terrain type as defined by the ruleset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainType {
    /// Rule name, used for savefile name tables.
    pub name: String,
    /// Single character used in savefile map rows.
    pub identifier: char,
    /// Land or ocean.
    pub class: TerrainClass,
}

impl TerrainType {
    pub fn new(name: &str, identifier: char, class: TerrainClass) -> Self {
        Self {
            name: name.to_string(),
            identifier,
            class,
        }
    }

    /// Check if this is a water terrain type.
    pub fn is_water(&self) -> bool {
        self.class == TerrainClass::Oceanic
    }
}

/// A tile resource (special bonus) as defined by the ruleset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    pub name: String,
    /// Single character used in savefile resource rows.
    pub identifier: char,
}

impl ResourceType {
    pub fn new(name: &str, identifier: char) -> Self {
        Self {
            name: name.to_string(),
            identifier,
        }
    }
}

/// What an extra is, for activity-target legality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtraKind {
    Road,
    Base,
    Irrigation,
    Mine,
    Pollution,
    Fallout,
    Hut,
    River,
    Other,
}

/// A placeable tile feature: road, base, irrigation, hut, pollution...
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraType {
    pub name: String,
    pub kind: ExtraKind,
}

impl ExtraType {
    pub fn new(name: &str, kind: ExtraKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }

    /// Whether workers can build this extra.
    pub const fn is_buildable(&self) -> bool {
        matches!(
            self.kind,
            ExtraKind::Road | ExtraKind::Base | ExtraKind::Irrigation | ExtraKind::Mine
        )
    }

    /// Whether the extra can be pillaged away.
    pub const fn is_pillageable(&self) -> bool {
        matches!(
            self.kind,
            ExtraKind::Road | ExtraKind::Base | ExtraKind::Irrigation | ExtraKind::Mine
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_water_terrain() {
        assert!(TerrainType::new("Ocean", ' ', TerrainClass::Oceanic).is_water());
        assert!(!TerrainType::new("Grassland", 'g', TerrainClass::Land).is_water());
    }

    #[test]
    fn test_extra_capabilities() {
        let road = ExtraType::new("Road", ExtraKind::Road);
        let hut = ExtraType::new("Hut", ExtraKind::Hut);
        assert!(road.is_buildable());
        assert!(road.is_pillageable());
        assert!(!hut.is_buildable());
        assert!(!hut.is_pillageable());
    }
}
