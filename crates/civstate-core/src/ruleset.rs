//! The live ruleset registry.
//!
//! Everything outside the savegame name tables refers to ruleset objects by
//! their index in these vectors. Lookups from the outside world always go
//! through rule names (or terrain/resource identifier characters), never raw
//! indices, so a savefile written against one ordering stays loadable against
//! another.

use crate::terrain::{ExtraKind, ExtraType, ResourceType, TerrainType};
use crate::types::{
    ExtraId, GovernmentId, ImprovementId, ResourceId, SpecialistId, TechId, TerrainClass,
    TerrainId, UnitDomain, UnitTypeId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Improvement genus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImprovementGenus {
    Building,
    SmallWonder,
    GreatWonder,
    /// Pseudo improvements such as Coinage, which are never "built".
    Special,
}

/// A city improvement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImprovementType {
    pub name: String,
    pub genus: ImprovementGenus,
}

impl ImprovementType {
    pub fn new(name: &str, genus: ImprovementGenus) -> Self {
        Self {
            name: name.to_string(),
            genus,
        }
    }

    /// Whether the improvement can be produced again once completed.
    pub fn is_repeatable(&self) -> bool {
        self.genus == ImprovementGenus::Special
    }

    pub fn is_wonder(&self) -> bool {
        matches!(
            self.genus,
            ImprovementGenus::SmallWonder | ImprovementGenus::GreatWonder
        )
    }
}

/// A technology.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advance {
    pub name: String,
    /// Rule names of the prerequisite technologies.
    #[serde(default)]
    pub reqs: Vec<String>,
}

impl Advance {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reqs: Vec::new(),
        }
    }

    /// Add prerequisites.
    pub fn with_reqs(mut self, reqs: &[&str]) -> Self {
        self.reqs = reqs.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// A unit type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitType {
    pub name: String,
    pub domain: UnitDomain,
    /// Movement points per turn.
    pub move_rate: u32,
    pub hp: u32,
    /// Turns an air unit may stay away from a refuelling point (0 = unlimited).
    #[serde(default)]
    pub fuel: u32,
    /// Number of units this type can carry.
    #[serde(default)]
    pub transport_capacity: u32,
    #[serde(default)]
    pub can_fortify: bool,
}

impl UnitType {
    pub fn new(name: &str, domain: UnitDomain, move_rate: u32, hp: u32) -> Self {
        Self {
            name: name.to_string(),
            domain,
            move_rate,
            hp,
            fuel: 0,
            transport_capacity: 0,
            can_fortify: domain == UnitDomain::Land,
        }
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.transport_capacity = capacity;
        self
    }

    pub fn with_fuel(mut self, fuel: u32) -> Self {
        self.fuel = fuel;
        self
    }

    pub fn non_military(mut self) -> Self {
        self.can_fortify = false;
        self
    }
}

/// Errors from loading or validating a ruleset.
#[derive(Debug, thiserror::Error)]
pub enum RulesetError {
    #[error("failed to parse ruleset: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("ruleset defines no {0}")]
    Empty(&'static str),
    #[error("duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },
    #[error("technology '{tech}' requires unknown technology '{req}'")]
    UnknownRequirement { tech: String, req: String },
}

fn default_free_worked_tiles() -> u32 {
    1
}

fn default_radius_sq() -> u32 {
    5
}

fn default_veteran_levels() -> u8 {
    4
}

fn default_true() -> bool {
    true
}

/// The complete ruleset the game is running with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ruleset {
    /// Ruleset directory name, recorded in savefiles.
    pub name: String,
    pub terrains: Vec<TerrainType>,
    #[serde(default)]
    pub resources: Vec<ResourceType>,
    #[serde(default)]
    pub extras: Vec<ExtraType>,
    #[serde(default)]
    pub improvements: Vec<ImprovementType>,
    #[serde(default)]
    pub techs: Vec<Advance>,
    pub governments: Vec<String>,
    #[serde(default)]
    pub nations: Vec<String>,
    pub specialists: Vec<String>,
    pub unit_types: Vec<UnitType>,
    #[serde(default)]
    pub traits: Vec<String>,
    /// Worked tiles a city gets without spending a citizen (the center).
    #[serde(default = "default_free_worked_tiles")]
    pub free_worked_tiles: u32,
    #[serde(default = "default_radius_sq")]
    pub init_city_radius_sq: u32,
    #[serde(default = "default_veteran_levels")]
    pub veteran_levels: u8,
    #[serde(default = "default_true")]
    pub allow_alliances: bool,
}

fn position_by_name<T>(items: &[T], name: &str, get: impl Fn(&T) -> &str) -> Option<usize> {
    items.iter().position(|item| get(item) == name)
}

impl Ruleset {
    /// Parse and validate a ruleset from JSON.
    pub fn from_json(json: &str) -> Result<Self, RulesetError> {
        let ruleset: Ruleset = serde_json::from_str(json)?;
        ruleset.validate()?;
        Ok(ruleset)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), RulesetError> {
        if self.terrains.is_empty() {
            return Err(RulesetError::Empty("terrains"));
        }
        if self.governments.is_empty() {
            return Err(RulesetError::Empty("governments"));
        }
        if self.specialists.is_empty() {
            return Err(RulesetError::Empty("specialists"));
        }
        if self.unit_types.is_empty() {
            return Err(RulesetError::Empty("unit types"));
        }

        let mut idents = HashSet::new();
        for terrain in &self.terrains {
            if !idents.insert(terrain.identifier) {
                return Err(RulesetError::Duplicate {
                    kind: "terrain identifier",
                    name: terrain.identifier.to_string(),
                });
            }
        }
        let mut idents = HashSet::new();
        for resource in &self.resources {
            if !idents.insert(resource.identifier) {
                return Err(RulesetError::Duplicate {
                    kind: "resource identifier",
                    name: resource.identifier.to_string(),
                });
            }
        }
        let mut names = HashSet::new();
        for extra in &self.extras {
            if !names.insert(extra.name.as_str()) {
                return Err(RulesetError::Duplicate {
                    kind: "extra",
                    name: extra.name.clone(),
                });
            }
        }
        for tech in &self.techs {
            for req in &tech.reqs {
                if self.tech_by_name(req).is_none() {
                    return Err(RulesetError::UnknownRequirement {
                        tech: tech.name.clone(),
                        req: req.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn terrain_by_name(&self, name: &str) -> Option<TerrainId> {
        position_by_name(&self.terrains, name, |t| &t.name)
    }

    pub fn terrain_by_identifier(&self, identifier: char) -> Option<TerrainId> {
        self.terrains.iter().position(|t| t.identifier == identifier)
    }

    pub fn terrain_class(&self, terrain: TerrainId) -> TerrainClass {
        self.terrains
            .get(terrain)
            .map(|t| t.class)
            .unwrap_or_default()
    }

    pub fn resource_by_name(&self, name: &str) -> Option<ResourceId> {
        position_by_name(&self.resources, name, |r| &r.name)
    }

    pub fn resource_by_identifier(&self, identifier: char) -> Option<ResourceId> {
        self.resources
            .iter()
            .position(|r| r.identifier == identifier)
    }

    pub fn extra_by_name(&self, name: &str) -> Option<ExtraId> {
        position_by_name(&self.extras, name, |e| &e.name)
    }

    pub fn extra_kind(&self, extra: ExtraId) -> Option<ExtraKind> {
        self.extras.get(extra).map(|e| e.kind)
    }

    pub fn improvement_by_name(&self, name: &str) -> Option<ImprovementId> {
        position_by_name(&self.improvements, name, |i| &i.name)
    }

    pub fn tech_by_name(&self, name: &str) -> Option<TechId> {
        position_by_name(&self.techs, name, |t| &t.name)
    }

    /// Resolved prerequisites of a technology.
    pub fn tech_reqs(&self, tech: TechId) -> Vec<TechId> {
        self.techs
            .get(tech)
            .map(|t| {
                t.reqs
                    .iter()
                    .filter_map(|req| self.tech_by_name(req))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn government_by_name(&self, name: &str) -> Option<GovernmentId> {
        position_by_name(&self.governments, name, |g| g)
    }

    pub fn has_nation(&self, name: &str) -> bool {
        self.nations.iter().any(|n| n == name)
    }

    pub fn specialist_by_name(&self, name: &str) -> Option<SpecialistId> {
        position_by_name(&self.specialists, name, |s| s)
    }

    pub fn unit_type_by_name(&self, name: &str) -> Option<UnitTypeId> {
        position_by_name(&self.unit_types, name, |u| &u.name)
    }

    pub fn trait_by_name(&self, name: &str) -> Option<usize> {
        position_by_name(&self.traits, name, |t| t)
    }

    /// The first repeatable (pseudo) improvement, used as a safe production
    /// fallback.
    pub fn fallback_improvement(&self) -> Option<ImprovementId> {
        self.improvements.iter().position(|i| i.is_repeatable())
    }

    /// The classic ruleset, used by default and throughout the tests.
    pub fn classic() -> Self {
        use ExtraKind as K;
        use ImprovementGenus as G;

        Self {
            name: "classic".to_string(),
            terrains: vec![
                TerrainType::new("Inaccessible", 'i', TerrainClass::Land),
                TerrainType::new("Lake", '+', TerrainClass::Oceanic),
                TerrainType::new("Ocean", ' ', TerrainClass::Oceanic),
                TerrainType::new("Deep Ocean", ':', TerrainClass::Oceanic),
                TerrainType::new("Glacier", 'a', TerrainClass::Land),
                TerrainType::new("Desert", 'd', TerrainClass::Land),
                TerrainType::new("Forest", 'f', TerrainClass::Land),
                TerrainType::new("Grassland", 'g', TerrainClass::Land),
                TerrainType::new("Hills", 'h', TerrainClass::Land),
                TerrainType::new("Jungle", 'j', TerrainClass::Land),
                TerrainType::new("Mountains", 'm', TerrainClass::Land),
                TerrainType::new("Plains", 'p', TerrainClass::Land),
                TerrainType::new("Swamp", 's', TerrainClass::Land),
                TerrainType::new("Tundra", 't', TerrainClass::Land),
            ],
            resources: vec![
                ResourceType::new("Buffalo", 'b'),
                ResourceType::new("Coal", 'c'),
                ResourceType::new("Fish", 'y'),
                ResourceType::new("Gems", 'e'),
                ResourceType::new("Gold", 'o'),
                ResourceType::new("Iron", 'r'),
                ResourceType::new("Oasis", 'a'),
                ResourceType::new("Oil", 'l'),
                ResourceType::new("Whales", 'w'),
                ResourceType::new("Wheat", 'h'),
            ],
            extras: vec![
                ExtraType::new("Irrigation", K::Irrigation),
                ExtraType::new("Mine", K::Mine),
                ExtraType::new("Pollution", K::Pollution),
                ExtraType::new("Hut", K::Hut),
                ExtraType::new("Farmland", K::Irrigation),
                ExtraType::new("Fallout", K::Fallout),
                ExtraType::new("Fortress", K::Base),
                ExtraType::new("Airbase", K::Base),
                ExtraType::new("Buoy", K::Base),
                ExtraType::new("Ruins", K::Other),
                ExtraType::new("Road", K::Road),
                ExtraType::new("Railroad", K::Road),
                ExtraType::new("River", K::River),
            ],
            improvements: vec![
                ImprovementType::new("Palace", G::SmallWonder),
                ImprovementType::new("Barracks", G::Building),
                ImprovementType::new("Granary", G::Building),
                ImprovementType::new("Temple", G::Building),
                ImprovementType::new("City Walls", G::Building),
                ImprovementType::new("Library", G::Building),
                ImprovementType::new("Marketplace", G::Building),
                ImprovementType::new("Aqueduct", G::Building),
                ImprovementType::new("Harbor", G::Building),
                ImprovementType::new("Colosseum", G::Building),
                ImprovementType::new("Pyramids", G::GreatWonder),
                ImprovementType::new("Coinage", G::Special),
            ],
            techs: vec![
                Advance::new("Alphabet"),
                Advance::new("Bronze Working"),
                Advance::new("Ceremonial Burial"),
                Advance::new("Masonry"),
                Advance::new("Pottery"),
                Advance::new("Horseback Riding"),
                Advance::new("Code of Laws").with_reqs(&["Alphabet"]),
                Advance::new("Writing").with_reqs(&["Alphabet"]),
                Advance::new("Currency").with_reqs(&["Bronze Working"]),
                Advance::new("Monarchy").with_reqs(&["Ceremonial Burial", "Code of Laws"]),
                Advance::new("Mathematics").with_reqs(&["Alphabet", "Masonry"]),
                Advance::new("Literacy").with_reqs(&["Writing", "Code of Laws"]),
                Advance::new("Map Making").with_reqs(&["Alphabet"]),
                Advance::new("The Republic").with_reqs(&["Code of Laws", "Literacy"]),
            ],
            governments: vec![
                "Anarchy".to_string(),
                "Tribal".to_string(),
                "Despotism".to_string(),
                "Monarchy".to_string(),
                "Communism".to_string(),
                "Republic".to_string(),
                "Democracy".to_string(),
            ],
            nations: vec![
                "Romans".to_string(),
                "Greeks".to_string(),
                "Babylonians".to_string(),
                "Egyptians".to_string(),
                "Carthaginians".to_string(),
                "Barbarian".to_string(),
            ],
            specialists: vec![
                "elvis".to_string(),
                "scientist".to_string(),
                "taxman".to_string(),
            ],
            unit_types: vec![
                UnitType::new("Settlers", UnitDomain::Land, 1, 20).non_military(),
                UnitType::new("Workers", UnitDomain::Land, 1, 10).non_military(),
                UnitType::new("Warriors", UnitDomain::Land, 1, 10),
                UnitType::new("Phalanx", UnitDomain::Land, 1, 10),
                UnitType::new("Archers", UnitDomain::Land, 1, 10),
                UnitType::new("Horsemen", UnitDomain::Land, 2, 10),
                UnitType::new("Explorer", UnitDomain::Land, 3, 10).non_military(),
                UnitType::new("Trireme", UnitDomain::Sea, 3, 10).with_capacity(2),
                UnitType::new("Caravel", UnitDomain::Sea, 3, 10).with_capacity(3),
                UnitType::new("Fighter", UnitDomain::Air, 10, 20).with_fuel(1),
            ],
            traits: vec![
                "Expansionist".to_string(),
                "Trader".to_string(),
                "Aggressive".to_string(),
                "Builder".to_string(),
            ],
            free_worked_tiles: 1,
            init_city_radius_sq: 5,
            veteran_levels: 4,
            allow_alliances: true,
        }
    }
}

impl Default for Ruleset {
    fn default() -> Self {
        Self::classic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classic_is_valid() {
        let ruleset = Ruleset::classic();
        assert!(ruleset.validate().is_ok());
    }

    #[test]
    fn test_lookup_by_name_and_identifier() {
        let ruleset = Ruleset::classic();
        let grass = ruleset.terrain_by_name("Grassland").unwrap();
        assert_eq!(ruleset.terrain_by_identifier('g'), Some(grass));
        assert_eq!(ruleset.terrain_class(grass), TerrainClass::Land);
        assert_eq!(ruleset.terrain_by_identifier('Z'), None);
        assert!(ruleset.extra_by_name("Railroad").is_some());
        assert!(ruleset.unit_type_by_name("Trireme").is_some());
    }

    #[test]
    fn test_tech_reqs_resolve() {
        let ruleset = Ruleset::classic();
        let monarchy = ruleset.tech_by_name("Monarchy").unwrap();
        let reqs = ruleset.tech_reqs(monarchy);
        assert_eq!(reqs.len(), 2);
        assert!(reqs.contains(&ruleset.tech_by_name("Code of Laws").unwrap()));
    }

    #[test]
    fn test_json_roundtrip_and_validation() {
        let ruleset = Ruleset::classic();
        let json = serde_json::to_string(&ruleset).unwrap();
        let restored = Ruleset::from_json(&json).unwrap();
        assert_eq!(restored, ruleset);
    }

    #[test]
    fn test_duplicate_terrain_identifier_rejected() {
        let mut ruleset = Ruleset::classic();
        ruleset.terrains.push(TerrainType::new("Marsh", 'g', TerrainClass::Land));
        assert!(matches!(
            ruleset.validate(),
            Err(RulesetError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_unknown_requirement_rejected() {
        let mut ruleset = Ruleset::classic();
        ruleset
            .techs
            .push(Advance::new("Flight").with_reqs(&["Combustion"]));
        assert!(matches!(
            ruleset.validate(),
            Err(RulesetError::UnknownRequirement { .. })
        ));
    }

    #[test]
    fn test_fallback_improvement_is_coinage() {
        let ruleset = Ruleset::classic();
        let coinage = ruleset.fallback_improvement().unwrap();
        assert_eq!(ruleset.improvements[coinage].name, "Coinage");
    }
}
