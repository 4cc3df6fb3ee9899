//! Player state: government, economy, diplomacy, spaceship and vision.

use crate::bitset::BitVector;
use crate::types::{
    CityId, GovernmentId, PlayerId, ResourceId, TeamId, TerrainId, TileIndex, UnitId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Diplomacy
// ============================================================================

/// Diplomatic relationship between two players.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiplStateType {
    Armistice,
    #[default]
    War,
    Ceasefire,
    Peace,
    Alliance,
    NoContact,
    Team,
}

impl DiplStateType {
    pub const ALL: [DiplStateType; 7] = [
        DiplStateType::Armistice,
        DiplStateType::War,
        DiplStateType::Ceasefire,
        DiplStateType::Peace,
        DiplStateType::Alliance,
        DiplStateType::NoContact,
        DiplStateType::Team,
    ];

    /// Name used in savefiles.
    pub const fn name(&self) -> &'static str {
        match self {
            DiplStateType::Armistice => "Armistice",
            DiplStateType::War => "War",
            DiplStateType::Ceasefire => "Ceasefire",
            DiplStateType::Peace => "Peace",
            DiplStateType::Alliance => "Alliance",
            DiplStateType::NoContact => "Never met",
            DiplStateType::Team => "Team",
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// How close the relationship is; used to track the historical maximum.
    pub const fn closeness(&self) -> u8 {
        match self {
            DiplStateType::NoContact => 0,
            DiplStateType::War => 1,
            DiplStateType::Ceasefire => 2,
            DiplStateType::Armistice => 3,
            DiplStateType::Peace => 4,
            DiplStateType::Alliance => 5,
            DiplStateType::Team => 6,
        }
    }

    /// The state permits units of both players to share a tile.
    pub const fn is_allied(&self) -> bool {
        matches!(self, DiplStateType::Alliance | DiplStateType::Team)
    }
}

/// One player's view of its relationship with another player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiplState {
    pub state: DiplStateType,
    /// Closest state ever reached.
    pub max_state: DiplStateType,
    pub first_contact_turn: i32,
    /// Turns until an armistice becomes peace or a ceasefire runs out.
    pub turns_left: i32,
    /// Turns of casus belli remaining.
    pub has_reason_to_cancel: i32,
    pub contact_turns_left: i32,
    pub has_embassy: bool,
    pub gives_shared_vision: bool,
}

impl DiplState {
    pub fn new(state: DiplStateType) -> Self {
        Self {
            state,
            max_state: state,
            first_contact_turn: 0,
            turns_left: 0,
            has_reason_to_cancel: 0,
            contact_turns_left: 0,
            has_embassy: false,
            gives_shared_vision: false,
        }
    }
}

impl Default for DiplState {
    fn default() -> Self {
        Self::new(DiplStateType::NoContact)
    }
}

// ============================================================================
// Economy, AI and traits
// ============================================================================

/// Tax, luxury and science rates in percent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRates {
    pub tax: u32,
    pub luxury: u32,
    pub science: u32,
}

impl Default for TaxRates {
    fn default() -> Self {
        Self {
            tax: 30,
            luxury: 0,
            science: 70,
        }
    }
}

impl TaxRates {
    pub fn is_valid(&self) -> bool {
        self.tax + self.luxury + self.science == 100
    }
}

/// AI skill level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiLevel {
    Away,
    Handicapped,
    #[default]
    Novice,
    Easy,
    Normal,
    Hard,
    Cheating,
}

impl AiLevel {
    pub const ALL: [AiLevel; 7] = [
        AiLevel::Away,
        AiLevel::Handicapped,
        AiLevel::Novice,
        AiLevel::Easy,
        AiLevel::Normal,
        AiLevel::Hard,
        AiLevel::Cheating,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            AiLevel::Away => "away",
            AiLevel::Handicapped => "handicapped",
            AiLevel::Novice => "novice",
            AiLevel::Easy => "easy",
            AiLevel::Normal => "normal",
            AiLevel::Hard => "hard",
            AiLevel::Cheating => "cheating",
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.name() == name)
    }
}

/// AI control state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiState {
    /// Whether the AI is driving this player.
    pub control: bool,
    pub skill_level: AiLevel,
    pub barbarian: bool,
}

/// Personality trait value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitValue {
    /// Value the game started with.
    pub value: i32,
    /// Adjustment applied on top of the base value.
    pub modifier: i32,
}

impl TraitValue {
    pub const fn current(&self) -> i32 {
        self.value + self.modifier
    }
}

// ============================================================================
// Spaceship and score
// ============================================================================

/// Spaceship state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpaceshipState {
    #[default]
    None,
    Started,
    Launched,
    Arrived,
}

impl SpaceshipState {
    pub const fn name(&self) -> &'static str {
        match self {
            SpaceshipState::None => "none",
            SpaceshipState::Started => "started",
            SpaceshipState::Launched => "launched",
            SpaceshipState::Arrived => "arrived",
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        [
            SpaceshipState::None,
            SpaceshipState::Started,
            SpaceshipState::Launched,
            SpaceshipState::Arrived,
        ]
        .into_iter()
        .find(|s| s.name() == name)
    }
}

/// Number of structural slots on a spaceship.
pub const NUM_SS_STRUCTURALS: usize = 32;

/// A player's spaceship.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spaceship {
    pub state: SpaceshipState,
    /// Which structural slots are built.
    pub structurals: BitVector,
    pub components: u32,
    pub modules: u32,
    /// Year of launch, once launched.
    pub launch_year: Option<i32>,
}

impl Default for Spaceship {
    fn default() -> Self {
        Self {
            state: SpaceshipState::None,
            structurals: BitVector::new(NUM_SS_STRUCTURALS),
            components: 0,
            modules: 0,
            launch_year: None,
        }
    }
}

impl Spaceship {
    /// Total number of parts built.
    pub fn parts(&self) -> u32 {
        self.structurals.count_ones() as u32 + self.components + self.modules
    }
}

/// Score breakdown. Always recomputed after loading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub citizens: u32,
    pub techs: u32,
    pub wonders: u32,
    pub cities: u32,
    pub units: u32,
    pub spaceship: u32,
    pub total: u32,
}

// ============================================================================
// Vision
// ============================================================================

/// What a player remembers about a tile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMemory {
    pub terrain: TerrainId,
    pub resource: Option<ResourceId>,
    pub extras: BitVector,
    pub owner: Option<PlayerId>,
}

/// Last-seen snapshot of a foreign city.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumbCity {
    pub id: CityId,
    pub tile: TileIndex,
    pub owner: PlayerId,
    pub name: String,
    pub size: u32,
    pub walls: bool,
    pub occupied: bool,
    pub capital: bool,
}

/// A player's remembered map, independent of current fog.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerVision {
    pub tiles: BTreeMap<TileIndex, TileMemory>,
    pub cities: BTreeMap<TileIndex, DumbCity>,
}

// ============================================================================
// Player
// ============================================================================

/// A player in the game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Player slot. Stable identity of the player.
    pub slot: PlayerId,
    /// Leader name.
    pub name: String,
    /// Connected user name.
    pub username: String,
    /// Nation rule name.
    pub nation: Option<String>,
    pub team: TeamId,
    pub government: GovernmentId,
    /// Government being switched to by revolution.
    pub target_government: Option<GovernmentId>,
    /// Turn the revolution finishes.
    pub revolution_finishes: Option<i32>,
    pub is_alive: bool,
    pub gold: i32,
    pub rates: TaxRates,
    pub ai: AiState,
    /// Relationship with every other player slot.
    pub diplstates: BTreeMap<PlayerId, DiplState>,
    /// Trait values keyed by ruleset trait index.
    pub traits: BTreeMap<usize, TraitValue>,
    /// Opaque client data.
    pub attribute_block: Vec<u8>,
    pub spaceship: Spaceship,
    /// Cities owned, in load order.
    pub cities: Vec<CityId>,
    /// Units owned, in load order.
    pub units: Vec<UnitId>,
    pub score: Score,
    pub vision: PlayerVision,
}

impl Player {
    /// Create a new player with default values.
    pub fn new(slot: PlayerId, name: &str, government: GovernmentId) -> Self {
        Self {
            slot,
            name: name.to_string(),
            username: String::new(),
            nation: None,
            team: slot,
            government,
            target_government: None,
            revolution_finishes: None,
            is_alive: true,
            gold: 50,
            rates: TaxRates::default(),
            ai: AiState::default(),
            diplstates: BTreeMap::new(),
            traits: BTreeMap::new(),
            attribute_block: Vec::new(),
            spaceship: Spaceship::default(),
            cities: Vec::new(),
            units: Vec::new(),
            score: Score::default(),
            vision: PlayerVision::default(),
        }
    }

    /// This player's relationship with `other`; absent means never met.
    pub fn diplstate(&self, other: PlayerId) -> DiplStateType {
        self.diplstates
            .get(&other)
            .map(|ds| ds.state)
            .unwrap_or(DiplStateType::NoContact)
    }

    /// Whether this player shares vision with `other`.
    pub fn gives_shared_vision(&self, other: PlayerId) -> bool {
        self.diplstates
            .get(&other)
            .is_some_and(|ds| ds.gives_shared_vision)
    }

    /// Check if a revolution is in progress.
    pub fn in_revolution(&self) -> bool {
        self.revolution_finishes.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diplstate_names_roundtrip() {
        for state in DiplStateType::ALL {
            assert_eq!(DiplStateType::by_name(state.name()), Some(state));
        }
        assert_eq!(DiplStateType::by_name("Neutral"), None);
    }

    #[test]
    fn test_closeness_order() {
        assert!(DiplStateType::Alliance.closeness() > DiplStateType::Peace.closeness());
        assert!(DiplStateType::Peace.closeness() > DiplStateType::War.closeness());
        assert!(DiplStateType::War.closeness() > DiplStateType::NoContact.closeness());
    }

    #[test]
    fn test_unmet_player_is_no_contact() {
        let player = Player::new(0, "Caesar", 0);
        assert_eq!(player.diplstate(3), DiplStateType::NoContact);
        assert!(!player.gives_shared_vision(3));
    }

    #[test]
    fn test_spaceship_parts() {
        let mut ship = Spaceship::default();
        ship.structurals.set(0);
        ship.structurals.set(5);
        ship.components = 2;
        ship.modules = 1;
        assert_eq!(ship.parts(), 5);
    }

    #[test]
    fn test_ai_level_names() {
        for level in AiLevel::ALL {
            assert_eq!(AiLevel::by_name(level.name()), Some(level));
        }
    }

    #[test]
    fn test_default_rates_valid() {
        assert!(TaxRates::default().is_valid());
    }
}
