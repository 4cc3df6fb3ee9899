//! Root game state containing all game data.

use crate::bitset::{BitVector, PlayerSet};
use crate::city::City;
use crate::events::EventCache;
use crate::map::Map;
use crate::mapimg::MapImageDef;
use crate::player::{DiplStateType, Player, SpaceshipState};
use crate::random::RandomState;
use crate::ruleset::Ruleset;
use crate::scenario::Scenario;
use crate::settings::SettingsTable;
use crate::technology::{Research, ResearchKey};
use crate::types::{
    CityId, GovernmentId, PlayerId, TileIndex, UnitId, IDENTITY_NUMBER_ZERO,
};
use crate::unit::Unit;
use std::collections::{BTreeMap, BTreeSet};

/// Global game information.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameInfo {
    /// Current turn number.
    pub turn: i32,
    /// Calendar year. Negative years are BC.
    pub year: i32,
    /// Turn phase within the current turn.
    pub phase: i32,
    /// Accumulated global warming.
    pub globalwarming: i32,
    pub heating: i32,
    /// Accumulated nuclear winter.
    pub nuclearwinter: i32,
    pub cooling: i32,
    /// Technologies known by at least one player.
    pub global_advances: BitVector,
    /// Identifier of the server that created the game.
    pub server_id: String,
    /// How many times each government has been adopted.
    pub government_changes: BTreeMap<GovernmentId, u32>,
}

impl GameInfo {
    pub fn new(num_techs: usize) -> Self {
        Self {
            turn: 1,
            year: -4000,
            phase: 0,
            globalwarming: 0,
            heating: 0,
            nuclearwinter: 0,
            cooling: 0,
            global_advances: BitVector::new(num_techs),
            server_id: String::new(),
            government_changes: BTreeMap::new(),
        }
    }
}

/// Hands out city and unit identity numbers.
///
/// Numbers are never reused within a session. Loaded entities must reserve
/// their number before any new one is allocated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdentityAllocator {
    used: BTreeSet<u32>,
    next: u32,
}

impl IdentityAllocator {
    pub fn new() -> Self {
        Self {
            used: BTreeSet::new(),
            next: IDENTITY_NUMBER_ZERO + 1,
        }
    }

    /// Mark an existing number as taken. Returns false if it was already
    /// taken or is the reserved "none" value.
    pub fn reserve(&mut self, id: u32) -> bool {
        if id == IDENTITY_NUMBER_ZERO {
            return false;
        }
        self.used.insert(id)
    }

    pub fn is_reserved(&self, id: u32) -> bool {
        self.used.contains(&id)
    }

    /// Allocate the next free number.
    pub fn allocate(&mut self) -> u32 {
        loop {
            let candidate = self.next.max(IDENTITY_NUMBER_ZERO + 1);
            self.next = candidate.wrapping_add(1);
            if self.used.insert(candidate) {
                return candidate;
            }
        }
    }

    /// Number of reserved identities.
    pub fn count(&self) -> usize {
        self.used.len()
    }
}

/// The complete state of a game at any point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    pub info: GameInfo,
    pub settings: SettingsTable,
    pub map: Map,
    /// Players by slot.
    pub players: BTreeMap<PlayerId, Player>,
    /// All cities, by identity number.
    pub cities: BTreeMap<CityId, City>,
    /// All units, by identity number.
    pub units: BTreeMap<UnitId, Unit>,
    /// Research records, one per player or one per team.
    pub researches: BTreeMap<ResearchKey, Research>,
    pub event_cache: EventCache,
    pub random: RandomState,
    pub scenario: Scenario,
    /// Opaque script engine state.
    pub script_state: String,
    pub map_images: Vec<MapImageDef>,
    pub identity: IdentityAllocator,
}

/// Errors from registering entities in the game state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameError {
    DuplicateId(u32),
    UnknownPlayer(PlayerId),
    InvalidTile(TileIndex),
}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameError::DuplicateId(id) => write!(f, "Identity number {} is already in use", id),
            GameError::UnknownPlayer(slot) => write!(f, "No player in slot {}", slot),
            GameError::InvalidTile(tile) => write!(f, "Tile {} is not on the map", tile),
        }
    }
}

impl std::error::Error for GameError {}

impl GameState {
    /// An empty game for a ruleset.
    pub fn new(ruleset: &Ruleset) -> Self {
        Self {
            info: GameInfo::new(ruleset.techs.len()),
            settings: SettingsTable::server_defaults(),
            map: Map::default(),
            players: BTreeMap::new(),
            cities: BTreeMap::new(),
            units: BTreeMap::new(),
            researches: BTreeMap::new(),
            event_cache: EventCache::default(),
            random: RandomState::default(),
            scenario: Scenario::default(),
            script_state: String::new(),
            map_images: Vec::new(),
            identity: IdentityAllocator::new(),
        }
    }

    /// Whether teams share one research record.
    pub fn pooled_research(&self) -> bool {
        self.settings
            .get_bool("team_pooled_research")
            .unwrap_or(true)
    }

    /// Whether cities track the nationality of their citizens.
    pub fn citizen_nationality(&self) -> bool {
        self.settings
            .get_bool("citizen_nationality")
            .unwrap_or(false)
    }

    /// Slots that hold a player.
    pub fn used_slots(&self) -> PlayerSet {
        self.players.keys().copied().collect()
    }

    /// Add a player, creating its research record if needed.
    pub fn add_player(&mut self, player: Player, num_techs: usize) {
        let key = self.research_key_for(&player);
        self.researches
            .entry(key)
            .or_insert_with(|| Research::new(key, num_techs));
        self.players.insert(player.slot, player);
    }

    /// Register a city: reserve its number, link it to its owner and mark
    /// its worked tiles.
    pub fn add_city(&mut self, city: City) -> Result<(), GameError> {
        if city.tile >= self.map.tile_count() {
            return Err(GameError::InvalidTile(city.tile));
        }
        let owner = self
            .players
            .get_mut(&city.owner)
            .ok_or(GameError::UnknownPlayer(city.owner))?;
        if !self.identity.reserve(city.id) {
            return Err(GameError::DuplicateId(city.id));
        }
        owner.cities.push(city.id);
        for tile in &city.worked {
            if let Some(t) = self.map.tile_mut(*tile) {
                t.worked_by = Some(city.id);
            }
        }
        self.cities.insert(city.id, city);
        Ok(())
    }

    /// Register a unit: reserve its number and link it to its owner.
    pub fn add_unit(&mut self, unit: Unit) -> Result<(), GameError> {
        if unit.tile >= self.map.tile_count() {
            return Err(GameError::InvalidTile(unit.tile));
        }
        let owner = self
            .players
            .get_mut(&unit.owner)
            .ok_or(GameError::UnknownPlayer(unit.owner))?;
        if !self.identity.reserve(unit.id) {
            return Err(GameError::DuplicateId(unit.id));
        }
        owner.units.push(unit.id);
        self.units.insert(unit.id, unit);
        Ok(())
    }

    /// Remove a unit and everything it carries.
    pub fn remove_unit(&mut self, id: UnitId) {
        let mut queue = vec![id];
        while let Some(id) = queue.pop() {
            let Some(unit) = self.units.remove(&id) else {
                continue;
            };
            if let Some(owner) = self.players.get_mut(&unit.owner) {
                owner.units.retain(|u| *u != id);
            }
            queue.extend(
                self.units
                    .values()
                    .filter(|u| u.transported_by == Some(id))
                    .map(|u| u.id),
            );
        }
    }

    /// Research record a player contributes to.
    pub fn research_key_of(&self, slot: PlayerId) -> Option<ResearchKey> {
        self.players.get(&slot).map(|p| self.research_key_for(p))
    }

    fn research_key_for(&self, player: &Player) -> ResearchKey {
        if self.pooled_research() {
            ResearchKey::Team(player.team)
        } else {
            ResearchKey::Player(player.slot)
        }
    }

    pub fn research_of(&self, slot: PlayerId) -> Option<&Research> {
        self.research_key_of(slot)
            .and_then(|key| self.researches.get(&key))
    }

    /// Whether units of the two players may share a tile.
    pub fn players_allied(&self, a: PlayerId, b: PlayerId) -> bool {
        if a == b {
            return true;
        }
        self.players
            .get(&a)
            .is_some_and(|p| p.diplstate(b).is_allied())
    }

    /// Whether an alliance between `a` and `b` is legal: alliances must be
    /// allowed, and neither side may be allied with someone the other is at
    /// war with.
    pub fn is_valid_alliance(&self, ruleset: &Ruleset, a: PlayerId, b: PlayerId) -> bool {
        if !ruleset.allow_alliances {
            return false;
        }
        let (Some(pa), Some(pb)) = (self.players.get(&a), self.players.get(&b)) else {
            return false;
        };
        if pa.team == pb.team {
            return true;
        }
        for third in self.players.keys().copied() {
            if third == a || third == b {
                continue;
            }
            let a_allied = pa.diplstate(third) == DiplStateType::Alliance;
            let b_allied = pb.diplstate(third) == DiplStateType::Alliance;
            if (a_allied && pb.diplstate(third) == DiplStateType::War)
                || (b_allied && pa.diplstate(third) == DiplStateType::War)
            {
                return false;
            }
        }
        true
    }

    /// Units standing on a tile, in identity order.
    pub fn units_on_tile(&self, tile: TileIndex) -> Vec<UnitId> {
        self.units
            .values()
            .filter(|u| u.tile == tile)
            .map(|u| u.id)
            .collect()
    }

    /// City centred on a tile.
    pub fn city_on_tile(&self, tile: TileIndex) -> Option<CityId> {
        self.cities.values().find(|c| c.tile == tile).map(|c| c.id)
    }

    /// Refresh the set of technologies known anywhere.
    pub fn update_global_advances(&mut self) {
        self.info.global_advances.clear_all();
        for research in self.researches.values() {
            for (tech, _) in research
                .inventions
                .iter()
                .enumerate()
                .filter(|(t, _)| research.is_known(*t))
            {
                self.info.global_advances.set(tech);
            }
        }
    }

    /// Recompute every player's score from live state.
    pub fn recompute_scores(&mut self, ruleset: &Ruleset) {
        let slots: Vec<PlayerId> = self.players.keys().copied().collect();
        for slot in slots {
            let cities: Vec<&City> = self.cities.values().filter(|c| c.owner == slot).collect();
            let citizens = cities.iter().map(|c| c.size).sum();
            let wonders = cities
                .iter()
                .flat_map(|c| c.improvements.iter())
                .filter(|i| ruleset.improvements.get(**i).is_some_and(|t| t.is_wonder()))
                .count() as u32;
            let city_count = cities.len() as u32;
            let units = self.units.values().filter(|u| u.owner == slot).count() as u32;
            let techs = self
                .research_of(slot)
                .map(|r| r.known_count() as u32)
                .unwrap_or(0);

            if let Some(player) = self.players.get_mut(&slot) {
                let spaceship = if player.spaceship.state == SpaceshipState::Arrived {
                    100
                } else {
                    0
                };
                let score = &mut player.score;
                score.citizens = citizens;
                score.techs = techs;
                score.wonders = wonders;
                score.cities = city_count;
                score.units = units;
                score.spaceship = spaceship;
                score.total = citizens + techs * 2 + wonders * 5 + spaceship;
            }
        }
    }
}

/// The live game: ruleset plus the single mutable game state.
///
/// Loading and saving take this context explicitly instead of reaching for
/// process-wide globals.
#[derive(Clone, Debug)]
pub struct GameContext {
    pub ruleset: Ruleset,
    pub state: GameState,
}

impl GameContext {
    pub fn new(ruleset: Ruleset) -> Self {
        let state = GameState::new(&ruleset);
        Self { ruleset, state }
    }

    /// Throw away the current game and start from an empty one.
    pub fn reset(&mut self) {
        self.state = GameState::new(&self.ruleset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::DiplState;

    fn test_state() -> (Ruleset, GameState) {
        let ruleset = Ruleset::classic();
        let mut state = GameState::new(&ruleset);
        state.map = Map::new(4, 4, 7, ruleset.extras.len());
        for slot in 0..3 {
            state.add_player(Player::new(slot, &format!("P{}", slot), 2), ruleset.techs.len());
        }
        (ruleset, state)
    }

    fn set_dipl(state: &mut GameState, a: PlayerId, b: PlayerId, ds: DiplStateType) {
        state
            .players
            .get_mut(&a)
            .unwrap()
            .diplstates
            .insert(b, DiplState::new(ds));
        state
            .players
            .get_mut(&b)
            .unwrap()
            .diplstates
            .insert(a, DiplState::new(ds));
    }

    #[test]
    fn test_identity_allocator_skips_reserved() {
        let mut ids = IdentityAllocator::new();
        assert!(ids.reserve(1));
        assert!(ids.reserve(2));
        assert!(!ids.reserve(2));
        assert!(!ids.reserve(IDENTITY_NUMBER_ZERO));
        assert_eq!(ids.allocate(), 3);
        assert_eq!(ids.allocate(), 4);
        assert_eq!(ids.count(), 4);
    }

    #[test]
    fn test_add_city_marks_worked_tiles() {
        let (_, mut state) = test_state();
        let mut city = City::new(10, 0, "Roma", 5, 3, 5);
        city.worked.insert(6);
        state.add_city(city).unwrap();
        assert_eq!(state.map.tiles[5].worked_by, Some(10));
        assert_eq!(state.map.tiles[6].worked_by, Some(10));
        assert_eq!(state.players[&0].cities, vec![10]);
        assert_eq!(state.city_on_tile(5), Some(10));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let (_, mut state) = test_state();
        state.add_unit(Unit::new(3, 0, 2, 0, 10, 1)).unwrap();
        assert_eq!(
            state.add_unit(Unit::new(3, 1, 2, 1, 10, 1)),
            Err(GameError::DuplicateId(3))
        );
        assert_eq!(
            state.add_unit(Unit::new(4, 9, 2, 1, 10, 1)),
            Err(GameError::UnknownPlayer(9))
        );
    }

    #[test]
    fn test_remove_unit_removes_cargo() {
        let (_, mut state) = test_state();
        state.add_unit(Unit::new(1, 0, 7, 0, 10, 3)).unwrap();
        let mut cargo = Unit::new(2, 0, 2, 0, 10, 1);
        cargo.transported_by = Some(1);
        state.add_unit(cargo).unwrap();
        state.remove_unit(1);
        assert!(state.units.is_empty());
        assert!(state.players[&0].units.is_empty());
    }

    #[test]
    fn test_remove_unit_stops_on_transport_cycle() {
        let (_, mut state) = test_state();
        let mut a = Unit::new(1, 0, 7, 0, 10, 3);
        a.transported_by = Some(2);
        let mut b = Unit::new(2, 0, 7, 0, 10, 3);
        b.transported_by = Some(1);
        state.add_unit(a).unwrap();
        state.add_unit(b).unwrap();
        state.remove_unit(1);
        assert!(state.units.is_empty());
    }

    #[test]
    fn test_pooled_research_keys() {
        let (ruleset, mut state) = test_state();
        assert_eq!(state.research_key_of(1), Some(ResearchKey::Team(1)));

        state
            .settings
            .set(
                "team_pooled_research",
                crate::settings::SettingValue::Bool(false),
            )
            .unwrap();
        state.add_player(Player::new(5, "P5", 2), ruleset.techs.len());
        assert_eq!(state.research_key_of(5), Some(ResearchKey::Player(5)));
    }

    #[test]
    fn test_alliance_validity() {
        let (ruleset, mut state) = test_state();
        set_dipl(&mut state, 0, 1, DiplStateType::Alliance);
        assert!(state.players_allied(0, 1));
        assert!(state.is_valid_alliance(&ruleset, 0, 1));

        // 1 is allied with 0, who is at war with 2: 1 and 2 cannot ally.
        set_dipl(&mut state, 0, 2, DiplStateType::War);
        set_dipl(&mut state, 1, 2, DiplStateType::Alliance);
        assert!(!state.is_valid_alliance(&ruleset, 1, 2));
    }

    #[test]
    fn test_recompute_scores() {
        let (ruleset, mut state) = test_state();
        let mut city = City::new(10, 0, "Roma", 5, 3, 5);
        city.size = 4;
        city.improvements
            .insert(ruleset.improvement_by_name("Pyramids").unwrap());
        state.add_city(city).unwrap();
        state.recompute_scores(&ruleset);
        let score = state.players[&0].score;
        assert_eq!(score.citizens, 4);
        assert_eq!(score.wonders, 1);
        assert_eq!(score.total, 9);
    }

    #[test]
    fn test_context_reset() {
        let mut ctx = GameContext::new(Ruleset::classic());
        ctx.state.info.turn = 50;
        ctx.reset();
        assert_eq!(ctx.state.info.turn, 1);
        assert!(ctx.state.players.is_empty());
    }
}
