//! Integration tests for the Civstate game-state graph.
//!
//! These tests verify cross-module behavior:
//! - Building a game and registering players, cities and units
//! - Diplomacy and alliance legality
//! - Research records under pooled and per-player research
//! - Map numbering on randomly generated terrain
//! - Ruleset loading from JSON

use civstate_core::{
    city::City,
    game_state::{GameContext, GameState},
    map::Map,
    player::{DiplState, DiplStateType, Player},
    ruleset::Ruleset,
    settings::SettingValue,
    technology::ResearchKey,
    types::{PlayerId, TerrainClass},
    unit::Unit,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

// =============================================================================
// Test Helpers
// =============================================================================

/// Create a game on a grassland map with the given number of players.
fn create_game(ruleset: &Ruleset, players: u8, xsize: u32, ysize: u32) -> GameState {
    let mut state = GameState::new(ruleset);
    let grass = ruleset.terrain_by_name("Grassland").unwrap();
    state.map = Map::new(xsize, ysize, grass, ruleset.extras.len());
    for slot in 0..players {
        let mut player = Player::new(slot, &format!("Leader {}", slot), 2);
        player.nation = Some(ruleset.nations[slot as usize].clone());
        state.add_player(player, ruleset.techs.len());
    }
    state
}

/// Set a symmetric diplomatic state.
fn set_dipl(state: &mut GameState, a: PlayerId, b: PlayerId, ds: DiplStateType) {
    for (x, y) in [(a, b), (b, a)] {
        state
            .players
            .get_mut(&x)
            .unwrap()
            .diplstates
            .insert(y, DiplState::new(ds));
    }
}

/// Fill a map with random land and ocean.
fn random_map(ruleset: &Ruleset, rng: &mut StdRng, xsize: u32, ysize: u32) -> Map {
    let ocean = ruleset.terrain_by_name("Ocean").unwrap();
    let grass = ruleset.terrain_by_name("Grassland").unwrap();
    let mut map = Map::new(xsize, ysize, ocean, ruleset.extras.len());
    for tile in &mut map.tiles {
        if rng.gen_bool(0.4) {
            tile.terrain = grass;
        }
    }
    map
}

// =============================================================================
// 1. Entity Registration
// =============================================================================

mod entity_registration {
    use super::*;

    #[test]
    fn test_cities_and_units_link_to_owners() {
        let ruleset = Ruleset::classic();
        let mut state = create_game(&ruleset, 2, 6, 6);

        let mut city = City::new(1, 0, "Roma", 7, ruleset.specialists.len(), 5);
        city.worked.insert(8);
        state.add_city(city).unwrap();

        let warriors = ruleset.unit_type_by_name("Warriors").unwrap();
        let mut unit = Unit::new(2, 1, warriors, 20, 10, 1);
        unit.homecity = None;
        state.add_unit(unit).unwrap();

        assert_eq!(state.players[&0].cities, vec![1]);
        assert_eq!(state.players[&1].units, vec![2]);
        assert_eq!(state.map.tiles[8].worked_by, Some(1));
        assert_eq!(state.units_on_tile(20), vec![2]);
    }

    #[test]
    fn test_new_ids_never_collide_with_registered() {
        let ruleset = Ruleset::classic();
        let mut state = create_game(&ruleset, 1, 4, 4);
        for id in [1, 2, 5] {
            state.add_unit(Unit::new(id, 0, 0, 0, 20, 1)).unwrap();
        }
        let fresh: Vec<u32> = (0..3).map(|_| state.identity.allocate()).collect();
        assert_eq!(fresh, vec![3, 4, 6]);
    }
}

// =============================================================================
// 2. Diplomacy
// =============================================================================

mod diplomacy_flow {
    use super::*;

    #[test]
    fn test_transitive_alliance_conflict() {
        let ruleset = Ruleset::classic();
        let mut state = create_game(&ruleset, 3, 4, 4);
        set_dipl(&mut state, 0, 1, DiplStateType::Alliance);
        set_dipl(&mut state, 1, 2, DiplStateType::War);
        set_dipl(&mut state, 0, 2, DiplStateType::Peace);

        assert!(state.is_valid_alliance(&ruleset, 0, 1));
        assert!(!state.is_valid_alliance(&ruleset, 0, 2));
    }

    #[test]
    fn test_alliances_disabled_by_ruleset() {
        let mut ruleset = Ruleset::classic();
        ruleset.allow_alliances = false;
        let mut state = create_game(&ruleset, 2, 4, 4);
        set_dipl(&mut state, 0, 1, DiplStateType::Alliance);
        assert!(!state.is_valid_alliance(&ruleset, 0, 1));
    }
}

// =============================================================================
// 3. Research
// =============================================================================

mod research_flow {
    use super::*;

    #[test]
    fn test_teammates_share_pooled_research() {
        let ruleset = Ruleset::classic();
        let mut state = GameState::new(&ruleset);
        for slot in 0..3 {
            let mut player = Player::new(slot, "x", 2);
            player.team = if slot < 2 { 0 } else { 1 };
            state.add_player(player, ruleset.techs.len());
        }
        assert_eq!(state.researches.len(), 2);
        assert_eq!(state.research_key_of(0), state.research_key_of(1));
        assert_eq!(state.research_key_of(2), Some(ResearchKey::Team(1)));
    }

    #[test]
    fn test_separate_research_without_pooling() {
        let ruleset = Ruleset::classic();
        let mut state = GameState::new(&ruleset);
        state
            .settings
            .set("team_pooled_research", SettingValue::Bool(false))
            .unwrap();
        for slot in 0..2 {
            let mut player = Player::new(slot, "x", 2);
            player.team = 0;
            state.add_player(player, ruleset.techs.len());
        }
        assert_eq!(state.researches.len(), 2);
    }

    #[test]
    fn test_global_advances_follow_known_techs() {
        let ruleset = Ruleset::classic();
        let mut state = create_game(&ruleset, 2, 4, 4);
        let alphabet = ruleset.tech_by_name("Alphabet").unwrap();
        let key = state.research_key_of(1).unwrap();
        state.researches.get_mut(&key).unwrap().set_known(alphabet);
        state.update_global_advances();
        assert!(state.info.global_advances.get(alphabet));
        assert_eq!(state.info.global_advances.count_ones(), 1);
    }
}

// =============================================================================
// 4. Map Numbering
// =============================================================================

mod map_numbering {
    use super::*;

    #[test]
    fn test_random_maps_number_every_tile() {
        let ruleset = Ruleset::classic();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..20 {
            let mut map = random_map(&ruleset, &mut rng, 12, 9);
            map.assign_continents(&ruleset);
            for tile in &map.tiles {
                assert_ne!(tile.continent, 0);
                let land = ruleset.terrain_class(tile.terrain) == TerrainClass::Land;
                assert_eq!(land, tile.continent > 0);
            }
        }
    }

    #[test]
    fn test_neighbours_of_same_class_share_a_number() {
        let ruleset = Ruleset::classic();
        let mut rng = StdRng::seed_from_u64(7);
        let mut map = random_map(&ruleset, &mut rng, 10, 10);
        map.assign_continents(&ruleset);
        for tile in &map.tiles {
            for next in map.adjacent(tile.index) {
                let other = &map.tiles[next];
                if ruleset.terrain_class(other.terrain) == ruleset.terrain_class(tile.terrain) {
                    assert_eq!(other.continent, tile.continent);
                }
            }
        }
    }
}

// =============================================================================
// 5. Ruleset and Context
// =============================================================================

mod ruleset_and_context {
    use super::*;

    #[test]
    fn test_reordered_ruleset_from_json() {
        let mut ruleset = Ruleset::classic();
        ruleset.terrains.reverse();
        let json = serde_json::to_string(&ruleset).unwrap();
        let loaded = Ruleset::from_json(&json).unwrap();
        assert_eq!(loaded.terrain_by_name("Lake"), Some(ruleset.terrains.len() - 2));
    }

    #[test]
    fn test_context_reset_keeps_ruleset() {
        let mut ctx = GameContext::new(Ruleset::classic());
        ctx.state = create_game(&ctx.ruleset, 2, 4, 4);
        ctx.reset();
        assert!(ctx.state.players.is_empty());
        assert_eq!(ctx.ruleset.name, "classic");
    }
}
