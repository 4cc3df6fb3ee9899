//! Post-load repair pass.
//!
//! Fixes corruption that only shows once the whole object graph exists:
//! units standing where they cannot, hostile units sharing a tile, research
//! aimed at impossible targets and stale production choices. Running it on
//! a healthy state changes nothing.

use crate::error::Diagnostics;
use civstate_core::city::ProductionTarget;
use civstate_core::game_state::GameState;
use civstate_core::ruleset::Ruleset;
use civstate_core::technology::Research;
use civstate_core::types::{ImprovementId, PlayerId, TileIndex, UnitDomain, UnitId};
use civstate_core::unit::Unit;
use std::collections::{BTreeMap, BTreeSet};

/// Run every repair. Returns the number of problems fixed.
pub fn sanity_check(state: &mut GameState, ruleset: &Ruleset, diag: &mut Diagnostics) -> usize {
    let before = diag.len();
    bounce_stranded_units(state, ruleset, diag);
    separate_hostile_stacks(state, ruleset, diag);
    check_research(state, ruleset, diag);
    check_production(state, ruleset, diag);
    state.recompute_scores(ruleset);
    let fixed = diag.len() - before;
    tracing::debug!(fixed, "sanity pass finished");
    fixed
}

// ============================================================================
// Unit placement
// ============================================================================

fn can_exist_at(state: &GameState, ruleset: &Ruleset, unit: &Unit, tile: TileIndex) -> bool {
    let (Some(t), Some(kind)) = (state.map.tile(tile), ruleset.unit_types.get(unit.unit_type))
    else {
        return false;
    };
    if kind.domain.is_native_to(ruleset.terrain_class(t.terrain)) {
        return true;
    }
    // Ships may lie in a friendly harbour.
    kind.domain == UnitDomain::Sea
        && state
            .city_on_tile(tile)
            .and_then(|id| state.cities.get(&id))
            .is_some_and(|city| state.players_allied(unit.owner, city.owner))
}

fn free_of_enemies(state: &GameState, owner: PlayerId, tile: TileIndex) -> bool {
    let units_ok = state
        .units
        .values()
        .filter(|u| u.tile == tile)
        .all(|u| state.players_allied(owner, u.owner));
    let city_ok = state
        .city_on_tile(tile)
        .and_then(|id| state.cities.get(&id))
        .map_or(true, |city| state.players_allied(owner, city.owner));
    units_ok && city_ok
}

fn move_with_cargo(state: &mut GameState, id: UnitId, tile: TileIndex) {
    let mut moved = BTreeSet::new();
    let mut queue = vec![id];
    while let Some(id) = queue.pop() {
        if !moved.insert(id) {
            continue;
        }
        queue.extend(
            state
                .units
                .values()
                .filter(|u| u.transported_by == Some(id))
                .map(|u| u.id),
        );
        if let Some(unit) = state.units.get_mut(&id) {
            unit.tile = tile;
            unit.set_idle();
        }
    }
}

/// Move a unit and its cargo to the nearest tile it may occupy. Disbands it
/// only if no such tile exists anywhere.
fn bounce(state: &mut GameState, ruleset: &Ruleset, diag: &mut Diagnostics, id: UnitId) {
    let Some(unit) = state.units.get(&id).cloned() else {
        return;
    };
    let destination = state.map.find_nearest(unit.tile, |t| {
        can_exist_at(state, ruleset, &unit, t.index) && free_of_enemies(state, unit.owner, t.index)
    });
    match destination {
        Some(tile) => {
            let to = state.map.coord_of(tile);
            diag.warn(format!("Unit {} bounced to {}", id, to));
            if let Some(u) = state.units.get_mut(&id) {
                u.transported_by = None;
            }
            move_with_cargo(state, id, tile);
        }
        None => {
            diag.warn(format!("Unit {} has nowhere to go, disbanded", id));
            state.remove_unit(id);
        }
    }
}

fn bounce_stranded_units(state: &mut GameState, ruleset: &Ruleset, diag: &mut Diagnostics) {
    let stranded: Vec<UnitId> = state
        .units
        .values()
        .filter(|u| !u.is_transported() && !can_exist_at(state, ruleset, u, u.tile))
        .map(|u| u.id)
        .collect();
    for id in stranded {
        let Some(unit) = state.units.get(&id) else {
            continue;
        };
        let at = state.map.coord_of(unit.tile);
        diag.warn(format!("Unit {} cannot stand at {}", id, at));
        bounce(state, ruleset, diag, id);
    }
}

/// The player whose units leave a contested tile: the one with fewer units
/// there, or the higher slot on a tie.
fn weaker_side(counts: &BTreeMap<PlayerId, usize>, a: PlayerId, b: PlayerId) -> PlayerId {
    let (ca, cb) = (counts[&a], counts[&b]);
    if ca < cb || (ca == cb && a > b) {
        a
    } else {
        b
    }
}

fn separate_hostile_stacks(state: &mut GameState, ruleset: &Ruleset, diag: &mut Diagnostics) {
    let tiles: BTreeSet<TileIndex> = state.units.values().map(|u| u.tile).collect();
    for tile in tiles {
        loop {
            let mut counts: BTreeMap<PlayerId, usize> = BTreeMap::new();
            for unit in state.units.values().filter(|u| u.tile == tile) {
                *counts.entry(unit.owner).or_insert(0) += 1;
            }
            let owners: Vec<PlayerId> = counts.keys().copied().collect();
            let conflict = owners.iter().enumerate().find_map(|(i, a)| {
                owners[i + 1..]
                    .iter()
                    .find(|b| !state.players_allied(*a, **b))
                    .map(|b| (*a, *b))
            });
            let Some((a, b)) = conflict else {
                break;
            };
            let loser = weaker_side(&counts, a, b);
            diag.warn(format!(
                "Units of players {} and {} share tile {}, moving player {}",
                a, b, tile, loser
            ));

            // Units carried by the loser's own units move with their carrier.
            let leaving: Vec<UnitId> = state
                .units
                .values()
                .filter(|u| u.tile == tile && u.owner == loser)
                .filter(|u| {
                    u.transported_by
                        .and_then(|c| state.units.get(&c))
                        .map_or(true, |carrier| carrier.owner != loser)
                })
                .map(|u| u.id)
                .collect();
            if leaving.is_empty() {
                break;
            }
            for id in leaving {
                bounce(state, ruleset, diag, id);
            }
        }
    }
}

// ============================================================================
// Research and production
// ============================================================================

fn check_research(state: &mut GameState, ruleset: &Ruleset, diag: &mut Diagnostics) {
    let num_techs = ruleset.techs.len();
    for research in state.researches.values_mut() {
        let key = research.key;
        let invalid = |tech: usize, research: &Research| tech >= num_techs || research.is_known(tech);
        if let Some(tech) = research.researching {
            if invalid(tech, research) {
                diag.warn(format!("Research target of {} reset", key));
                research.researching = None;
            }
        }
        if let Some(tech) = research.goal {
            if invalid(tech, research) {
                diag.warn(format!("Research goal of {} reset", key));
                research.goal = None;
            }
        }
    }
}

fn can_build(ruleset: &Ruleset, built: &BTreeSet<ImprovementId>, target: ProductionTarget) -> bool {
    match target {
        ProductionTarget::Improvement(id) => ruleset
            .improvements
            .get(id)
            .is_some_and(|imp| imp.is_repeatable() || !built.contains(&id)),
        ProductionTarget::Unit(id) => id < ruleset.unit_types.len(),
    }
}

fn check_production(state: &mut GameState, ruleset: &Ruleset, diag: &mut Diagnostics) {
    let fallback = ruleset
        .fallback_improvement()
        .map(ProductionTarget::Improvement)
        .unwrap_or(ProductionTarget::Unit(0));
    for city in state.cities.values_mut() {
        let built = &city.improvements;
        if !can_build(ruleset, built, city.production) {
            diag.warn(format!(
                "City {} cannot build its current production, switched",
                city.id
            ));
            city.production = fallback;
        }
        let before = city.worklist.len();
        city.worklist.retain(|t| can_build(ruleset, built, *t));
        if city.worklist.len() != before {
            diag.warn(format!(
                "Worklist of city {} lost {} entries",
                city.id,
                before - city.worklist.len()
            ));
        }
    }
}
