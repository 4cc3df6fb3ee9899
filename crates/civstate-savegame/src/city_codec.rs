//! City records: `[player%d.c%d]` sections.
//!
//! A city is read into a detached [`City`], reconciled against the worked
//! tiles the map recorded, and only then registered in the game state.

use crate::capability::has_capability;
use crate::codec::{
    activity_to_char, bools_to_string, char_to_activity, string_to_bools, tile_at,
};
use crate::context::{LoadContext, SaveContext};
use crate::error::LoadError;
use crate::secfile::SectionFileError;
use civstate_core::city::{City, ProductionTarget, WorkerTask, MAX_WORKLIST_LEN};
use civstate_core::ruleset::Ruleset;
use civstate_core::types::{CityId, PlayerId};
use std::collections::BTreeSet;

fn production_by_name(ruleset: &Ruleset, kind: &str, name: &str) -> Option<ProductionTarget> {
    match kind {
        "improvement" => ruleset
            .improvement_by_name(name)
            .map(ProductionTarget::Improvement),
        "unit" => ruleset.unit_type_by_name(name).map(ProductionTarget::Unit),
        _ => None,
    }
}

fn production_name(ruleset: &Ruleset, target: ProductionTarget) -> &str {
    match target {
        ProductionTarget::Improvement(id) => ruleset
            .improvements
            .get(id)
            .map(|i| i.name.as_str())
            .unwrap_or(""),
        ProductionTarget::Unit(id) => ruleset
            .unit_types
            .get(id)
            .map(|u| u.name.as_str())
            .unwrap_or(""),
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load and register every city of one player.
pub(crate) fn load_cities(ctx: &mut LoadContext, slot: PlayerId) -> Result<(), LoadError> {
    let count = ctx
        .file
        .lookup_int_default(0, &format!("player{}.ncities", slot));
    for index in 0..count.max(0) {
        if let Some(city) = read_city(ctx, slot, index) {
            register_city(ctx, city);
        }
    }
    Ok(())
}

/// Read a detached city. Records without a usable identity or location are
/// rejected with a warning.
fn read_city(ctx: &mut LoadContext, slot: PlayerId, index: i64) -> Option<City> {
    let ruleset = ctx.ruleset;
    let base = format!("player{}.c{}", slot, index);
    let file = &ctx.file;
    let diag = &mut ctx.diag;

    let Some(id) = file
        .lookup_int(&format!("{}.id", base))
        .ok()
        .and_then(|id| CityId::try_from(id).ok())
        .filter(|id| *id != 0)
    else {
        diag.warn(format!("City '{}' has no valid identity number, skipped", base));
        return None;
    };
    let (Ok(x), Ok(y)) = (
        file.lookup_int(&format!("{}.x", base)),
        file.lookup_int(&format!("{}.y", base)),
    ) else {
        diag.warn(format!("City {} has no location, skipped", id));
        return None;
    };
    let Some(tile) = tile_at(&ctx.state.map, x, y) else {
        diag.warn(format!("City {} is off the map at ({}, {}), skipped", id, x, y));
        return None;
    };

    let name = file.lookup_str_default("", &format!("{}.name", base));
    let radius_sq = file
        .lookup_int_default(
            i64::from(ruleset.init_city_radius_sq),
            &format!("{}.radius_sq", base),
        )
        .max(0) as u32;
    let mut city = City::new(id, slot, name, tile, ruleset.specialists.len(), radius_sq);
    city.worked.clear();

    let original = file.lookup_int_default(i64::from(slot), &format!("{}.original", base));
    city.original_owner = match PlayerId::try_from(original) {
        Ok(p) if ctx.state.players.contains_key(&p) => p,
        _ => {
            diag.warn(format!("City {} has unknown original owner {}", id, original));
            slot
        }
    };
    city.size = file
        .lookup_int_default(1, &format!("{}.size", base))
        .max(0) as u32;

    for (i, specialist) in ctx.names.specialists.iter().enumerate() {
        let count = file
            .lookup_int_default(0, &format!("{}.specialists{}", base, i))
            .max(0) as u32;
        match specialist {
            Some(sp) => city.specialists[*sp] += count,
            None if count > 0 => {
                diag.warn(format!("City {} lost {} unknown specialists", id, count));
            }
            None => {}
        }
    }

    if has_capability("nationality", &ctx.capabilities) && ctx.state.citizen_nationality() {
        for other in ctx.state.players.keys() {
            let count = file.lookup_int_default(0, &format!("{}.citizen{}", base, other));
            if count > 0 {
                city.nationality.insert(*other, count as u32);
            }
        }
    }

    let improvements = file.lookup_str_default("", &format!("{}.improvements", base));
    match string_to_bools(improvements) {
        Some(bits) => {
            for (i, _) in bits.iter().enumerate().filter(|(_, set)| **set) {
                match ctx.names.improvement(i as i64) {
                    Some(imp) => {
                        city.improvements.insert(imp);
                    }
                    None => diag.warn(format!("City {} lost unknown improvement {}", id, i)),
                }
            }
        }
        None => diag.warn(format!("City {} has an invalid improvement list", id)),
    }

    let kind = file.lookup_str_default("", &format!("{}.currently_building_kind", base));
    let building = file.lookup_str_default("", &format!("{}.currently_building_name", base));
    city.production = match production_by_name(ruleset, kind, building) {
        Some(target) => target,
        None => {
            diag.warn(format!(
                "City {} builds unknown {} '{}'",
                id, kind, building
            ));
            ruleset
                .fallback_improvement()
                .map(ProductionTarget::Improvement)
                .unwrap_or(ProductionTarget::Unit(0))
        }
    };
    city.shield_stock = file.lookup_int_default(0, &format!("{}.shield_stock", base)) as i32;
    city.food_stock = file.lookup_int_default(0, &format!("{}.food_stock", base)) as i32;
    city.pollution = file.lookup_int_default(0, &format!("{}.pollution", base)) as i32;
    city.turn_founded = file.lookup_int_default(0, &format!("{}.turn_founded", base)) as i32;
    city.did_buy = file.lookup_bool_default(false, &format!("{}.did_buy", base));
    city.capital = file.lookup_bool_default(false, &format!("{}.capital", base));

    let length = file.lookup_int_default(0, &format!("{}.wl_length", base));
    for i in 0..length.max(0) {
        let kind = file.lookup_str_default("", &format!("{}.wl_kind{}", base, i));
        let value = file.lookup_str_default("", &format!("{}.wl_value{}", base, i));
        match production_by_name(ruleset, kind, value) {
            Some(target) => {
                if !city.worklist.push(target) {
                    diag.warn(format!(
                        "Worklist of city {} exceeds {} entries, truncated",
                        id, MAX_WORKLIST_LEN
                    ));
                    break;
                }
            }
            None => diag.warn(format!(
                "Worklist of city {} names unknown {} '{}'",
                id, kind, value
            )),
        }
    }

    if file.lookup_int_default(0, &format!("{}.wtask_count", base)) > 0 {
        let tx = file.lookup_int_default(-1, &format!("{}.wtask_x", base));
        let ty = file.lookup_int_default(-1, &format!("{}.wtask_y", base));
        let activity = file
            .lookup_str_default("", &format!("{}.wtask_activity", base))
            .chars()
            .next()
            .and_then(char_to_activity);
        let target_name = file.lookup_str_default("", &format!("{}.wtask_target", base));
        let target = ruleset.extra_by_name(target_name);
        let task_tile = tile_at(&ctx.state.map, tx, ty);
        match (task_tile, activity) {
            (Some(task_tile), Some(activity)) if target_name.is_empty() || target.is_some() => {
                city.worker_task = Some(WorkerTask {
                    tile: task_tile,
                    activity,
                    target,
                    want: file.lookup_int_default(0, &format!("{}.wtask_want", base)) as i32,
                });
            }
            _ => diag.warn(format!("Worker task of city {} is invalid, dropped", id)),
        }
    }

    Some(city)
}

/// Reconcile a city with the worked-tile scratch array, fix its size and
/// register it.
fn register_city(ctx: &mut LoadContext, mut city: City) {
    let id = city.id;
    if ctx.state.identity.is_reserved(id) {
        ctx.diag
            .warn(format!("Identity number {} is already in use, city skipped", id));
        return;
    }

    let in_radius: BTreeSet<usize> = ctx
        .state
        .map
        .tiles_within_radius_sq(city.tile, city.radius_sq)
        .into_iter()
        .collect();
    for (tile, worker) in ctx.worked_tiles.iter_mut().enumerate() {
        if *worker != Some(id) {
            continue;
        }
        if in_radius.contains(&tile) {
            city.worked.insert(tile);
        } else {
            ctx.diag.warn(format!(
                "City {} works tile {} outside its radius, released",
                id, tile
            ));
            *worker = None;
        }
    }

    // The center is always worked by its own city.
    let center = city.tile;
    let previous = ctx.worked_tiles.get(center).copied().flatten();
    if previous != Some(id) {
        if let Some(slot) = ctx.worked_tiles.get_mut(center) {
            *slot = Some(id);
        }
        city.worked.insert(center);
        ctx.diag.warn(format!(
            "City {} did not work its center tile, reassigned",
            id
        ));
        if let Some(other) = previous {
            match ctx.state.cities.get_mut(&other) {
                Some(displaced) => {
                    displaced.worked.remove(&center);
                    if let Some(first) = displaced.specialists.first_mut() {
                        *first += 1;
                    }
                }
                None => *ctx.pending_specialists.entry(other).or_insert(0) += 1,
            }
            ctx.diag.warn(format!(
                "City {} lost tile {} to city {} and gained a specialist",
                other, center, id
            ));
        }
    }
    if let Some(extra) = ctx.pending_specialists.remove(&id) {
        if let Some(first) = city.specialists.first_mut() {
            *first += extra;
        }
    }

    let free = ctx.ruleset.free_worked_tiles;
    if city.implied_size(free) == 0 {
        if let Some(first) = city.specialists.first_mut() {
            *first += 1;
            ctx.diag.warn(format!(
                "City {} would have no citizens, added a specialist",
                id
            ));
        }
    }
    let implied = city.implied_size(free);
    if city.size != implied {
        ctx.diag.warn(format!(
            "City {} has size {} but {} citizens, size corrected",
            id, city.size, implied
        ));
        city.size = implied;
    }

    if !city.nationality.is_empty() && city.nationality_total() != city.size {
        ctx.diag.warn(format!(
            "Citizen nationality of city {} does not add up, reset",
            id
        ));
        city.nationality.clear();
        city.nationality.insert(city.owner, city.size);
    }

    if let Err(err) = ctx.state.add_city(city) {
        ctx.diag.warn(format!("City {} not registered: {}", id, err));
    }
}

/// Report worked tiles that name a city which never loaded.
pub(crate) fn finish_worked_tiles(ctx: &mut LoadContext) {
    let mut dangling = 0;
    for (tile, worker) in ctx.worked_tiles.iter().enumerate() {
        if let Some(id) = worker {
            if !ctx.state.cities.contains_key(id) {
                dangling += 1;
                tracing::debug!(tile, city = id, "tile worked by unknown city");
            }
        }
    }
    if dangling > 0 {
        ctx.diag
            .warn(format!("{} tiles worked by unknown cities were freed", dangling));
    }
    if !ctx.pending_specialists.is_empty() {
        tracing::debug!(
            cities = ctx.pending_specialists.len(),
            "specialists owed to cities that never loaded"
        );
        ctx.pending_specialists.clear();
    }
}

// ============================================================================
// Saving
// ============================================================================

/// Write one city as `player{slot}.c{index}`.
pub(crate) fn save_city(
    ctx: &mut SaveContext,
    slot: PlayerId,
    index: usize,
    city: &City,
) -> Result<(), SectionFileError> {
    let ruleset = ctx.ruleset;
    let state = ctx.state;
    let file = &mut ctx.file;
    let base = format!("player{}.c{}", slot, index);
    let coord = state.map.coord_of(city.tile);

    file.insert_int(&format!("{}.id", base), i64::from(city.id))?;
    file.insert_int(&format!("{}.x", base), i64::from(coord.x))?;
    file.insert_int(&format!("{}.y", base), i64::from(coord.y))?;
    file.insert_int(&format!("{}.original", base), i64::from(city.original_owner))?;
    file.insert_str(&format!("{}.name", base), &city.name)?;
    file.insert_int(&format!("{}.size", base), i64::from(city.size))?;
    for (i, count) in city.specialists.iter().enumerate() {
        file.insert_int(&format!("{}.specialists{}", base, i), i64::from(*count))?;
    }
    if state.citizen_nationality() {
        for (nation, count) in &city.nationality {
            file.insert_int(&format!("{}.citizen{}", base, nation), i64::from(*count))?;
        }
    }
    file.insert_str(
        &format!("{}.improvements", base),
        &bools_to_string((0..ruleset.improvements.len()).map(|i| city.has_improvement(i))),
    )?;
    file.insert_str(
        &format!("{}.currently_building_kind", base),
        city.production.kind_name(),
    )?;
    file.insert_str(
        &format!("{}.currently_building_name", base),
        production_name(ruleset, city.production),
    )?;
    file.insert_int(&format!("{}.shield_stock", base), i64::from(city.shield_stock))?;
    file.insert_int(&format!("{}.food_stock", base), i64::from(city.food_stock))?;
    file.insert_int(&format!("{}.pollution", base), i64::from(city.pollution))?;
    file.insert_int(&format!("{}.turn_founded", base), i64::from(city.turn_founded))?;
    file.insert_bool(&format!("{}.did_buy", base), city.did_buy)?;
    file.insert_bool(&format!("{}.capital", base), city.capital)?;
    file.insert_int(&format!("{}.radius_sq", base), i64::from(city.radius_sq))?;

    file.insert_int(&format!("{}.wl_length", base), city.worklist.len() as i64)?;
    for (i, target) in city.worklist.iter().enumerate() {
        file.insert_str(&format!("{}.wl_kind{}", base, i), target.kind_name())?;
        file.insert_str(
            &format!("{}.wl_value{}", base, i),
            production_name(ruleset, *target),
        )?;
    }

    match &city.worker_task {
        Some(task) => {
            let coord = state.map.coord_of(task.tile);
            file.insert_int(&format!("{}.wtask_count", base), 1)?;
            file.insert_int(&format!("{}.wtask_x", base), i64::from(coord.x))?;
            file.insert_int(&format!("{}.wtask_y", base), i64::from(coord.y))?;
            file.insert_str(
                &format!("{}.wtask_activity", base),
                &activity_to_char(task.activity).to_string(),
            )?;
            file.insert_str(
                &format!("{}.wtask_target", base),
                task.target
                    .and_then(|e| ruleset.extras.get(e))
                    .map(|e| e.name.as_str())
                    .unwrap_or(""),
            )?;
            file.insert_int(&format!("{}.wtask_want", base), i64::from(task.want))?;
        }
        None => file.insert_int(&format!("{}.wtask_count", base), 0)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadOptions;
    use crate::context::NameTables;
    use crate::secfile::SectionFile;
    use civstate_core::map::Map;
    use civstate_core::player::Player;

    fn context<'a>(ruleset: &'a Ruleset, options: &'a LoadOptions) -> LoadContext<'a> {
        let mut ctx = LoadContext::new(SectionFile::new(), ruleset, options);
        ctx.names = NameTables::load(&ctx.file, ruleset, &mut ctx.diag).unwrap();
        ctx.state.map = Map::new(5, 5, 7, ruleset.extras.len());
        ctx.worked_tiles = vec![None; 25];
        for slot in 0..2 {
            ctx.state
                .add_player(Player::new(slot, "P", 2), ruleset.techs.len());
        }
        ctx
    }

    fn city(ctx: &LoadContext, id: CityId, owner: PlayerId, tile: usize, size: u32) -> City {
        let mut city = City::new(id, owner, "Test", tile, ctx.ruleset.specialists.len(), 2);
        city.worked.clear();
        city.size = size;
        city
    }

    #[test]
    fn test_size_follows_worked_tiles() {
        let ruleset = Ruleset::classic();
        let options = LoadOptions::default();
        let mut ctx = context(&ruleset, &options);
        ctx.worked_tiles[12] = Some(7);
        ctx.worked_tiles[13] = Some(7);
        let mut c = city(&ctx, 7, 0, 12, 9);
        c.specialists[0] = 2;
        register_city(&mut ctx, c);

        let loaded = &ctx.state.cities[&7];
        assert_eq!(loaded.size, 3);
        assert!(loaded.is_size_consistent(ruleset.free_worked_tiles));
        assert_eq!(ctx.state.map.tiles[13].worked_by, Some(7));
        assert!(ctx.diag.mentions("size corrected"));
    }

    #[test]
    fn test_center_reassigned_from_loaded_city() {
        let ruleset = Ruleset::classic();
        let options = LoadOptions::default();
        let mut ctx = context(&ruleset, &options);
        // City 1 at tile 11 wrongly works tile 12, the center of city 2.
        ctx.worked_tiles[11] = Some(1);
        ctx.worked_tiles[12] = Some(1);
        let c = city(&ctx, 1, 0, 11, 1);
        register_city(&mut ctx, c);
        assert_eq!(ctx.state.cities[&1].size, 1);

        let c = city(&ctx, 2, 1, 12, 1);
        register_city(&mut ctx, c);

        let first = &ctx.state.cities[&1];
        let second = &ctx.state.cities[&2];
        assert!(!first.worked.contains(&12));
        assert_eq!(first.specialists_total(), 1);
        assert_eq!(first.size, 1);
        assert!(first.is_size_consistent(ruleset.free_worked_tiles));
        assert!(second.worked.contains(&12));
        assert_eq!(ctx.state.map.tiles[12].worked_by, Some(2));
    }

    #[test]
    fn test_center_reassigned_from_pending_city() {
        let ruleset = Ruleset::classic();
        let options = LoadOptions::default();
        let mut ctx = context(&ruleset, &options);
        ctx.worked_tiles[12] = Some(5);
        ctx.worked_tiles[11] = Some(5);
        let c = city(&ctx, 4, 0, 12, 1);
        register_city(&mut ctx, c);
        assert_eq!(ctx.pending_specialists.get(&5), Some(&1));

        // City 5 still claims its own center and was size 2.
        let c = city(&ctx, 5, 1, 11, 2);
        register_city(&mut ctx, c);
        let later = &ctx.state.cities[&5];
        assert_eq!(later.specialists_total(), 1);
        assert_eq!(later.size, 1);
        assert!(ctx.pending_specialists.is_empty());
    }

    #[test]
    fn test_empty_city_gets_a_specialist() {
        let ruleset = Ruleset::classic();
        let options = LoadOptions::default();
        let mut ctx = context(&ruleset, &options);
        ctx.worked_tiles[6] = Some(3);
        let c = city(&ctx, 3, 0, 6, 0);
        register_city(&mut ctx, c);
        let loaded = &ctx.state.cities[&3];
        assert_eq!(loaded.size, 1);
        assert_eq!(loaded.specialists_total(), 1);
    }

    #[test]
    fn test_duplicate_identity_is_skipped() {
        let ruleset = Ruleset::classic();
        let options = LoadOptions::default();
        let mut ctx = context(&ruleset, &options);
        ctx.worked_tiles[6] = Some(3);
        let first = city(&ctx, 3, 0, 6, 1);
        register_city(&mut ctx, first);
        let second = city(&ctx, 3, 1, 18, 1);
        register_city(&mut ctx, second);
        assert_eq!(ctx.state.cities.len(), 1);
        assert_eq!(ctx.state.cities[&3].tile, 6);
        assert!(ctx.diag.mentions("already in use"));
    }
}
