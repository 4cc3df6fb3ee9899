//! Unit records: `[player%d.u%d]` sections, order queues and the
//! cross-player transport pass.

use crate::codec::{
    activity_to_char, char_to_activity, char_to_direction, direction_to_char, order_tag,
    tile_at,
};
use crate::context::{LoadContext, NameTables, SaveContext};
use crate::error::LoadError;
use crate::secfile::{SectionFile, SectionFileError};
use civstate_core::game_state::GameState;
use civstate_core::ruleset::Ruleset;
use civstate_core::types::{PlayerId, UnitId};
use civstate_core::unit::{Activity, ActionId, Order, Unit, UnitOrders, MAX_ORDERS_LEN};
use std::collections::BTreeSet;

/// Placeholder in per-order columns that do not apply to an order.
const NO_VALUE: char = '?';

fn optional_id(value: i64) -> Option<u32> {
    u32::try_from(value).ok().filter(|id| *id != 0)
}

// ============================================================================
// Loading
// ============================================================================

/// Load and register every unit of one player. Transport links are only
/// recorded here; [`link_transports`] resolves them.
pub(crate) fn load_units(ctx: &mut LoadContext, slot: PlayerId) -> Result<(), LoadError> {
    let count = ctx
        .file
        .lookup_int_default(0, &format!("player{}.nunits", slot));
    for index in 0..count.max(0) {
        let Some(unit) = read_unit(ctx, slot, index) else {
            continue;
        };
        let (id, carrier) = (unit.id, unit.transported_by);
        match ctx.state.add_unit(unit) {
            Ok(()) => {
                if let Some(carrier) = carrier {
                    ctx.pending_transports.push((id, carrier));
                }
            }
            Err(err) => ctx.diag.warn(format!("Unit {} not registered: {}", id, err)),
        }
    }
    Ok(())
}

fn read_unit(ctx: &mut LoadContext, slot: PlayerId, index: i64) -> Option<Unit> {
    let ruleset = ctx.ruleset;
    let base = format!("player{}.u{}", slot, index);
    let file = &ctx.file;
    let diag = &mut ctx.diag;

    let Some(id) = file
        .lookup_int(&format!("{}.id", base))
        .ok()
        .and_then(optional_id)
    else {
        diag.warn(format!("Unit '{}' has no valid identity number, skipped", base));
        return None;
    };
    let (Ok(x), Ok(y)) = (
        file.lookup_int(&format!("{}.x", base)),
        file.lookup_int(&format!("{}.y", base)),
    ) else {
        diag.warn(format!("Unit {} has no location, skipped", id));
        return None;
    };
    let Some(tile) = tile_at(&ctx.state.map, x, y) else {
        diag.warn(format!("Unit {} is off the map at ({}, {}), skipped", id, x, y));
        return None;
    };
    let type_name = file.lookup_str_default("", &format!("{}.type_by_name", base));
    let Some(unit_type) = ruleset.unit_type_by_name(type_name) else {
        diag.warn(format!(
            "Unit {} has unknown type '{}', skipped",
            id, type_name
        ));
        return None;
    };

    let hp = file
        .lookup_int_default(
            i64::from(ruleset.unit_types[unit_type].hp),
            &format!("{}.hp", base),
        )
        .max(0) as u32;
    let moves = file.lookup_int_default(0, &format!("{}.moves", base)).max(0) as u32;
    let mut unit = Unit::new(id, slot, unit_type, tile, hp, moves);

    let nationality = file.lookup_int_default(i64::from(slot), &format!("{}.nationality", base));
    unit.nationality = match PlayerId::try_from(nationality) {
        Ok(p) if ctx.state.players.contains_key(&p) => p,
        _ => {
            diag.warn(format!("Unit {} has unknown nationality {}", id, nationality));
            slot
        }
    };

    let home = file.lookup_int_default(0, &format!("{}.homecity", base));
    unit.homecity = match optional_id(home) {
        Some(city) if ctx.state.cities.contains_key(&city) => Some(city),
        Some(city) => {
            diag.warn(format!(
                "Unit {} has unknown home city {}, now homeless",
                id, city
            ));
            None
        }
        None => None,
    };

    unit.fuel = file.lookup_int_default(0, &format!("{}.fuel", base)).max(0) as u32;
    let veteran = file.lookup_int_default(0, &format!("{}.veteran", base)).max(0);
    let max_veteran = i64::from(ruleset.veteran_levels.saturating_sub(1));
    if veteran > max_veteran {
        diag.warn(format!(
            "Unit {} has veteran level {} beyond {}, clamped",
            id, veteran, max_veteran
        ));
    }
    unit.veteran = veteran.min(max_veteran) as u8;

    let activity = file.lookup_str_default("w", &format!("{}.activity", base));
    unit.activity = match activity.chars().next().and_then(char_to_activity) {
        Some(activity) => activity,
        None => {
            diag.warn(format!("Unit {} has unknown activity '{}'", id, activity));
            Activity::Idle
        }
    };
    let target = file.lookup_str_default("", &format!("{}.activity_tgt", base));
    if !target.is_empty() {
        unit.activity_target = ruleset.extra_by_name(target);
        if unit.activity_target.is_none() {
            diag.warn(format!("Unit {} targets unknown extra '{}'", id, target));
        }
    }
    unit.activity_count = file.lookup_int_default(0, &format!("{}.activity_count", base)) as i32;
    unit.done_moving = file.lookup_bool_default(false, &format!("{}.done_moving", base));
    unit.transported_by =
        optional_id(file.lookup_int_default(0, &format!("{}.transported_by", base)));
    unit.battlegroup =
        u8::try_from(file.lookup_int_default(-1, &format!("{}.battlegroup", base))).ok();
    unit.birth_turn = file.lookup_int_default(0, &format!("{}.born", base)) as i32;

    unit.ai.done = file.lookup_bool_default(false, &format!("{}.ai_done", base));
    unit.ai.passenger = optional_id(file.lookup_int_default(0, &format!("{}.passenger", base)));
    unit.ai.ferryboat = optional_id(file.lookup_int_default(0, &format!("{}.ferryboat", base)));
    unit.ai.charge = optional_id(file.lookup_int_default(0, &format!("{}.charge", base)));
    unit.ai.bodyguard = optional_id(file.lookup_int_default(0, &format!("{}.bodyguard", base)));

    match read_orders(file, ruleset, &ctx.names, &base) {
        Ok(orders) => unit.orders = orders,
        Err(reason) => diag.warn(format!(
            "Orders of unit {} discarded: {}",
            id, reason
        )),
    }
    Some(unit)
}

/// Decode an order queue. Any bad entry rejects the whole queue.
fn read_orders(
    file: &SectionFile,
    ruleset: &Ruleset,
    names: &NameTables,
    base: &str,
) -> Result<UnitOrders, String> {
    let length = file.lookup_int_default(0, &format!("{}.orders_length", base));
    if length <= 0 {
        return Ok(UnitOrders::default());
    }
    let length = length as usize;
    if length > MAX_ORDERS_LEN {
        return Err(format!("{} orders exceed the limit of {}", length, MAX_ORDERS_LEN));
    }

    let tags: Vec<char> = file
        .lookup_str_default("", &format!("{}.orders_list", base))
        .chars()
        .collect();
    let dirs: Vec<char> = file
        .lookup_str_default("", &format!("{}.dir_list", base))
        .chars()
        .collect();
    let activities: Vec<char> = file
        .lookup_str_default("", &format!("{}.activity_list", base))
        .chars()
        .collect();
    let targets = file
        .lookup_str_vec(&format!("{}.tgt_vec", base))
        .map_err(|e| e.to_string())?;
    let actions = file
        .lookup_int_vec(&format!("{}.action_vec", base))
        .map_err(|e| e.to_string())?;
    if tags.len() < length {
        return Err(format!("only {} of {} orders present", tags.len(), length));
    }

    let mut list = Vec::with_capacity(length);
    for (i, tag) in tags.iter().take(length).enumerate() {
        let order = match tag {
            'm' => dirs
                .get(i)
                .copied()
                .and_then(char_to_direction)
                .map(Order::Move)
                .ok_or_else(|| format!("order {} has no valid direction", i))?,
            'a' => {
                let activity = activities
                    .get(i)
                    .copied()
                    .and_then(char_to_activity)
                    .ok_or_else(|| format!("order {} has no valid activity", i))?;
                let target = match targets.get(i).map(String::as_str).unwrap_or("") {
                    "" => None,
                    name => Some(
                        ruleset
                            .extra_by_name(name)
                            .ok_or_else(|| format!("order {} targets unknown extra '{}'", i, name))?,
                    ),
                };
                Order::Activity { activity, target }
            }
            'p' => actions
                .get(i)
                .and_then(|index| names.action(*index))
                .map(Order::PerformAction)
                .ok_or_else(|| format!("order {} has no valid action", i))?,
            'f' => Order::FullMovePoints,
            'h' => Order::ReturnHome,
            other => return Err(format!("order {} has unknown tag '{}'", i, other)),
        };
        list.push(order);
    }

    let mut orders = UnitOrders::new(list);
    let index = file.lookup_int_default(0, &format!("{}.orders_index", base));
    orders.index = match usize::try_from(index) {
        Ok(index) if index < length => index,
        _ => return Err(format!("order index {} out of range", index)),
    };
    orders.repeat = file.lookup_bool_default(false, &format!("{}.orders_repeat", base));
    orders.vigilant = file.lookup_bool_default(false, &format!("{}.orders_vigilant", base));
    Ok(orders)
}

/// Resolve `transported_by` now that every player's units exist.
pub(crate) fn link_transports(ctx: &mut LoadContext) {
    let pending = std::mem::take(&mut ctx.pending_transports);
    // Links are rebuilt from scratch so capacity counts only accepted cargo.
    for (cargo, _) in &pending {
        if let Some(unit) = ctx.state.units.get_mut(cargo) {
            unit.transported_by = None;
        }
    }

    for (cargo, carrier) in pending {
        let problem = match (ctx.state.units.get(&cargo), ctx.state.units.get(&carrier)) {
            (None, _) => continue,
            (Some(_), None) => Some("does not exist"),
            (Some(_), Some(_)) if cargo == carrier => Some("is the unit itself"),
            (Some(_), Some(_)) if carried_by_chain(&ctx.state, carrier, cargo) => {
                Some("is carried by it")
            }
            (Some(unit), Some(transport)) if unit.tile != transport.tile => {
                Some("is on another tile")
            }
            (Some(_), Some(transport)) => {
                let capacity = ctx
                    .ruleset
                    .unit_types
                    .get(transport.unit_type)
                    .map(|t| t.transport_capacity)
                    .unwrap_or(0);
                let loaded = ctx
                    .state
                    .units
                    .values()
                    .filter(|u| u.transported_by == Some(carrier))
                    .count() as u32;
                (loaded >= capacity).then_some("has no room")
            }
        };
        match problem {
            Some(reason) => ctx.diag.warn(format!(
                "Transport {} of unit {} {}, unit unloaded",
                carrier, cargo, reason
            )),
            None => {
                if let Some(unit) = ctx.state.units.get_mut(&cargo) {
                    unit.transported_by = Some(carrier);
                }
            }
        }
    }
}

/// Whether `cargo` appears in the chain of transports above `carrier`.
fn carried_by_chain(state: &GameState, carrier: UnitId, cargo: UnitId) -> bool {
    let mut seen = BTreeSet::new();
    let mut next = Some(carrier);
    while let Some(id) = next {
        if id == cargo || !seen.insert(id) {
            return true;
        }
        next = state.units.get(&id).and_then(|u| u.transported_by);
    }
    false
}

/// Drop AI scratch references to units that did not load.
pub(crate) fn clear_dangling_ai_refs(ctx: &mut LoadContext) {
    let known: BTreeSet<UnitId> = ctx.state.units.keys().copied().collect();
    for unit in ctx.state.units.values_mut() {
        let id = unit.id;
        for slot in [
            &mut unit.ai.passenger,
            &mut unit.ai.ferryboat,
            &mut unit.ai.charge,
            &mut unit.ai.bodyguard,
        ] {
            if let Some(other) = *slot {
                if !known.contains(&other) {
                    tracing::debug!(unit = id, other, "clearing dangling AI reference");
                    *slot = None;
                }
            }
        }
    }
}

/// Reset activities that the unit or its target cannot support.
pub(crate) fn check_activities(ctx: &mut LoadContext) {
    let ruleset = ctx.ruleset;
    for unit in ctx.state.units.values_mut() {
        let can_fortify = ruleset
            .unit_types
            .get(unit.unit_type)
            .is_some_and(|t| t.can_fortify);
        let problem = match (unit.activity, unit.activity_target) {
            (Activity::Fortified | Activity::Fortifying, _) if !can_fortify => {
                Some("cannot be done by this unit type")
            }
            (activity, Some(target)) if activity.takes_target() => {
                match ruleset.extra_kind(target) {
                    Some(kind) if activity.accepts_target(kind) => None,
                    _ => Some("has a target of the wrong kind"),
                }
            }
            (Activity::Base | Activity::GenRoad, None) => Some("has no target"),
            (_, Some(_)) => {
                unit.activity_target = None;
                None
            }
            _ => None,
        };
        if let Some(reason) = problem {
            ctx.diag.warn(format!(
                "Activity {} of unit {} {}, unit idles",
                unit.activity, unit.id, reason
            ));
            unit.set_idle();
        }
    }
}

// ============================================================================
// Saving
// ============================================================================

/// Write one unit as `player{slot}.u{index}`.
pub(crate) fn save_unit(
    ctx: &mut SaveContext,
    slot: PlayerId,
    index: usize,
    unit: &Unit,
) -> Result<(), SectionFileError> {
    let ruleset = ctx.ruleset;
    let coord = ctx.state.map.coord_of(unit.tile);
    let file = &mut ctx.file;
    let base = format!("player{}.u{}", slot, index);
    let extra_name = |extra: Option<usize>| {
        extra
            .and_then(|e| ruleset.extras.get(e))
            .map(|e| e.name.as_str())
            .unwrap_or("")
    };

    file.insert_int(&format!("{}.id", base), i64::from(unit.id))?;
    file.insert_int(&format!("{}.x", base), i64::from(coord.x))?;
    file.insert_int(&format!("{}.y", base), i64::from(coord.y))?;
    file.insert_int(&format!("{}.nationality", base), i64::from(unit.nationality))?;
    file.insert_str(
        &format!("{}.type_by_name", base),
        ruleset
            .unit_types
            .get(unit.unit_type)
            .map(|t| t.name.as_str())
            .unwrap_or(""),
    )?;
    file.insert_int(
        &format!("{}.homecity", base),
        i64::from(unit.homecity.unwrap_or(0)),
    )?;
    file.insert_int(&format!("{}.moves", base), i64::from(unit.moves_left))?;
    file.insert_int(&format!("{}.fuel", base), i64::from(unit.fuel))?;
    file.insert_int(&format!("{}.hp", base), i64::from(unit.hp))?;
    file.insert_int(&format!("{}.veteran", base), i64::from(unit.veteran))?;
    file.insert_str(
        &format!("{}.activity", base),
        &activity_to_char(unit.activity).to_string(),
    )?;
    file.insert_str(
        &format!("{}.activity_tgt", base),
        extra_name(unit.activity_target),
    )?;
    file.insert_int(&format!("{}.activity_count", base), i64::from(unit.activity_count))?;
    file.insert_bool(&format!("{}.done_moving", base), unit.done_moving)?;
    file.insert_int(
        &format!("{}.transported_by", base),
        i64::from(unit.transported_by.unwrap_or(0)),
    )?;
    file.insert_int(
        &format!("{}.battlegroup", base),
        unit.battlegroup.map_or(-1, i64::from),
    )?;
    file.insert_int(&format!("{}.born", base), i64::from(unit.birth_turn))?;

    file.insert_bool(&format!("{}.ai_done", base), unit.ai.done)?;
    for (key, value) in [
        ("passenger", unit.ai.passenger),
        ("ferryboat", unit.ai.ferryboat),
        ("charge", unit.ai.charge),
        ("bodyguard", unit.ai.bodyguard),
    ] {
        file.insert_int(&format!("{}.{}", base, key), i64::from(value.unwrap_or(0)))?;
    }

    let orders = &unit.orders;
    file.insert_int(&format!("{}.orders_length", base), orders.len() as i64)?;
    if orders.is_empty() {
        return Ok(());
    }
    file.insert_int(&format!("{}.orders_index", base), orders.index as i64)?;
    file.insert_bool(&format!("{}.orders_repeat", base), orders.repeat)?;
    file.insert_bool(&format!("{}.orders_vigilant", base), orders.vigilant)?;

    let mut tags = String::new();
    let mut dirs = String::new();
    let mut activities = String::new();
    let mut targets = Vec::new();
    let mut actions = Vec::new();
    for order in &orders.list {
        tags.push(order_tag(order));
        dirs.push(match order {
            Order::Move(dir) => direction_to_char(*dir),
            _ => NO_VALUE,
        });
        activities.push(match order {
            Order::Activity { activity, .. } => activity_to_char(*activity),
            _ => NO_VALUE,
        });
        targets.push(match order {
            Order::Activity { target, .. } => extra_name(*target),
            _ => "",
        });
        actions.push(match order {
            Order::PerformAction(action) => ActionId::ALL
                .iter()
                .position(|a| a == action)
                .map_or(-1, |i| i as i64),
            _ => -1,
        });
    }
    file.insert_str(&format!("{}.orders_list", base), &tags)?;
    file.insert_str(&format!("{}.dir_list", base), &dirs)?;
    file.insert_str(&format!("{}.activity_list", base), &activities)?;
    file.insert_str_vec(&format!("{}.tgt_vec", base), &targets)?;
    file.insert_int_vec(&format!("{}.action_vec", base), &actions)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoadOptions, SaveOptions};
    use civstate_core::coord::Direction8;
    use civstate_core::game_state::GameState;
    use civstate_core::map::Map;
    use civstate_core::player::Player;

    fn context<'a>(
        file: SectionFile,
        ruleset: &'a Ruleset,
        options: &'a LoadOptions,
    ) -> LoadContext<'a> {
        let mut ctx = LoadContext::new(file, ruleset, options);
        ctx.names = NameTables::load(&ctx.file, ruleset, &mut ctx.diag).unwrap();
        ctx.state.map = Map::new(4, 4, 7, ruleset.extras.len());
        for slot in 0..2 {
            ctx.state
                .add_player(Player::new(slot, "P", 2), ruleset.techs.len());
        }
        ctx
    }

    fn write_unit(file: &mut SectionFile, base: &str, id: i64, type_name: &str) {
        file.insert_int(&format!("{}.id", base), id).unwrap();
        file.insert_int(&format!("{}.x", base), 1).unwrap();
        file.insert_int(&format!("{}.y", base), 1).unwrap();
        file.insert_str(&format!("{}.type_by_name", base), type_name)
            .unwrap();
    }

    #[test]
    fn test_dangling_homecity_becomes_none() {
        let ruleset = Ruleset::classic();
        let options = LoadOptions::default();
        let mut file = SectionFile::new();
        file.insert_int("player0.nunits", 1).unwrap();
        write_unit(&mut file, "player0.u0", 10, "Warriors");
        file.insert_int("player0.u0.homecity", 999).unwrap();
        let mut ctx = context(file, &ruleset, &options);

        load_units(&mut ctx, 0).unwrap();
        assert_eq!(ctx.state.units[&10].homecity, None);
        assert!(ctx.diag.mentions("unknown home city 999"));
    }

    #[test]
    fn test_wide_coordinates_are_off_the_map() {
        let ruleset = Ruleset::classic();
        let options = LoadOptions::default();
        let mut file = SectionFile::new();
        file.insert_int("player0.nunits", 1).unwrap();
        write_unit(&mut file, "player0.u0", 10, "Warriors");
        file.insert_int("player0.u0.x", (1 << 32) + 1).unwrap();
        let mut ctx = context(file, &ruleset, &options);

        load_units(&mut ctx, 0).unwrap();
        assert!(ctx.state.units.is_empty());
        assert!(ctx.diag.mentions("Unit 10 is off the map"));
    }

    #[test]
    fn test_bad_order_discards_whole_queue() {
        let ruleset = Ruleset::classic();
        let options = LoadOptions::default();
        let mut file = SectionFile::new();
        file.insert_int("player0.nunits", 1).unwrap();
        write_unit(&mut file, "player0.u0", 10, "Warriors");
        file.insert_int("player0.u0.orders_length", 3).unwrap();
        file.insert_str("player0.u0.orders_list", "mmf").unwrap();
        file.insert_str("player0.u0.dir_list", "8Z?").unwrap();
        let mut ctx = context(file, &ruleset, &options);

        load_units(&mut ctx, 0).unwrap();
        assert!(!ctx.state.units[&10].has_orders());
        assert!(ctx.diag.mentions("Orders of unit 10 discarded"));
    }

    #[test]
    fn test_transport_owned_by_later_player() {
        let ruleset = Ruleset::classic();
        let options = LoadOptions::default();
        let mut file = SectionFile::new();
        file.insert_int("player0.nunits", 1).unwrap();
        write_unit(&mut file, "player0.u0", 10, "Warriors");
        file.insert_int("player0.u0.transported_by", 20).unwrap();
        file.insert_int("player1.nunits", 1).unwrap();
        write_unit(&mut file, "player1.u0", 20, "Trireme");
        let mut ctx = context(file, &ruleset, &options);

        load_units(&mut ctx, 0).unwrap();
        load_units(&mut ctx, 1).unwrap();
        link_transports(&mut ctx);
        assert_eq!(ctx.state.units[&10].transported_by, Some(20));
        assert!(ctx.diag.is_empty());
    }

    #[test]
    fn test_transport_without_room_unloads() {
        let ruleset = Ruleset::classic();
        let options = LoadOptions::default();
        let mut file = SectionFile::new();
        file.insert_int("player0.nunits", 4).unwrap();
        write_unit(&mut file, "player0.u0", 1, "Trireme");
        for (i, id) in [2i64, 3, 4].into_iter().enumerate() {
            let base = format!("player0.u{}", i + 1);
            write_unit(&mut file, &base, id, "Warriors");
            file.insert_int(&format!("{}.transported_by", base), 1).unwrap();
        }
        let mut ctx = context(file, &ruleset, &options);

        load_units(&mut ctx, 0).unwrap();
        link_transports(&mut ctx);
        let carried = ctx
            .state
            .units
            .values()
            .filter(|u| u.transported_by == Some(1))
            .count();
        assert_eq!(carried, 2);
        assert!(ctx.diag.mentions("has no room"));
    }

    #[test]
    fn test_transport_cycle_is_broken() {
        let ruleset = Ruleset::classic();
        let options = LoadOptions::default();
        let mut file = SectionFile::new();
        file.insert_int("player1.nunits", 2).unwrap();
        write_unit(&mut file, "player1.u0", 1, "Trireme");
        file.insert_int("player1.u0.transported_by", 2).unwrap();
        write_unit(&mut file, "player1.u1", 2, "Trireme");
        file.insert_int("player1.u1.transported_by", 1).unwrap();
        let mut ctx = context(file, &ruleset, &options);

        load_units(&mut ctx, 1).unwrap();
        link_transports(&mut ctx);
        assert_eq!(ctx.state.units[&1].transported_by, Some(2));
        assert_eq!(ctx.state.units[&2].transported_by, None);
        assert!(ctx.diag.mentions("Transport 1 of unit 2 is carried by it"));
    }

    #[test]
    fn test_targetless_road_building_idles() {
        let ruleset = Ruleset::classic();
        let options = LoadOptions::default();
        let mut file = SectionFile::new();
        file.insert_int("player0.nunits", 2).unwrap();
        write_unit(&mut file, "player0.u0", 10, "Workers");
        file.insert_str("player0.u0.activity", "R").unwrap();
        write_unit(&mut file, "player0.u1", 11, "Workers");
        file.insert_str("player0.u1.activity", "m").unwrap();
        file.insert_str("player0.u1.activity_tgt", "Road").unwrap();
        let mut ctx = context(file, &ruleset, &options);

        load_units(&mut ctx, 0).unwrap();
        check_activities(&mut ctx);
        assert_eq!(ctx.state.units[&10].activity, Activity::Idle);
        assert_eq!(ctx.state.units[&11].activity, Activity::Idle);
        assert_eq!(ctx.state.units[&11].activity_target, None);
    }

    #[test]
    fn test_orders_survive_save_and_load() {
        let ruleset = Ruleset::classic();
        let mut state = GameState::new(&ruleset);
        state.map = Map::new(4, 4, 7, ruleset.extras.len());
        state.add_player(Player::new(0, "P", 2), ruleset.techs.len());
        let irrigation = ruleset.extra_by_name("Irrigation");
        let mut unit = Unit::new(10, 0, 1, 5, 10, 1);
        unit.orders = UnitOrders::new(vec![
            Order::Move(Direction8::North),
            Order::Activity {
                activity: Activity::Irrigate,
                target: irrigation,
            },
            Order::PerformAction(ActionId::Fortify),
            Order::FullMovePoints,
        ]);
        unit.orders.index = 1;
        unit.orders.vigilant = true;
        state.add_unit(unit.clone()).unwrap();

        let save_options = SaveOptions::default();
        let mut save = SaveContext::new(&ruleset, &state, &save_options);
        save_unit(&mut save, 0, 0, &unit).unwrap();
        save.file.insert_int("player0.nunits", 1).unwrap();

        let options = LoadOptions::default();
        let mut ctx = context(save.file, &ruleset, &options);
        load_units(&mut ctx, 0).unwrap();
        assert_eq!(ctx.state.units[&10].orders, unit.orders);
    }
}
