//! Player records: `[player%d]` sections, diplomacy, vision and the
//! cross-player checks that run once every entity exists.

use crate::codec::{bools_to_string, quote_block, string_to_bools, tile_at, unquote_block};
use crate::compat::player_sections;
use crate::context::{LoadContext, SaveContext};
use crate::error::{Diagnostics, LoadError};
use crate::map_codec::{
    load_bit_rows, load_char_rows, load_token_rows, save_bit_rows, save_char_rows,
    save_token_rows, MissingRow, RESOURCE_NONE,
};
use crate::secfile::SectionFileError;
use crate::{city_codec, unit_codec};
use civstate_core::bitset::BitVector;
use civstate_core::player::{
    AiLevel, DiplState, DiplStateType, DumbCity, Player, PlayerVision, SpaceshipState, TaxRates,
    TileMemory, TraitValue, NUM_SS_STRUCTURALS,
};
use civstate_core::types::{PlayerId, MAX_PLAYER_SLOTS};

/// Characters per attribute block part.
const ATTRIBUTE_CHUNK: usize = 250;

/// Largest attribute block accepted.
pub const MAX_ATTRIBUTE_BLOCK: usize = 256 * 1024;

/// Vision terrain character for tiles the player has never seen.
const VISION_UNKNOWN: char = '?';

// ============================================================================
// Basic records
// ============================================================================

/// Load every player's basic record, then the diplomatic matrix.
pub(crate) fn load_players_basic(ctx: &mut LoadContext) -> Result<(), LoadError> {
    let slots = player_sections(&ctx.file);
    let expected = ctx.file.lookup_int_default(slots.len() as i64, "players.nplayers");
    if expected != slots.len() as i64 {
        ctx.diag.warn(format!(
            "{} players announced but {} player sections found",
            expected,
            slots.len()
        ));
    }

    let mut loaded = Vec::new();
    for slot in slots {
        let Some(slot) = PlayerId::try_from(slot)
            .ok()
            .filter(|s| (*s as usize) < MAX_PLAYER_SLOTS)
        else {
            ctx.diag.warn(format!("Player slot {} is out of range", slot));
            continue;
        };
        let player = load_player(ctx, slot)?;
        ctx.state.add_player(player, ctx.ruleset.techs.len());
        loaded.push(slot);
    }

    // Diplomacy references other slots, so it waits for every player.
    for slot in loaded {
        load_diplstates(ctx, slot);
    }
    tracing::debug!(players = ctx.state.players.len(), "players loaded");
    Ok(())
}

fn load_player(ctx: &mut LoadContext, slot: PlayerId) -> Result<Player, LoadError> {
    let file = &ctx.file;
    let ruleset = ctx.ruleset;
    let diag = &mut ctx.diag;
    let p = format!("player{}", slot);

    let name = match file.lookup_str(&format!("{}.name", p)) {
        Ok(name) => name.to_string(),
        Err(_) => {
            diag.warn(format!("Player {} has no name", slot));
            format!("Player {}", slot)
        }
    };

    let government_name = file.lookup_str_default("", &format!("{}.government_name", p));
    let government = match ruleset.government_by_name(government_name) {
        Some(gov) => gov,
        None => {
            diag.warn(format!(
                "Player {} has unknown government '{}'",
                slot, government_name
            ));
            0
        }
    };

    let mut player = Player::new(slot, &name, government);
    player.username = file
        .lookup_str_default("", &format!("{}.username", p))
        .to_string();

    let nation = file.lookup_str_default("", &format!("{}.nation", p));
    if !nation.is_empty() {
        if ruleset.has_nation(nation) {
            player.nation = Some(nation.to_string());
        } else {
            diag.warn(format!("Player {} has unknown nation '{}'", slot, nation));
        }
    }

    let team = file.lookup_int_default(i64::from(slot), &format!("{}.team", p));
    player.team = match u8::try_from(team) {
        Ok(team) => team,
        Err(_) => {
            diag.warn(format!("Player {} has invalid team {}", slot, team));
            slot
        }
    };

    let target = file.lookup_str_default("", &format!("{}.target_government_name", p));
    if !target.is_empty() {
        player.target_government = ruleset.government_by_name(target);
        if player.target_government.is_none() {
            diag.warn(format!(
                "Player {} targets unknown government '{}'",
                slot, target
            ));
        }
    }
    let finishes = file.lookup_int_default(-1, &format!("{}.revolution_finishes", p));
    player.revolution_finishes = (finishes >= 0).then_some(finishes as i32);

    player.is_alive = file.lookup_bool_default(true, &format!("{}.is_alive", p));
    player.gold = file.lookup_int_default(0, &format!("{}.gold", p)) as i32;

    let rates = TaxRates {
        tax: file.lookup_int_default(30, &format!("{}.rates.tax", p)).max(0) as u32,
        luxury: file.lookup_int_default(0, &format!("{}.rates.lux", p)).max(0) as u32,
        science: file.lookup_int_default(70, &format!("{}.rates.sci", p)).max(0) as u32,
    };
    if rates.is_valid() {
        player.rates = rates;
    } else {
        diag.warn(format!("Player {} has invalid tax rates, using defaults", slot));
    }

    player.ai.control = file.lookup_bool_default(false, &format!("{}.ai_control", p));
    player.ai.barbarian = file.lookup_bool_default(false, &format!("{}.barbarian", p));
    let level = file.lookup_str_default("", &format!("{}.ai_skill_level", p));
    player.ai.skill_level = AiLevel::by_name(level).unwrap_or_else(|| {
        if !level.is_empty() {
            diag.warn(format!("Player {} has unknown AI level '{}'", slot, level));
        }
        AiLevel::default()
    });

    for (index, trait_id) in ctx.names.traits.iter().enumerate() {
        let base = format!("{}.trait{}", p, index);
        let Ok(value) = file.lookup_int(&format!("{}.val", base)) else {
            continue;
        };
        if let Some(trait_id) = trait_id {
            player.traits.insert(
                *trait_id,
                TraitValue {
                    value: value as i32,
                    modifier: file.lookup_int_default(0, &format!("{}.mod", base)) as i32,
                },
            );
        }
    }

    player.attribute_block = load_attribute_block(ctx, &p);
    load_spaceship(ctx, &p, &mut player);
    Ok(player)
}

fn load_attribute_block(ctx: &mut LoadContext, p: &str) -> Vec<u8> {
    let length = ctx
        .file
        .lookup_int_default(0, &format!("{}.attribute_v2_block_length", p));
    if length <= 0 {
        return Vec::new();
    }
    let parts = ctx
        .file
        .lookup_int_default(0, &format!("{}.attribute_v2_block_parts", p));
    let mut quoted = String::new();
    for part in 0..parts.max(0) {
        match ctx
            .file
            .lookup_str(&format!("{}.attribute_v2_block_data{}", p, part))
        {
            Ok(data) => quoted.push_str(data),
            Err(err) => {
                ctx.diag
                    .warn(format!("Attribute block of {} is incomplete: {}", p, err));
                return Vec::new();
            }
        }
    }
    match unquote_block(&quoted, MAX_ATTRIBUTE_BLOCK) {
        Ok(bytes) if bytes.len() as i64 == length => bytes,
        Ok(bytes) => {
            ctx.diag.warn(format!(
                "Attribute block of {} has {} bytes, expected {}",
                p,
                bytes.len(),
                length
            ));
            Vec::new()
        }
        Err(err) => {
            ctx.diag.warn(format!("Attribute block of {} dropped: {}", p, err));
            Vec::new()
        }
    }
}

fn load_spaceship(ctx: &mut LoadContext, p: &str, player: &mut Player) {
    let base = format!("{}.spaceship", p);
    let file = &ctx.file;
    let state = file.lookup_str_default("none", &format!("{}.state", base));
    let Some(state) = SpaceshipState::by_name(state) else {
        ctx.diag
            .warn(format!("Unknown spaceship state '{}' for {}", state, p));
        return;
    };
    let ship = &mut player.spaceship;
    ship.state = state;
    if state == SpaceshipState::None {
        return;
    }

    let structurals = file.lookup_str_default("", &format!("{}.structurals", base));
    match string_to_bools(structurals) {
        Some(bits) if bits.len() <= NUM_SS_STRUCTURALS => {
            for (i, set) in bits.into_iter().enumerate() {
                ship.structurals.assign(i, set);
            }
        }
        _ => ctx
            .diag
            .warn(format!("Invalid spaceship structurals for {}", p)),
    }
    ship.components = file
        .lookup_int_default(0, &format!("{}.components", base))
        .max(0) as u32;
    ship.modules = file
        .lookup_int_default(0, &format!("{}.modules", base))
        .max(0) as u32;
    ship.launch_year = file
        .lookup_int(&format!("{}.launch_year", base))
        .ok()
        .map(|y| y as i32);
    if state == SpaceshipState::Launched && ship.launch_year.is_none() {
        ctx.diag
            .warn(format!("Launched spaceship of {} has no launch year", p));
    }
}

fn load_diplstates(ctx: &mut LoadContext, slot: PlayerId) {
    let others: Vec<PlayerId> = ctx.state.players.keys().copied().collect();
    let mut states = Vec::new();
    for other in others.into_iter().filter(|o| *o != slot) {
        let base = format!("player{}.diplstate{}", slot, other);
        if !ctx.file.has_section(&base) {
            continue;
        }
        let file = &ctx.file;
        let read_state = |key: &str, diag: &mut Diagnostics| {
            let name = file.lookup_str_default("", &format!("{}.{}", base, key));
            DiplStateType::by_name(name).unwrap_or_else(|| {
                diag.warn(format!(
                    "Unknown diplomatic state '{}' in '{}', assuming war",
                    name, base
                ));
                DiplStateType::War
            })
        };
        let state = read_state("type", &mut ctx.diag);
        let max_state = read_state("max_state", &mut ctx.diag);
        let ds = DiplState {
            state,
            max_state,
            first_contact_turn: file
                .lookup_int_default(0, &format!("{}.first_contact_turn", base))
                as i32,
            turns_left: file.lookup_int_default(0, &format!("{}.turns_left", base)) as i32,
            has_reason_to_cancel: file
                .lookup_int_default(0, &format!("{}.has_reason_to_cancel", base))
                as i32,
            contact_turns_left: file
                .lookup_int_default(0, &format!("{}.contact_turns_left", base))
                as i32,
            has_embassy: file.lookup_bool_default(false, &format!("{}.embassy", base)),
            gives_shared_vision: file
                .lookup_bool_default(false, &format!("{}.gives_shared_vision", base)),
        };
        states.push((other, ds));
    }
    if let Some(player) = ctx.state.players.get_mut(&slot) {
        player.diplstates.extend(states);
    }
}

// ============================================================================
// Full records
// ============================================================================

/// Cities, units, transports, vision and the cross-player checks, in that
/// order.
pub(crate) fn load_players_full(ctx: &mut LoadContext) -> Result<(), LoadError> {
    let slots: Vec<PlayerId> = ctx.state.players.keys().copied().collect();

    for slot in &slots {
        city_codec::load_cities(ctx, *slot)?;
    }
    city_codec::finish_worked_tiles(ctx);

    for slot in &slots {
        unit_codec::load_units(ctx, *slot)?;
    }
    // Carriers may belong to any player, so links wait for every unit.
    unit_codec::link_transports(ctx);
    unit_codec::clear_dangling_ai_refs(ctx);

    for slot in &slots {
        load_vision(ctx, *slot);
    }

    check_diplomacy(ctx);
    check_shared_vision(ctx);
    check_borders(ctx);
    unit_codec::check_activities(ctx);
    Ok(())
}

fn load_vision(ctx: &mut LoadContext, slot: PlayerId) {
    let p = format!("player{}", slot);
    let (xsize, ysize) = (ctx.state.map.xsize, ctx.state.map.ysize);
    let ruleset = ctx.ruleset;
    let mut vision = PlayerVision::default();

    if ctx.file.contains(&format!("{}.map_t0000", p)) {
        let terrain = &ctx.names.terrain;
        load_char_rows(
            &ctx.file,
            &mut ctx.diag,
            xsize,
            ysize,
            MissingRow::Warn,
            |y| format!("{}.map_t{:04}", p, y),
            |index, ch, diag| {
                if ch == VISION_UNKNOWN {
                    return;
                }
                match terrain.get(&ch) {
                    Some(terrain) => {
                        vision.tiles.insert(
                            index,
                            TileMemory {
                                terrain: *terrain,
                                resource: None,
                                extras: BitVector::new(ruleset.extras.len()),
                                owner: None,
                            },
                        );
                    }
                    None => diag.warn(format!(
                        "Unknown terrain '{}' in vision of {}, tile forgotten",
                        ch, p
                    )),
                }
            },
        );
        load_char_rows(
            &ctx.file,
            &mut ctx.diag,
            xsize,
            ysize,
            MissingRow::Warn,
            |y| format!("{}.map_res{:04}", p, y),
            |index, ch, diag| {
                let Some(memory) = vision.tiles.get_mut(&index) else {
                    return;
                };
                if ch == RESOURCE_NONE {
                    return;
                }
                match ruleset.resource_by_identifier(ch) {
                    Some(resource) => memory.resource = Some(resource),
                    None => diag.warn(format!("Unknown resource '{}' in vision of {}", ch, p)),
                }
            },
        );
        let extras = load_bit_rows(
            &ctx.file,
            &mut ctx.diag,
            &format!("{}.map_e", p),
            xsize,
            ysize,
            ctx.names.extras.len(),
        );
        for (index, memory) in vision.tiles.iter_mut() {
            for bit in extras[*index].iter_ones() {
                if let Some(extra) = ctx.names.extras.get(bit).copied().flatten() {
                    memory.extras.set(extra);
                }
            }
        }
        let players = ctx.state.used_slots();
        load_token_rows(
            &ctx.file,
            &mut ctx.diag,
            xsize,
            ysize,
            |y| format!("{}.map_owner{:04}", p, y),
            |index, token, _| {
                if let (Some(memory), Some(owner)) = (vision.tiles.get_mut(&index), token) {
                    memory.owner = PlayerId::try_from(owner)
                        .ok()
                        .filter(|o| players.contains(*o));
                }
            },
        );
    }

    let count = ctx.file.lookup_int_default(0, &format!("{}.dc_count", p));
    for i in 0..count.max(0) {
        let base = format!("{}.dc{}", p, i);
        match load_dumb_city(ctx, &base) {
            Some(city) => {
                vision.cities.insert(city.tile, city);
            }
            None => ctx
                .diag
                .warn(format!("Remembered city '{}' is invalid, forgotten", base)),
        }
    }

    if let Some(player) = ctx.state.players.get_mut(&slot) {
        player.vision = vision;
    }
}

fn load_dumb_city(ctx: &LoadContext, base: &str) -> Option<DumbCity> {
    let file = &ctx.file;
    let id = u32::try_from(file.lookup_int(&format!("{}.id", base)).ok()?).ok()?;
    let x = file.lookup_int(&format!("{}.x", base)).ok()?;
    let y = file.lookup_int(&format!("{}.y", base)).ok()?;
    let tile = tile_at(&ctx.state.map, x, y)?;
    let owner = PlayerId::try_from(file.lookup_int(&format!("{}.owner", base)).ok()?).ok()?;
    if id == 0 || !ctx.state.players.contains_key(&owner) {
        return None;
    }
    Some(DumbCity {
        id,
        tile,
        owner,
        name: file
            .lookup_str_default("", &format!("{}.name", base))
            .to_string(),
        size: file.lookup_int_default(1, &format!("{}.size", base)).max(0) as u32,
        walls: file.lookup_bool_default(false, &format!("{}.walls", base)),
        occupied: file.lookup_bool_default(false, &format!("{}.occupied", base)),
        capital: file.lookup_bool_default(false, &format!("{}.capital", base)),
    })
}

// ============================================================================
// Cross-player checks
// ============================================================================

fn set_state(ctx: &mut LoadContext, a: PlayerId, b: PlayerId, state: DiplStateType) {
    for (from, to) in [(a, b), (b, a)] {
        if let Some(player) = ctx.state.players.get_mut(&from) {
            player
                .diplstates
                .entry(to)
                .or_insert_with(|| DiplState::new(state))
                .state = state;
        }
    }
}

/// Make the matrix symmetric, then downgrade alliances the ruleset does
/// not allow.
fn check_diplomacy(ctx: &mut LoadContext) {
    let slots: Vec<PlayerId> = ctx.state.players.keys().copied().collect();
    let pairs: Vec<(PlayerId, PlayerId)> = slots
        .iter()
        .flat_map(|a| slots.iter().filter(move |b| a < *b).map(move |b| (*a, *b)))
        .collect();

    for (a, b) in &pairs {
        let (a, b) = (*a, *b);
        let sa = ctx.state.players[&a].diplstate(b);
        let sb = ctx.state.players[&b].diplstate(a);
        if sa != sb {
            let state = if sa.closeness() <= sb.closeness() { sa } else { sb };
            ctx.diag.warn(format!(
                "Players {} and {} disagree on their relationship ({} / {}), using {}",
                a,
                b,
                sa.name(),
                sb.name(),
                state.name()
            ));
            set_state(ctx, a, b, state);
        }
    }

    for (a, b) in pairs {
        if ctx.state.players[&a].diplstate(b) != DiplStateType::Alliance {
            continue;
        }
        if !ctx.state.is_valid_alliance(ctx.ruleset, a, b) {
            ctx.diag.warn(format!(
                "Alliance between players {} and {} is not legal, downgraded to peace",
                a, b
            ));
            set_state(ctx, a, b, DiplStateType::Peace);
        }
    }
}

fn check_shared_vision(ctx: &mut LoadContext) {
    let alive: Vec<PlayerId> = ctx
        .state
        .players
        .values()
        .filter(|p| p.is_alive)
        .map(|p| p.slot)
        .collect();
    for player in ctx.state.players.values_mut() {
        for (other, ds) in player.diplstates.iter_mut() {
            if ds.gives_shared_vision && !alive.contains(other) {
                ds.gives_shared_vision = false;
                ctx.diag.warn(format!(
                    "Player {} shared vision with missing or dead player {}, revoked",
                    player.slot, other
                ));
            }
        }
    }
}

/// Drop borders of players that are gone and put every city center inside
/// its owner's borders.
fn check_borders(ctx: &mut LoadContext) {
    let alive: Vec<PlayerId> = ctx
        .state
        .players
        .values()
        .filter(|p| p.is_alive)
        .map(|p| p.slot)
        .collect();
    let mut cleared = 0;
    for tile in ctx.state.map.tiles.iter_mut() {
        if tile.owner.is_some_and(|o| !alive.contains(&o)) {
            tile.owner = None;
            tile.claimer = None;
            cleared += 1;
        }
    }
    if cleared > 0 {
        ctx.diag
            .warn(format!("Cleared {} tiles owned by missing or dead players", cleared));
    }

    for city in ctx.state.cities.values() {
        let Some(tile) = ctx.state.map.tiles.get_mut(city.tile) else {
            continue;
        };
        if tile.owner != Some(city.owner) {
            ctx.diag.warn(format!(
                "City {} sits outside its owner's borders, border restored",
                city.id
            ));
            tile.owner = Some(city.owner);
            tile.claimer = Some(city.tile);
        }
    }
}

// ============================================================================
// Saving
// ============================================================================

/// Write every player, with their cities and units.
pub(crate) fn save_players(ctx: &mut SaveContext) -> Result<(), SectionFileError> {
    let state = ctx.state;
    ctx.file
        .insert_int("players.nplayers", state.players.len() as i64)?;
    for player in state.players.values() {
        save_player(ctx, player)?;
        for (index, id) in player.cities.iter().enumerate() {
            if let Some(city) = state.cities.get(id) {
                city_codec::save_city(ctx, player.slot, index, city)?;
            }
        }
        for (index, id) in player.units.iter().enumerate() {
            if let Some(unit) = state.units.get(id) {
                unit_codec::save_unit(ctx, player.slot, index, unit)?;
            }
        }
        save_vision(ctx, player)?;
    }
    Ok(())
}

fn save_player(ctx: &mut SaveContext, player: &Player) -> Result<(), SectionFileError> {
    let ruleset = ctx.ruleset;
    let file = &mut ctx.file;
    let p = format!("player{}", player.slot);

    file.insert_str(&format!("{}.name", p), &player.name)?;
    file.insert_str(&format!("{}.username", p), &player.username)?;
    file.insert_str(
        &format!("{}.nation", p),
        player.nation.as_deref().unwrap_or(""),
    )?;
    file.insert_int(&format!("{}.team", p), i64::from(player.team))?;
    file.insert_str(
        &format!("{}.government_name", p),
        ruleset
            .governments
            .get(player.government)
            .map(String::as_str)
            .unwrap_or(""),
    )?;
    file.insert_str(
        &format!("{}.target_government_name", p),
        player
            .target_government
            .and_then(|g| ruleset.governments.get(g))
            .map(String::as_str)
            .unwrap_or(""),
    )?;
    file.insert_int(
        &format!("{}.revolution_finishes", p),
        player.revolution_finishes.map_or(-1, i64::from),
    )?;
    file.insert_bool(&format!("{}.is_alive", p), player.is_alive)?;
    file.insert_int(&format!("{}.gold", p), i64::from(player.gold))?;
    file.insert_int(&format!("{}.rates.tax", p), i64::from(player.rates.tax))?;
    file.insert_int(&format!("{}.rates.lux", p), i64::from(player.rates.luxury))?;
    file.insert_int(&format!("{}.rates.sci", p), i64::from(player.rates.science))?;
    file.insert_bool(&format!("{}.ai_control", p), player.ai.control)?;
    file.insert_str(
        &format!("{}.ai_skill_level", p),
        player.ai.skill_level.name(),
    )?;
    file.insert_bool(&format!("{}.barbarian", p), player.ai.barbarian)?;
    file.insert_int(&format!("{}.ncities", p), player.cities.len() as i64)?;
    file.insert_int(&format!("{}.nunits", p), player.units.len() as i64)?;

    // Traits are indexed by the trait vector, which follows the ruleset.
    for (trait_id, value) in &player.traits {
        let base = format!("{}.trait{}", p, trait_id);
        file.insert_int(&format!("{}.val", base), i64::from(value.value))?;
        file.insert_int(&format!("{}.mod", base), i64::from(value.modifier))?;
    }

    if !player.attribute_block.is_empty() {
        let quoted = quote_block(&player.attribute_block);
        let parts: Vec<&[u8]> = quoted.as_bytes().chunks(ATTRIBUTE_CHUNK).collect();
        file.insert_int(
            &format!("{}.attribute_v2_block_length", p),
            player.attribute_block.len() as i64,
        )?;
        file.insert_int(
            &format!("{}.attribute_v2_block_parts", p),
            parts.len() as i64,
        )?;
        for (i, part) in parts.iter().enumerate() {
            file.insert_str(
                &format!("{}.attribute_v2_block_data{}", p, i),
                std::str::from_utf8(part).unwrap_or_default(),
            )?;
        }
    }

    let ship = &player.spaceship;
    let base = format!("{}.spaceship", p);
    file.insert_str(&format!("{}.state", base), ship.state.name())?;
    if ship.state != SpaceshipState::None {
        file.insert_str(
            &format!("{}.structurals", base),
            &bools_to_string((0..NUM_SS_STRUCTURALS).map(|i| ship.structurals.get(i))),
        )?;
        file.insert_int(&format!("{}.components", base), i64::from(ship.components))?;
        file.insert_int(&format!("{}.modules", base), i64::from(ship.modules))?;
        if let Some(year) = ship.launch_year {
            file.insert_int(&format!("{}.launch_year", base), i64::from(year))?;
        }
    }

    for (other, ds) in &player.diplstates {
        let base = format!("{}.diplstate{}", p, other);
        file.insert_str(&format!("{}.type", base), ds.state.name())?;
        file.insert_str(&format!("{}.max_state", base), ds.max_state.name())?;
        file.insert_int(
            &format!("{}.first_contact_turn", base),
            i64::from(ds.first_contact_turn),
        )?;
        file.insert_int(&format!("{}.turns_left", base), i64::from(ds.turns_left))?;
        file.insert_int(
            &format!("{}.has_reason_to_cancel", base),
            i64::from(ds.has_reason_to_cancel),
        )?;
        file.insert_int(
            &format!("{}.contact_turns_left", base),
            i64::from(ds.contact_turns_left),
        )?;
        file.insert_bool(&format!("{}.embassy", base), ds.has_embassy)?;
        file.insert_bool(
            &format!("{}.gives_shared_vision", base),
            ds.gives_shared_vision,
        )?;
    }
    Ok(())
}

fn save_vision(ctx: &mut SaveContext, player: &Player) -> Result<(), SectionFileError> {
    let ruleset = ctx.ruleset;
    let map = &ctx.state.map;
    let file = &mut ctx.file;
    let p = format!("player{}", player.slot);
    let vision = &player.vision;

    if !vision.tiles.is_empty() {
        let (xsize, ysize) = (map.xsize, map.ysize);
        save_char_rows(
            file,
            xsize,
            ysize,
            |y| format!("{}.map_t{:04}", p, y),
            |index| {
                vision
                    .tiles
                    .get(&index)
                    .and_then(|m| ruleset.terrains.get(m.terrain))
                    .map(|t| t.identifier)
                    .unwrap_or(VISION_UNKNOWN)
            },
        )?;
        save_char_rows(
            file,
            xsize,
            ysize,
            |y| format!("{}.map_res{:04}", p, y),
            |index| {
                vision
                    .tiles
                    .get(&index)
                    .and_then(|m| m.resource)
                    .and_then(|r| ruleset.resources.get(r))
                    .map(|r| r.identifier)
                    .unwrap_or(RESOURCE_NONE)
            },
        )?;
        save_bit_rows(
            file,
            &format!("{}.map_e", p),
            xsize,
            ysize,
            ruleset.extras.len(),
            |index, bit| vision.tiles.get(&index).is_some_and(|m| m.extras.get(bit)),
        )?;
        save_token_rows(
            file,
            xsize,
            ysize,
            |y| format!("{}.map_owner{:04}", p, y),
            |index| {
                vision
                    .tiles
                    .get(&index)
                    .and_then(|m| m.owner)
                    .map(i64::from)
            },
        )?;
    }

    file.insert_int(&format!("{}.dc_count", p), vision.cities.len() as i64)?;
    for (i, city) in vision.cities.values().enumerate() {
        let base = format!("{}.dc{}", p, i);
        let coord = map.coord_of(city.tile);
        file.insert_int(&format!("{}.id", base), i64::from(city.id))?;
        file.insert_int(&format!("{}.x", base), i64::from(coord.x))?;
        file.insert_int(&format!("{}.y", base), i64::from(coord.y))?;
        file.insert_int(&format!("{}.owner", base), i64::from(city.owner))?;
        file.insert_str(&format!("{}.name", base), &city.name)?;
        file.insert_int(&format!("{}.size", base), i64::from(city.size))?;
        file.insert_bool(&format!("{}.walls", base), city.walls)?;
        file.insert_bool(&format!("{}.occupied", base), city.occupied)?;
        file.insert_bool(&format!("{}.capital", base), city.capital)?;
    }
    Ok(())
}
