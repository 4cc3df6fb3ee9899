//! The small fixed-field sections: savefile metadata and name tables, game
//! info, random state, script, scenario, settings, rule data, event cache
//! and map images.

use crate::capability::SAVEFILE_OPTIONS;
use crate::codec::{bools_to_string, string_to_bools, tile_at};
use crate::compat::CURRENT_SAVE_VERSION;
use crate::context::{LoadContext, NameTables, SaveContext};
use crate::error::LoadError;
use crate::secfile::{SectionFileError, Value};
use civstate_core::bitset::PlayerSet;
use civstate_core::events::{CachedEvent, EventTarget};
use civstate_core::mapimg::MapImageDef;
use civstate_core::random::{RandomState, RNG_TABLE_LEN};
use civstate_core::settings::{SettingValue, SettingsTable};
use civstate_core::unit::ActionId;

/// Words per `random.table%d` line.
const RNG_WORDS_PER_LINE: usize = 7;

// ============================================================================
// [savefile]
// ============================================================================

pub(crate) fn load_savefile_metadata(ctx: &mut LoadContext) -> Result<(), LoadError> {
    let reason = ctx.file.lookup_str_default("", "savefile.reason");
    let rulesetdir = ctx.file.lookup_str_default("", "savefile.rulesetdir");
    tracing::debug!(reason, rulesetdir, "savefile metadata");
    if !rulesetdir.is_empty() && rulesetdir != ctx.ruleset.name {
        ctx.diag.warn(format!(
            "Savegame was made with ruleset '{}', loading with '{}'",
            rulesetdir, ctx.ruleset.name
        ));
    }
    ctx.names = NameTables::load(&ctx.file, ctx.ruleset, &mut ctx.diag)?;
    Ok(())
}

pub(crate) fn save_savefile_metadata(ctx: &mut SaveContext) -> Result<(), SectionFileError> {
    let ruleset = ctx.ruleset;
    let file = &mut ctx.file;
    file.insert_int("savefile.version", CURRENT_SAVE_VERSION)?;
    file.insert_str("savefile.options", SAVEFILE_OPTIONS)?;
    file.insert_str("savefile.reason", ctx.options.reason.name())?;
    file.insert_str("savefile.rulesetdir", &ruleset.name)?;

    let improvements: Vec<&str> = ruleset.improvements.iter().map(|i| i.name.as_str()).collect();
    let techs: Vec<&str> = ruleset.techs.iter().map(|t| t.name.as_str()).collect();
    let extras: Vec<&str> = ruleset.extras.iter().map(|e| e.name.as_str()).collect();
    let actions: Vec<&str> = ActionId::ALL.iter().map(|a| a.name()).collect();
    let terrains: Vec<&str> = ruleset.terrains.iter().map(|t| t.name.as_str()).collect();
    file.insert_str_vec("savefile.improvement_vector", &improvements)?;
    file.insert_str_vec("savefile.technology_vector", &techs)?;
    file.insert_str_vec("savefile.extras_vector", &extras)?;
    file.insert_str_vec("savefile.specialists_vector", &ruleset.specialists)?;
    file.insert_str_vec("savefile.trait_vector", &ruleset.traits)?;
    file.insert_str_vec("savefile.action_vector", &actions)?;
    file.insert_str_vec("savefile.terrain_vector", &terrains)?;
    let idents: Vec<String> = ruleset
        .terrains
        .iter()
        .map(|t| t.identifier.to_string())
        .collect();
    file.insert_str_vec("savefile.terrain_ident", &idents)?;
    Ok(())
}

// ============================================================================
// [game]
// ============================================================================

pub(crate) fn load_game(ctx: &mut LoadContext) -> Result<(), LoadError> {
    let file = &ctx.file;
    let info = &mut ctx.state.info;
    info.server_id = file.lookup_str_default("", "game.server_id").to_string();
    info.turn = file.lookup_int_default(1, "game.turn") as i32;
    info.year = file.lookup_int_default(-4000, "game.year") as i32;
    info.phase = file.lookup_int_default(0, "game.phase") as i32;
    info.globalwarming = file.lookup_int_default(0, "game.globalwarming") as i32;
    info.heating = file.lookup_int_default(0, "game.heating") as i32;
    info.nuclearwinter = file.lookup_int_default(0, "game.nuclearwinter") as i32;
    info.cooling = file.lookup_int_default(0, "game.cooling") as i32;

    let advances = file.lookup_str_default("", "game.global_advances");
    match string_to_bools(advances) {
        Some(bits) => {
            for (index, _) in bits.iter().enumerate().filter(|(_, known)| **known) {
                if let Some(tech) = ctx.names.tech(index as i64) {
                    info.global_advances.set(tech);
                }
            }
        }
        None => ctx.diag.warn("Invalid global advances, recomputed from research"),
    }
    tracing::info!(turn = info.turn, year = info.year, "game info loaded");
    Ok(())
}

pub(crate) fn save_game(ctx: &mut SaveContext) -> Result<(), SectionFileError> {
    let info = &ctx.state.info;
    let file = &mut ctx.file;
    file.insert_str("game.server_id", &info.server_id)?;
    file.insert_int("game.turn", i64::from(info.turn))?;
    file.insert_int("game.year", i64::from(info.year))?;
    file.insert_int("game.phase", i64::from(info.phase))?;
    file.insert_int("game.globalwarming", i64::from(info.globalwarming))?;
    file.insert_int("game.heating", i64::from(info.heating))?;
    file.insert_int("game.nuclearwinter", i64::from(info.nuclearwinter))?;
    file.insert_int("game.cooling", i64::from(info.cooling))?;
    file.insert_str(
        "game.global_advances",
        &bools_to_string((0..ctx.ruleset.techs.len()).map(|t| info.global_advances.get(t))),
    )?;
    Ok(())
}

// ============================================================================
// [random]
// ============================================================================

fn read_random(ctx: &LoadContext) -> Result<RandomState, String> {
    let file = &ctx.file;
    let index = |key: &str| {
        file.lookup_int(&format!("random.index_{}", key))
            .ok()
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| format!("index {} missing", key))
    };
    let mut state = RandomState {
        j: index("J")?,
        k: index("K")?,
        x: index("X")?,
        v: [0; RNG_TABLE_LEN],
        is_init: true,
    };
    for line in 0..RNG_TABLE_LEN / RNG_WORDS_PER_LINE {
        let text = file
            .lookup_str(&format!("random.table{}", line))
            .map_err(|e| e.to_string())?;
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() != RNG_WORDS_PER_LINE {
            return Err(format!("table line {} has {} words", line, words.len()));
        }
        for (i, word) in words.iter().enumerate() {
            state.v[line * RNG_WORDS_PER_LINE + i] = u32::from_str_radix(word, 16)
                .map_err(|_| format!("table line {} has invalid word '{}'", line, word))?;
        }
    }
    if !state.is_valid() {
        return Err("indices out of range".to_string());
    }
    Ok(state)
}

pub(crate) fn load_random(ctx: &mut LoadContext) -> Result<(), LoadError> {
    let saved = ctx.file.lookup_bool_default(false, "random.saved");
    let restored = if saved {
        match read_random(ctx) {
            Ok(state) => Some(state),
            Err(reason) => {
                ctx.diag
                    .warn(format!("Random state is invalid ({}), reseeding", reason));
                None
            }
        }
    } else {
        None
    };
    ctx.state.random = match restored {
        Some(state) => state,
        None => {
            let seed: u32 = rand::random();
            tracing::info!(seed, "no saved random state, using a fresh seed");
            RandomState::seeded(seed)
        }
    };
    Ok(())
}

pub(crate) fn save_random(ctx: &mut SaveContext) -> Result<(), SectionFileError> {
    let state = ctx.state;
    let keep = state.random.is_init && (!ctx.options.scenario || state.scenario.save_random);
    let file = &mut ctx.file;
    file.insert_bool("random.saved", keep)?;
    if !keep {
        return Ok(());
    }
    let random = &state.random;
    file.insert_int("random.index_J", random.j as i64)?;
    file.insert_int("random.index_K", random.k as i64)?;
    file.insert_int("random.index_X", random.x as i64)?;
    for (line, words) in random.v.chunks(RNG_WORDS_PER_LINE).enumerate() {
        let text: Vec<String> = words.iter().map(|w| format!("{:08x}", w)).collect();
        file.insert_str(&format!("random.table{}", line), &text.join(" "))?;
    }
    Ok(())
}

// ============================================================================
// [script] and [scenario]
// ============================================================================

pub(crate) fn load_script(ctx: &mut LoadContext) -> Result<(), LoadError> {
    ctx.state.script_state = ctx.file.lookup_str_default("", "script.vars").to_string();
    Ok(())
}

pub(crate) fn save_script(ctx: &mut SaveContext) -> Result<(), SectionFileError> {
    ctx.file.insert_str("script.vars", &ctx.state.script_state)
}

pub(crate) fn load_scenario(ctx: &mut LoadContext) -> Result<(), LoadError> {
    let file = &ctx.file;
    let scenario = &mut ctx.state.scenario;
    scenario.is_scenario = file.lookup_bool_default(false, "scenario.is_scenario");
    if !scenario.is_scenario {
        return Ok(());
    }
    scenario.name = file.lookup_str_default("", "scenario.name").to_string();
    scenario.authors = file.lookup_str_default("", "scenario.authors").to_string();
    scenario.description = file
        .lookup_str_default("", "scenario.description")
        .to_string();
    scenario.save_random = file.lookup_bool_default(false, "scenario.save_random");
    scenario.players = file.lookup_bool_default(true, "scenario.players");
    scenario.startpos_nations = file.lookup_bool_default(false, "scenario.startpos_nations");
    scenario.prevent_new_cities = file.lookup_bool_default(false, "scenario.prevent_new_cities");
    scenario.lake_flooding = file.lookup_bool_default(true, "scenario.lake_flooding");
    scenario.ruleset_locked = file.lookup_bool_default(false, "scenario.ruleset_locked");
    tracing::info!(name = %scenario.name, "loading scenario");
    Ok(())
}

pub(crate) fn save_scenario(ctx: &mut SaveContext) -> Result<(), SectionFileError> {
    let scenario = &ctx.state.scenario;
    let file = &mut ctx.file;
    file.insert_bool("scenario.is_scenario", scenario.is_scenario)?;
    if !scenario.is_scenario {
        return Ok(());
    }
    file.insert_str("scenario.name", &scenario.name)?;
    file.insert_str("scenario.authors", &scenario.authors)?;
    file.insert_str("scenario.description", &scenario.description)?;
    file.insert_bool("scenario.save_random", scenario.save_random)?;
    file.insert_bool("scenario.players", scenario.players)?;
    file.insert_bool("scenario.startpos_nations", scenario.startpos_nations)?;
    file.insert_bool("scenario.prevent_new_cities", scenario.prevent_new_cities)?;
    file.insert_bool("scenario.lake_flooding", scenario.lake_flooding)?;
    file.insert_bool("scenario.ruleset_locked", scenario.ruleset_locked)?;
    Ok(())
}

// ============================================================================
// [settings]
// ============================================================================

pub(crate) fn load_settings(ctx: &mut LoadContext) -> Result<(), LoadError> {
    let Some(section) = ctx.file.section("settings") else {
        tracing::debug!("no settings section, keeping defaults");
        return Ok(());
    };
    for (name, value) in section.entries() {
        if SettingsTable::is_retired(name) {
            tracing::debug!(name, "skipping retired setting");
            continue;
        }
        let value = match value {
            Value::Int(n) => SettingValue::Int(*n),
            Value::Bool(b) => SettingValue::Bool(*b),
            Value::Str(s) => SettingValue::Str(s.clone()),
        };
        if let Err(err) = ctx.state.settings.set(name, value) {
            ctx.diag.warn(format!("{}, keeping the default", err));
        }
    }
    Ok(())
}

pub(crate) fn save_settings(ctx: &mut SaveContext) -> Result<(), SectionFileError> {
    for (name, setting) in ctx.state.settings.iter() {
        let path = format!("settings.{}", name);
        match &setting.value {
            SettingValue::Bool(b) => ctx.file.insert_bool(&path, *b)?,
            SettingValue::Int(n) => ctx.file.insert_int(&path, *n)?,
            SettingValue::Str(s) => ctx.file.insert_str(&path, s)?,
        }
    }
    Ok(())
}

// ============================================================================
// [ruledata]
// ============================================================================

pub(crate) fn load_ruledata(ctx: &mut LoadContext) -> Result<(), LoadError> {
    let mut i = 0;
    while let Ok(name) = ctx
        .file
        .lookup_str(&format!("ruledata.government{}.name", i))
    {
        let changes = ctx
            .file
            .lookup_int_default(0, &format!("ruledata.government{}.changes", i));
        match ctx.ruleset.government_by_name(name) {
            Some(gov) => {
                ctx.state
                    .info
                    .government_changes
                    .insert(gov, changes.max(0) as u32);
            }
            None => ctx
                .diag
                .warn(format!("Government '{}' is not in the current ruleset", name)),
        }
        i += 1;
    }
    Ok(())
}

pub(crate) fn save_ruledata(ctx: &mut SaveContext) -> Result<(), SectionFileError> {
    let ruleset = ctx.ruleset;
    let changes = &ctx.state.info.government_changes;
    for (i, (gov, count)) in changes.iter().enumerate() {
        let name = ruleset.governments.get(*gov).map(String::as_str).unwrap_or("");
        ctx.file
            .insert_str(&format!("ruledata.government{}.name", i), name)?;
        ctx.file
            .insert_int(&format!("ruledata.government{}.changes", i), i64::from(*count))?;
    }
    Ok(())
}

// ============================================================================
// [event_cache]
// ============================================================================

fn parse_target(text: &str) -> Option<EventTarget> {
    match text {
        "all" => Some(EventTarget::All),
        "observers" => Some(EventTarget::GlobalObservers),
        _ => {
            let list = text.strip_prefix("players:")?;
            let mut set = PlayerSet::default();
            for slot in list.split(',').filter(|s| !s.is_empty()) {
                set.insert(slot.trim().parse().ok()?);
            }
            Some(EventTarget::Players(set))
        }
    }
}

fn format_target(target: &EventTarget) -> String {
    match target {
        EventTarget::All => "all".to_string(),
        EventTarget::GlobalObservers => "observers".to_string(),
        EventTarget::Players(set) => {
            let slots: Vec<String> = set.iter().map(|s| s.to_string()).collect();
            format!("players:{}", slots.join(","))
        }
    }
}

pub(crate) fn load_event_cache(ctx: &mut LoadContext) -> Result<(), LoadError> {
    let count = ctx.file.lookup_int_default(0, "event_cache.count");
    for i in 0..count.max(0) {
        let base = format!("event_cache.e{}", i);
        let file = &ctx.file;
        let target_text = file.lookup_str_default("", &format!("{}.target", base));
        let Some(target) = parse_target(target_text) else {
            ctx.diag.warn(format!(
                "Cached event {} has invalid target '{}', dropped",
                i, target_text
            ));
            continue;
        };
        let x = file.lookup_int_default(-1, &format!("{}.x", base));
        let y = file.lookup_int_default(-1, &format!("{}.y", base));
        let tile = if x < 0 || y < 0 {
            None
        } else {
            let tile = tile_at(&ctx.state.map, x, y);
            if tile.is_none() {
                ctx.diag
                    .warn(format!("Event '{}' is off the map at ({}, {})", base, x, y));
            }
            tile
        };
        ctx.state.event_cache.push(CachedEvent {
            turn: file.lookup_int_default(0, &format!("{}.turn", base)) as i32,
            timestamp: file.lookup_int_default(0, &format!("{}.timestamp", base)),
            event: file
                .lookup_str_default("", &format!("{}.event", base))
                .to_string(),
            tile,
            message: file
                .lookup_str_default("", &format!("{}.message", base))
                .to_string(),
            target,
        });
    }
    Ok(())
}

pub(crate) fn save_event_cache(ctx: &mut SaveContext) -> Result<(), SectionFileError> {
    let state = ctx.state;
    let file = &mut ctx.file;
    file.insert_int("event_cache.count", state.event_cache.len() as i64)?;
    for (i, event) in state.event_cache.iter().enumerate() {
        let base = format!("event_cache.e{}", i);
        let (x, y) = match event.tile {
            Some(tile) => {
                let coord = state.map.coord_of(tile);
                (i64::from(coord.x), i64::from(coord.y))
            }
            None => (-1, -1),
        };
        file.insert_int(&format!("{}.turn", base), i64::from(event.turn))?;
        file.insert_int(&format!("{}.timestamp", base), event.timestamp)?;
        file.insert_str(&format!("{}.event", base), &event.event)?;
        file.insert_int(&format!("{}.x", base), x)?;
        file.insert_int(&format!("{}.y", base), y)?;
        file.insert_str(&format!("{}.target", base), &format_target(&event.target))?;
        file.insert_str(&format!("{}.message", base), &event.message)?;
    }
    Ok(())
}

// ============================================================================
// [mapimg]
// ============================================================================

pub(crate) fn load_map_images(ctx: &mut LoadContext) -> Result<(), LoadError> {
    let count = ctx.file.lookup_int_default(0, "mapimg.count");
    for i in 0..count.max(0) {
        let def = ctx
            .file
            .lookup_str_default("", &format!("mapimg.mapdef{}", i));
        match MapImageDef::parse(def) {
            Ok(parsed) => ctx.state.map_images.push(parsed),
            Err(err) => ctx
                .diag
                .warn(format!("Map image definition {} dropped: {}", i, err)),
        }
    }
    Ok(())
}

pub(crate) fn save_map_images(ctx: &mut SaveContext) -> Result<(), SectionFileError> {
    let images = &ctx.state.map_images;
    ctx.file.insert_int("mapimg.count", images.len() as i64)?;
    for (i, def) in images.iter().enumerate() {
        ctx.file
            .insert_str(&format!("mapimg.mapdef{}", i), &def.to_string())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoadOptions, SaveOptions};
    use crate::secfile::SectionFile;
    use civstate_core::game_state::GameState;
    use civstate_core::ruleset::Ruleset;

    #[test]
    fn test_event_targets() {
        assert_eq!(parse_target("all"), Some(EventTarget::All));
        assert_eq!(parse_target("observers"), Some(EventTarget::GlobalObservers));
        let Some(EventTarget::Players(set)) = parse_target("players:0,3") else {
            panic!("expected a player list");
        };
        assert!(set.contains(0) && set.contains(3) && !set.contains(1));
        assert_eq!(format_target(&EventTarget::Players(set)), "players:0,3");
        assert_eq!(parse_target("players:x"), None);
        assert_eq!(parse_target("everyone"), None);
    }

    #[test]
    fn test_random_state_survives() {
        let ruleset = Ruleset::classic();
        let mut state = GameState::new(&ruleset);
        state.random = RandomState::seeded(1234);
        let save_options = SaveOptions::default();
        let mut save = SaveContext::new(&ruleset, &state, &save_options);
        save_random(&mut save).unwrap();
        assert_eq!(save.file.lookup_str("random.table0").unwrap().len(), 7 * 9 - 1);

        let options = LoadOptions::default();
        let mut ctx = LoadContext::new(save.file, &ruleset, &options);
        load_random(&mut ctx).unwrap();
        assert_eq!(ctx.state.random, state.random);
    }

    #[test]
    fn test_broken_random_state_reseeds() {
        let ruleset = Ruleset::classic();
        let options = LoadOptions::default();
        let mut file = SectionFile::new();
        file.insert_bool("random.saved", true).unwrap();
        file.insert_int("random.index_J", 3).unwrap();
        let mut ctx = LoadContext::new(file, &ruleset, &options);
        load_random(&mut ctx).unwrap();
        assert!(ctx.state.random.is_init);
        assert!(ctx.diag.mentions("reseeding"));
    }

    #[test]
    fn test_scenario_save_drops_random_state() {
        let ruleset = Ruleset::classic();
        let mut state = GameState::new(&ruleset);
        state.random = RandomState::seeded(7);
        let options = SaveOptions {
            scenario: true,
            ..SaveOptions::default()
        };
        let mut save = SaveContext::new(&ruleset, &state, &options);
        save_random(&mut save).unwrap();
        assert!(!save.file.lookup_bool("random.saved").unwrap());
        assert!(!save.file.contains("random.table0"));
    }

    #[test]
    fn test_settings_load_with_warnings() {
        let ruleset = Ruleset::classic();
        let options = LoadOptions::default();
        let mut file = SectionFile::new();
        file.insert_int("settings.aifill", 7).unwrap();
        file.insert_int("settings.diplcost", 10).unwrap();
        file.insert_str("settings.fogofwar", "yes").unwrap();
        file.insert_bool("settings.nosuchsetting", true).unwrap();
        let mut ctx = LoadContext::new(file, &ruleset, &options);
        load_settings(&mut ctx).unwrap();

        assert_eq!(ctx.state.settings.get_int("aifill"), Some(7));
        assert_eq!(ctx.state.settings.get_bool("fogofwar"), Some(true));
        assert!(ctx.diag.mentions("nosuchsetting"));
        assert!(ctx.diag.mentions("fogofwar"));
        assert!(!ctx.diag.mentions("diplcost"));
    }

    #[test]
    fn test_ruledata_government_changes() {
        let ruleset = Ruleset::classic();
        let options = LoadOptions::default();
        let mut file = SectionFile::new();
        file.insert_str("ruledata.government0.name", "Monarchy").unwrap();
        file.insert_int("ruledata.government0.changes", 3).unwrap();
        file.insert_str("ruledata.government1.name", "Theocracy").unwrap();
        let mut ctx = LoadContext::new(file, &ruleset, &options);
        load_ruledata(&mut ctx).unwrap();

        let monarchy = ruleset.government_by_name("Monarchy").unwrap();
        assert_eq!(ctx.state.info.government_changes.get(&monarchy), Some(&3));
        assert!(ctx.diag.mentions("Theocracy"));
    }
}
