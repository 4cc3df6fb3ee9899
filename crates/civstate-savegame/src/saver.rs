//! Save orchestration. Sections are written in the same order the loader
//! reads them, and the file always carries the current version.

use crate::atomic_write::atomic_write;
use crate::config::SaveOptions;
use crate::context::SaveContext;
use crate::error::SaveError;
use crate::secfile::{SectionFile, SectionFileError};
use crate::{game_codec, map_codec, player_codec, research_codec};
use civstate_core::game_state::GameContext;
use std::path::Path;

fn write_section<'a, F>(
    ctx: &mut SaveContext<'a>,
    section: &'static str,
    step: F,
) -> Result<(), SectionFileError>
where
    F: FnOnce(&mut SaveContext<'a>) -> Result<(), SectionFileError>,
{
    let span = tracing::debug_span!("save_section", section);
    let _guard = span.enter();
    step(ctx)
}

fn write_sections(ctx: &mut SaveContext) -> Result<(), SectionFileError> {
    write_section(ctx, "savefile", game_codec::save_savefile_metadata)?;
    write_section(ctx, "game", game_codec::save_game)?;
    write_section(ctx, "random", game_codec::save_random)?;
    write_section(ctx, "script", game_codec::save_script)?;
    write_section(ctx, "scenario", game_codec::save_scenario)?;
    write_section(ctx, "settings", game_codec::save_settings)?;
    write_section(ctx, "ruledata", game_codec::save_ruledata)?;
    write_section(ctx, "players", player_codec::save_players)?;
    write_section(ctx, "map", map_codec::save_map)?;
    write_section(ctx, "research", research_codec::save_research)?;
    // Scenario saves carry no event history.
    if !ctx.options.scenario {
        write_section(ctx, "event_cache", game_codec::save_event_cache)?;
    }
    write_section(ctx, "mapimg", game_codec::save_map_images)
}

/// Serialize `game` into a section file.
pub fn save_section_file(
    game: &GameContext,
    options: &SaveOptions,
) -> Result<SectionFile, SaveError> {
    let state = &game.state;
    if state.map.tile_count() == 0 {
        return Err(SaveError::InvalidState("the game has no map".to_string()));
    }

    let mut ctx = SaveContext::new(&game.ruleset, state, options);
    write_sections(&mut ctx)?;
    tracing::info!(
        reason = options.reason.name(),
        scenario = options.scenario,
        sections = ctx.file.sections().count(),
        "savegame serialized"
    );
    Ok(ctx.file)
}

/// Serialize `game` to text.
pub fn save_to_string(game: &GameContext, options: &SaveOptions) -> Result<String, SaveError> {
    Ok(save_section_file(game, options)?.to_string())
}

/// Write `game` to `path`, replacing any previous file atomically.
pub fn save_game(game: &GameContext, path: &Path, options: &SaveOptions) -> Result<(), SaveError> {
    let text = save_to_string(game, options)?;
    atomic_write(path, text.as_bytes())?;
    tracing::info!(path = %path.display(), turn = game.state.info.turn, "savegame written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use civstate_core::map::Map;
    use civstate_core::ruleset::Ruleset;

    fn game() -> GameContext {
        let mut game = GameContext::new(Ruleset::classic());
        game.state.map = Map::new(2, 2, 7, game.ruleset.extras.len());
        game
    }

    #[test]
    fn test_empty_map_is_rejected() {
        let game = GameContext::new(Ruleset::classic());
        let err = save_to_string(&game, &SaveOptions::default()).unwrap_err();
        assert!(matches!(err, SaveError::InvalidState(_)));
    }

    #[test]
    fn test_sections_follow_load_order() {
        let file = save_section_file(&game(), &SaveOptions::default()).unwrap();
        let names: Vec<&str> = file.section_names().collect();
        let pos = |name: &str| names.iter().position(|n| *n == name).unwrap();
        assert_eq!(names[0], "savefile");
        assert!(pos("game") < pos("players"));
        assert!(pos("players") < pos("map"));
        assert!(pos("map") < pos("research"));
        assert!(file.contains("event_cache.count"));
    }

    #[test]
    fn test_scenario_omits_event_cache() {
        let options = SaveOptions {
            scenario: true,
            ..SaveOptions::default()
        };
        let file = save_section_file(&game(), &options).unwrap();
        assert!(!file.has_section("event_cache"));
        assert!(file.has_section("mapimg"));
    }
}
