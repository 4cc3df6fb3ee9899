//! Load orchestration.
//!
//! A load runs a fixed sequence of phases against a fresh [`LoadContext`].
//! The first failing phase stops the sequence, and the live game is reset
//! to an empty state. On success the new state replaces the live one in a
//! single assignment, so a half-built state is never visible.

use crate::capability::{has_capabilities, REQUIRED_OPTIONS};
use crate::compat::{read_savefile_version, MigrationRegistry, CURRENT_SAVE_VERSION};
use crate::config::LoadOptions;
use crate::context::LoadContext;
use crate::error::{Diagnostic, LoadError};
use crate::secfile::SectionFile;
use crate::{game_codec, map_codec, player_codec, research_codec, sanity};
use civstate_core::game_state::GameContext;
use std::path::Path;

/// Load phases, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadPhase {
    ReadVersion,
    RunCompatibilityMigrations,
    LoadSavefileMetadata,
    LoadGame,
    LoadRandom,
    LoadScript,
    LoadScenario,
    LoadSettings,
    LoadRuleData,
    LoadPlayersBasic,
    LoadMap,
    LoadPlayersFull,
    LoadResearch,
    LoadEventCache,
    LoadMapImages,
    SanityCheckAndRepair,
}

impl LoadPhase {
    pub const ALL: [LoadPhase; 16] = [
        LoadPhase::ReadVersion,
        LoadPhase::RunCompatibilityMigrations,
        LoadPhase::LoadSavefileMetadata,
        LoadPhase::LoadGame,
        LoadPhase::LoadRandom,
        LoadPhase::LoadScript,
        LoadPhase::LoadScenario,
        LoadPhase::LoadSettings,
        LoadPhase::LoadRuleData,
        LoadPhase::LoadPlayersBasic,
        LoadPhase::LoadMap,
        LoadPhase::LoadPlayersFull,
        LoadPhase::LoadResearch,
        LoadPhase::LoadEventCache,
        LoadPhase::LoadMapImages,
        LoadPhase::SanityCheckAndRepair,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            LoadPhase::ReadVersion => "ReadVersion",
            LoadPhase::RunCompatibilityMigrations => "RunCompatibilityMigrations",
            LoadPhase::LoadSavefileMetadata => "LoadSavefileMetadata",
            LoadPhase::LoadGame => "LoadGame",
            LoadPhase::LoadRandom => "LoadRandom",
            LoadPhase::LoadScript => "LoadScript",
            LoadPhase::LoadScenario => "LoadScenario",
            LoadPhase::LoadSettings => "LoadSettings",
            LoadPhase::LoadRuleData => "LoadRuleData",
            LoadPhase::LoadPlayersBasic => "LoadPlayersBasic",
            LoadPhase::LoadMap => "LoadMap",
            LoadPhase::LoadPlayersFull => "LoadPlayersFull",
            LoadPhase::LoadResearch => "LoadResearch",
            LoadPhase::LoadEventCache => "LoadEventCache",
            LoadPhase::LoadMapImages => "LoadMapImages",
            LoadPhase::SanityCheckAndRepair => "SanityCheckAndRepair",
        }
    }
}

impl std::fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a successful load.
#[derive(Clone, Debug, Default)]
pub struct LoadReport {
    /// Version found on disk, before migrations.
    pub original_version: i64,
    /// Capability string of the file.
    pub capabilities: String,
    /// Descriptions of the migrations applied, oldest first.
    pub migrations: Vec<&'static str>,
    /// Every problem that was repaired.
    pub diagnostics: Vec<Diagnostic>,
}

impl LoadReport {
    /// Whether the file loaded without any repair.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

fn read_version(ctx: &mut LoadContext) -> Result<(), LoadError> {
    ctx.version = read_savefile_version(&ctx.file)?;
    ctx.capabilities = ctx
        .file
        .lookup_str_default("", "savefile.options")
        .to_string();
    if !has_capabilities(REQUIRED_OPTIONS, &ctx.capabilities) {
        return Err(LoadError::Capability {
            required: REQUIRED_OPTIONS.to_string(),
            found: ctx.capabilities.clone(),
        });
    }
    if ctx.version > CURRENT_SAVE_VERSION {
        if !ctx.options.allow_newer_versions {
            return Err(LoadError::UnsupportedVersion {
                found: ctx.version,
                supported: CURRENT_SAVE_VERSION,
            });
        }
        ctx.diag.warn(format!(
            "Savefile version {} is newer than {}, loading anyway",
            ctx.version, CURRENT_SAVE_VERSION
        ));
    }
    tracing::info!(version = ctx.version, capabilities = %ctx.capabilities, "savefile version");
    Ok(())
}

fn run_migrations(ctx: &mut LoadContext) -> Result<(), LoadError> {
    let report = MigrationRegistry::standard().migrate(&mut ctx.file, &mut ctx.diag, ctx.version)?;
    if !report.steps_applied.is_empty() {
        tracing::info!(
            from = report.original_version,
            to = report.final_version,
            steps = report.steps_applied.len(),
            "savefile upgraded"
        );
    }
    ctx.migrations = report.steps_applied;
    Ok(())
}

fn run_phase(ctx: &mut LoadContext, phase: LoadPhase) -> Result<(), LoadError> {
    match phase {
        LoadPhase::ReadVersion => read_version(ctx),
        LoadPhase::RunCompatibilityMigrations => run_migrations(ctx),
        LoadPhase::LoadSavefileMetadata => game_codec::load_savefile_metadata(ctx),
        LoadPhase::LoadGame => game_codec::load_game(ctx),
        LoadPhase::LoadRandom => game_codec::load_random(ctx),
        LoadPhase::LoadScript => game_codec::load_script(ctx),
        LoadPhase::LoadScenario => game_codec::load_scenario(ctx),
        LoadPhase::LoadSettings => game_codec::load_settings(ctx),
        LoadPhase::LoadRuleData => game_codec::load_ruledata(ctx),
        LoadPhase::LoadPlayersBasic => player_codec::load_players_basic(ctx),
        LoadPhase::LoadMap => map_codec::load_map(ctx),
        LoadPhase::LoadPlayersFull => player_codec::load_players_full(ctx),
        LoadPhase::LoadResearch => research_codec::load_research(ctx),
        LoadPhase::LoadEventCache => game_codec::load_event_cache(ctx),
        LoadPhase::LoadMapImages => game_codec::load_map_images(ctx),
        LoadPhase::SanityCheckAndRepair => {
            if ctx.options.run_sanity_checks {
                sanity::sanity_check(&mut ctx.state, ctx.ruleset, &mut ctx.diag);
            }
            Ok(())
        }
    }
}

fn run_phases(ctx: &mut LoadContext) -> Result<(), LoadError> {
    for phase in LoadPhase::ALL {
        let span = tracing::info_span!("load_phase", phase = phase.name());
        let _guard = span.enter();
        ctx.diag.set_phase(phase.name());
        run_phase(ctx, phase).map_err(|source| LoadError::Phase {
            phase: phase.name(),
            source: Box::new(source),
        })?;
    }
    Ok(())
}

fn fail(game: &mut GameContext, err: LoadError) -> LoadError {
    tracing::error!(error = %err, "Failure loading savegame!");
    game.reset();
    err
}

/// Load a parsed section file into `game`, replacing its state.
///
/// On failure the game is reset to an empty state.
pub fn load_section_file(
    game: &mut GameContext,
    file: SectionFile,
    options: &LoadOptions,
) -> Result<LoadReport, LoadError> {
    let mut ctx = LoadContext::new(file, &game.ruleset, options);
    match run_phases(&mut ctx) {
        Ok(()) => {
            let report = LoadReport {
                original_version: ctx.version,
                capabilities: ctx.capabilities,
                migrations: ctx.migrations,
                diagnostics: ctx.diag.into_vec(),
            };
            tracing::info!(
                players = ctx.state.players.len(),
                cities = ctx.state.cities.len(),
                units = ctx.state.units.len(),
                warnings = report.diagnostics.len(),
                "savegame loaded"
            );
            game.state = ctx.state;
            Ok(report)
        }
        Err(err) => Err(fail(game, err)),
    }
}

/// Load a savegame from text.
pub fn load_from_str(
    game: &mut GameContext,
    text: &str,
    options: &LoadOptions,
) -> Result<LoadReport, LoadError> {
    match SectionFile::parse(text) {
        Ok(file) => load_section_file(game, file, options),
        Err(err) => Err(fail(game, err.into())),
    }
}

/// Load a savegame file.
pub fn load_game(
    game: &mut GameContext,
    path: &Path,
    options: &LoadOptions,
) -> Result<LoadReport, LoadError> {
    tracing::info!(path = %path.display(), "loading savegame");
    match SectionFile::load(path) {
        Ok(file) => load_section_file(game, file, options),
        Err(err) => Err(fail(game, err.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civstate_core::ruleset::Ruleset;

    #[test]
    fn test_phase_order_is_fixed() {
        assert_eq!(LoadPhase::ALL[0], LoadPhase::ReadVersion);
        assert_eq!(LoadPhase::ALL[15], LoadPhase::SanityCheckAndRepair);
        let map = LoadPhase::ALL.iter().position(|p| *p == LoadPhase::LoadMap);
        let basic = LoadPhase::ALL
            .iter()
            .position(|p| *p == LoadPhase::LoadPlayersBasic);
        let settings = LoadPhase::ALL
            .iter()
            .position(|p| *p == LoadPhase::LoadSettings);
        assert!(settings < basic && basic < map);
    }

    #[test]
    fn test_missing_version_fails_in_first_phase() {
        let mut game = GameContext::new(Ruleset::classic());
        game.state.info.turn = 42;
        let err = load_from_str(&mut game, "[game]\nturn = 3\n", &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Phase {
                phase: "ReadVersion",
                ..
            }
        ));
        assert!(matches!(err.root(), LoadError::MissingVersion));
        assert_eq!(game.state.info.turn, 1);
    }

    #[test]
    fn test_missing_capability_is_fatal() {
        let mut game = GameContext::new(Ruleset::classic());
        let text = "[savefile]\nversion = 36\noptions = \"+version2\"\n";
        let err = load_from_str(&mut game, text, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err.root(), LoadError::Capability { .. }));
    }

    #[test]
    fn test_parse_error_resets_game() {
        let mut game = GameContext::new(Ruleset::classic());
        game.state.script_state = "dirty".to_string();
        let err = load_from_str(&mut game, "not a section file", &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::SectionFile(_)));
        assert!(game.state.script_state.is_empty());
    }
}
