//! Civstate savegame tool.
//!
//! - `civstate check <file>` - load a savegame and list every repair
//! - `civstate upgrade <in> <out>` - load through all migrations and save
//!   at the current version
//! - `civstate info <file>` - summarize a savegame

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use civstate_core::{GameContext, Ruleset};
use civstate_savegame::{
    load_game, save_game, LoadOptions, LoadReport, SaveOptions, SaveReason, CURRENT_SAVE_VERSION,
};

#[derive(Parser)]
#[command(name = "civstate")]
#[command(about = "Inspect and upgrade Civstate savegames", version)]
struct Cli {
    /// JSON file with load options
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON ruleset to load with instead of the built-in classic rules
    #[arg(short, long, global = true)]
    ruleset: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a savegame and report every repair
    Check {
        file: PathBuf,

        /// Fail if anything had to be repaired
        #[arg(long)]
        strict: bool,
    },

    /// Rewrite a savegame at the current format version
    Upgrade { input: PathBuf, output: PathBuf },

    /// Print a summary of a savegame
    Info { file: PathBuf },
}

fn read_options(path: Option<&Path>) -> Result<LoadOptions> {
    let Some(path) = path else {
        return Ok(LoadOptions::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn read_ruleset(path: Option<&Path>) -> Result<Ruleset> {
    let Some(path) = path else {
        return Ok(Ruleset::classic());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read ruleset {}", path.display()))?;
    Ruleset::from_json(&text).with_context(|| format!("invalid ruleset {}", path.display()))
}

fn load(game: &mut GameContext, path: &Path, options: &LoadOptions) -> Result<LoadReport> {
    load_game(game, path, options).with_context(|| format!("cannot load {}", path.display()))
}

fn print_diagnostics(report: &LoadReport) {
    for step in &report.migrations {
        println!("migrated: {}", step);
    }
    for diagnostic in &report.diagnostics {
        println!("warning: {}", diagnostic);
    }
}

fn check(game: &mut GameContext, file: &Path, options: &LoadOptions, strict: bool) -> Result<()> {
    let report = load(game, file, options)?;
    print_diagnostics(&report);
    println!(
        "{}: version {}, {} repairs",
        file.display(),
        report.original_version,
        report.diagnostics.len()
    );
    if strict && !report.is_clean() {
        anyhow::bail!("{} needed {} repairs", file.display(), report.diagnostics.len());
    }
    Ok(())
}

fn upgrade(game: &mut GameContext, input: &Path, output: &Path, options: &LoadOptions) -> Result<()> {
    let report = load(game, input, options)?;
    print_diagnostics(&report);
    let save_options = SaveOptions {
        reason: SaveReason::UserRequest,
        scenario: game.state.scenario.is_scenario,
    };
    save_game(game, output, &save_options)
        .with_context(|| format!("cannot save {}", output.display()))?;
    println!(
        "{} (version {}) -> {} (version {})",
        input.display(),
        report.original_version,
        output.display(),
        CURRENT_SAVE_VERSION
    );
    Ok(())
}

fn info(game: &mut GameContext, file: &Path, options: &LoadOptions) -> Result<()> {
    let report = load(game, file, options)?;
    let state = &game.state;
    println!("file:         {}", file.display());
    println!("version:      {}", report.original_version);
    println!("capabilities: {}", report.capabilities);
    println!("ruleset:      {}", game.ruleset.name);
    println!("turn:         {} (year {})", state.info.turn, state.info.year);
    if state.scenario.is_scenario {
        println!("scenario:     {}", state.scenario.name);
    }
    println!(
        "map:          {}x{}, {} continents",
        state.map.xsize, state.map.ysize, state.map.num_continents
    );
    println!("players:      {}", state.players.len());
    for player in state.players.values() {
        println!(
            "  {:>3} {:<20} {:<14} cities {:>3}  units {:>3}  score {}",
            player.slot,
            player.name,
            player.nation.as_deref().unwrap_or("-"),
            player.cities.len(),
            player.units.len(),
            player.score.total
        );
    }
    println!("cities:       {}", state.cities.len());
    println!("units:        {}", state.units.len());
    println!("repairs:      {}", report.diagnostics.len());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("civstate=info"))
    };
    fmt().with_env_filter(filter).with_target(false).init();

    let options = read_options(cli.config.as_deref())?;
    let mut game = GameContext::new(read_ruleset(cli.ruleset.as_deref())?);
    tracing::debug!(ruleset = %game.ruleset.name, "ruleset ready");

    match cli.command {
        Commands::Check { file, strict } => check(&mut game, &file, &options, strict),
        Commands::Upgrade { input, output } => upgrade(&mut game, &input, &output, &options),
        Commands::Info { file } => info(&mut game, &file, &options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civstate_core::Map;

    fn write_game(dir: &Path) -> PathBuf {
        let mut game = GameContext::new(Ruleset::classic());
        game.state.map = Map::new(3, 3, 7, game.ruleset.extras.len());
        let path = dir.join("game.sav");
        save_game(&game, &path, &SaveOptions::default()).unwrap();
        path
    }

    #[test]
    fn test_options_default_without_config() {
        assert_eq!(read_options(None).unwrap(), LoadOptions::default());
        assert_eq!(read_ruleset(None).unwrap().name, "classic");
    }

    #[test]
    fn test_options_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("load.json");
        std::fs::write(&path, r#"{ "run_sanity_checks": false }"#).unwrap();
        let options = read_options(Some(&path)).unwrap();
        assert!(!options.run_sanity_checks);
        assert!(!options.allow_newer_versions);
    }

    #[test]
    fn test_upgrade_writes_current_version() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_game(dir.path());
        let output = dir.path().join("out.sav");
        let mut game = GameContext::new(Ruleset::classic());
        upgrade(&mut game, &input, &output, &LoadOptions::default()).unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.contains(&format!("version = {}", CURRENT_SAVE_VERSION)));
        assert!(text.contains("reason = \"User request\""));
    }

    #[test]
    fn test_check_fails_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut game = GameContext::new(Ruleset::classic());
        let missing = dir.path().join("nope.sav");
        assert!(check(&mut game, &missing, &LoadOptions::default(), false).is_err());
    }
}
