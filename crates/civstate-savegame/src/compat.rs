//! Version checkpoints and the migration pipeline.
//!
//! Every checkpoint is a step that rewrites the raw section file of an older
//! savegame into the shape the next checkpoint expects. Steps run in
//! ascending version order, each on the output of the previous one, for
//! every checkpoint newer than the file. A step only adds entries that are
//! absent and never deletes old ones, so running it twice is harmless.

use crate::codec::activity_to_char;
use crate::error::{Diagnostics, LoadError};
use crate::map_codec::{load_bit_rows, save_bit_rows};
use crate::secfile::{SectionFile, Value};
use civstate_core::bitset::BitVector;
use civstate_core::player::DiplStateType;
use civstate_core::unit::Activity;

/// Version written by this build.
pub const CURRENT_SAVE_VERSION: i64 = 36;

/// A single checkpoint: brings a file older than `version` up to it.
pub(crate) struct MigrationStep {
    pub version: u32,
    pub description: &'static str,
    pub migrate_fn: fn(&mut SectionFile, &mut Diagnostics) -> Result<(), LoadError>,
}

/// Result of running the migration pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Version found on disk.
    pub original_version: i64,
    /// Version after migrating.
    pub final_version: i64,
    /// Descriptions of each step that was applied, in order.
    pub steps_applied: Vec<&'static str>,
}

/// Ordered checkpoint list.
pub(crate) struct MigrationRegistry {
    steps: Vec<MigrationStep>,
    current_version: i64,
}

impl MigrationRegistry {
    /// Build a registry; steps are sorted by version.
    pub fn new(mut steps: Vec<MigrationStep>, current_version: i64) -> Self {
        steps.sort_by_key(|s| s.version);
        debug_assert!(
            steps.windows(2).all(|w| w[0].version < w[1].version),
            "duplicate migration checkpoint"
        );
        debug_assert!(steps
            .last()
            .map_or(true, |s| i64::from(s.version) <= current_version));
        Self {
            steps,
            current_version,
        }
    }

    /// The checkpoints this build knows about.
    pub fn standard() -> Self {
        Self::new(
            vec![
                MigrationStep {
                    version: 20,
                    description: "unify specials, bases and roads into extras",
                    migrate_fn: unify_extras,
                },
                MigrationStep {
                    version: 24,
                    description: "convert killcitizen and rename diplcost",
                    migrate_fn: upgrade_settings,
                },
                MigrationStep {
                    version: 28,
                    description: "name diplomatic states",
                    migrate_fn: name_diplstates,
                },
                MigrationStep {
                    version: 32,
                    description: "convert unit activity numbers",
                    migrate_fn: convert_activities,
                },
                MigrationStep {
                    version: 36,
                    description: "move research into research records",
                    migrate_fn: move_research,
                },
            ],
            CURRENT_SAVE_VERSION,
        )
    }

    /// Run every step newer than `on_disk` and stamp the current version.
    ///
    /// Files newer than the current version are left untouched.
    pub fn migrate(
        &self,
        file: &mut SectionFile,
        diag: &mut Diagnostics,
        on_disk: i64,
    ) -> Result<MigrationReport, LoadError> {
        let mut steps_applied = Vec::new();
        for step in &self.steps {
            if on_disk >= i64::from(step.version) {
                continue;
            }
            tracing::info!(version = step.version, "{}", step.description);
            (step.migrate_fn)(file, diag).map_err(|err| LoadError::Migration {
                version: step.version,
                message: err.to_string(),
            })?;
            steps_applied.push(step.description);
        }

        let final_version = on_disk.max(self.current_version);
        if on_disk < self.current_version {
            file.insert_int("savefile.version", self.current_version)?;
        }
        Ok(MigrationReport {
            original_version: on_disk,
            final_version,
            steps_applied,
        })
    }

    #[cfg(test)]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

/// Read the on-disk version. Absent, mistyped and non-positive versions
/// are all fatal.
pub fn read_savefile_version(file: &SectionFile) -> Result<i64, LoadError> {
    match file.lookup_int("savefile.version") {
        Ok(version) if version > 0 => Ok(version),
        _ => Err(LoadError::MissingVersion),
    }
}

/// Slot numbers of `player{N}` sections.
pub(crate) fn player_sections(file: &SectionFile) -> Vec<usize> {
    let mut slots: Vec<usize> = file
        .section_names()
        .filter_map(|name| name.strip_prefix("player"))
        .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|rest| rest.parse().ok())
        .collect();
    slots.sort_unstable();
    slots
}

/// Names of sections `{prefix}{N}.{child}{M}`, such as `player0.u3`.
fn child_sections(file: &SectionFile, child: &str) -> Vec<String> {
    file.section_names()
        .filter(|name| {
            name.split_once('.').is_some_and(|(parent, rest)| {
                parent.starts_with("player")
                    && rest
                        .strip_prefix(child)
                        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
            })
        })
        .map(str::to_string)
        .collect()
}

// ============================================================================
// 20: extras
// ============================================================================

/// Legacy specials, in bit order, for files that predate `specials_vector`.
pub(crate) const LEGACY_SPECIALS: [&str; 13] = [
    "Road",
    "Irrigation",
    "Railroad",
    "Mine",
    "Pollution",
    "Hut",
    "Fortress",
    "Special1",
    "River",
    "Farmland",
    "Airbase",
    "Fallout",
    "Special2",
];

/// Extra a legacy special becomes. The two resource specials are tile
/// resources, not extras, and are dropped.
fn special_to_extra(name: &str) -> Option<&str> {
    match name {
        "Special1" | "Special2" => None,
        other => Some(other),
    }
}

struct LegacyExtras {
    extras: Vec<String>,
    specials: Vec<Option<usize>>,
    bases: Vec<Option<usize>>,
    roads: Vec<Option<usize>>,
}

impl LegacyExtras {
    fn build(specials: &[String], bases: &[String], roads: &[String]) -> Self {
        let mut extras: Vec<String> = Vec::new();
        let mut add = |name: &str| -> usize {
            match extras.iter().position(|e| e == name) {
                Some(i) => i,
                None => {
                    extras.push(name.to_string());
                    extras.len() - 1
                }
            }
        };
        let specials = specials
            .iter()
            .map(|s| special_to_extra(s.as_str()).map(&mut add))
            .collect();
        let bases = bases.iter().map(|b| Some(add(b.as_str()))).collect();
        let roads = roads.iter().map(|r| Some(add(r.as_str()))).collect();
        Self {
            extras,
            specials,
            bases,
            roads,
        }
    }

    /// Merge three legacy row sets, all addressed by `prefix`, into extras rows.
    fn convert_rows(
        &self,
        file: &mut SectionFile,
        diag: &mut Diagnostics,
        prefix: &str,
        xsize: u32,
        ysize: u32,
    ) -> Result<(), LoadError> {
        let target = format!("{}e", prefix);
        if file.contains(&format!("{}00_0000", target)) {
            return Ok(());
        }
        let count = (xsize as usize) * (ysize as usize);
        let mut merged = vec![BitVector::new(self.extras.len()); count];
        for (legacy, table) in [
            ("spe", &self.specials),
            ("b", &self.bases),
            ("r", &self.roads),
        ] {
            let rows = load_bit_rows(
                file,
                diag,
                &format!("{}{}", prefix, legacy),
                xsize,
                ysize,
                table.len(),
            );
            for (tile, bits) in rows.iter().enumerate() {
                for bit in bits.iter_ones() {
                    if let Some(extra) = table[bit] {
                        merged[tile].set(extra);
                    }
                }
            }
        }
        save_bit_rows(file, &target, xsize, ysize, self.extras.len(), |tile, bit| {
            merged[tile].get(bit)
        })?;
        Ok(())
    }
}

fn unify_extras(file: &mut SectionFile, diag: &mut Diagnostics) -> Result<(), LoadError> {
    if file.contains("savefile.extras_vector0") {
        return Ok(());
    }
    let mut specials = file.lookup_str_vec("savefile.specials_vector")?;
    if specials.is_empty() {
        specials = LEGACY_SPECIALS.iter().map(|s| s.to_string()).collect();
    }
    let bases = file.lookup_str_vec("savefile.bases_vector")?;
    let roads = file.lookup_str_vec("savefile.roads_vector")?;
    let legacy = LegacyExtras::build(&specials, &bases, &roads);
    file.insert_str_vec("savefile.extras_vector", &legacy.extras)?;

    let (Ok(xsize), Ok(ysize)) = (
        file.lookup_int("map.xsize"),
        file.lookup_int("map.ysize"),
    ) else {
        return Ok(());
    };
    let (Ok(xsize), Ok(ysize)) = (u32::try_from(xsize), u32::try_from(ysize)) else {
        return Ok(());
    };
    legacy.convert_rows(file, diag, "map.", xsize, ysize)?;

    for slot in player_sections(file) {
        if file.contains(&format!("player{}.map_t0000", slot)) {
            legacy.convert_rows(file, diag, &format!("player{}.map_", slot), xsize, ysize)?;
        }
    }
    Ok(())
}

// ============================================================================
// 24: settings
// ============================================================================

fn upgrade_settings(file: &mut SectionFile, _diag: &mut Diagnostics) -> Result<(), LoadError> {
    if let Some(Value::Int(mask)) = file.lookup("settings.killcitizen").cloned() {
        let enabled = mask != 0;
        tracing::info!(
            mask,
            enabled,
            "killcitizen is now a boolean; any unit class bit enables it"
        );
        file.insert_bool("settings.killcitizen", enabled)?;
    }
    if let Some(cost) = file.lookup("settings.diplcost").cloned() {
        file.insert_if_absent("settings.diplbulbcost", cost)?;
    }
    Ok(())
}

// ============================================================================
// 28: diplomatic states
// ============================================================================

/// Diplomatic state numbering before states were saved by name. State 0 was
/// the retired "neutral" state, which reads as war.
fn legacy_diplstate(status: i64) -> Option<DiplStateType> {
    match status {
        0 | 1 => Some(DiplStateType::War),
        2 => Some(DiplStateType::Ceasefire),
        3 => Some(DiplStateType::Peace),
        4 => Some(DiplStateType::Alliance),
        5 => Some(DiplStateType::NoContact),
        6 => Some(DiplStateType::Team),
        _ => None,
    }
}

fn name_diplstates(file: &mut SectionFile, diag: &mut Diagnostics) -> Result<(), LoadError> {
    for section in child_sections(file, "diplstate") {
        let Some(Value::Int(status)) = file.lookup(&format!("{}.status", section)).cloned() else {
            continue;
        };
        let state = legacy_diplstate(status).unwrap_or_else(|| {
            diag.warn(format!(
                "Unknown diplomatic status {} in '{}', assuming war",
                status, section
            ));
            DiplStateType::War
        });
        file.insert_if_absent(&format!("{}.type", section), state.name())?;

        let max_state = match file.lookup(&format!("{}.max_status", section)).cloned() {
            Some(Value::Int(max)) => legacy_diplstate(max).unwrap_or(state),
            _ => state,
        };
        file.insert_if_absent(&format!("{}.max_state", section), max_state.name())?;
    }
    Ok(())
}

// ============================================================================
// 32: activities
// ============================================================================

/// Activity numbering with separate road, railroad, fortress and airbase
/// activities. The second field names the extra the activity targets.
fn legacy_activity(id: i64) -> Option<(Activity, Option<&'static str>)> {
    let converted = match id {
        0 | 10 | 13 | 17 => (Activity::Idle, None),
        1 => (Activity::Pollution, None),
        2 => (Activity::GenRoad, Some("Road")),
        3 => (Activity::Mine, None),
        4 => (Activity::Irrigate, None),
        5 => (Activity::Fortified, None),
        6 => (Activity::Base, Some("Fortress")),
        7 => (Activity::Sentry, None),
        8 => (Activity::GenRoad, Some("Railroad")),
        9 => (Activity::Pillage, None),
        11 => (Activity::Explore, None),
        12 => (Activity::Transform, None),
        14 => (Activity::Base, Some("Airbase")),
        15 => (Activity::Fortifying, None),
        16 => (Activity::Fallout, None),
        18 => (Activity::Base, None),
        19 => (Activity::GenRoad, None),
        20 => (Activity::Convert, None),
        _ => return None,
    };
    Some(converted)
}

fn convert_activities(file: &mut SectionFile, diag: &mut Diagnostics) -> Result<(), LoadError> {
    let bases = file.lookup_str_vec("savefile.bases_vector")?;
    let roads = file.lookup_str_vec("savefile.roads_vector")?;

    for section in child_sections(file, "u") {
        let Some(Value::Int(id)) = file.lookup(&format!("{}.activity_id", section)).cloned() else {
            continue;
        };
        let (activity, mut target) = legacy_activity(id).unwrap_or_else(|| {
            diag.warn(format!("Unknown activity {} in '{}', unit idles", id, section));
            (Activity::Idle, None)
        });

        let indexed = match activity {
            Activity::Base if target.is_none() => {
                Some((&bases, file.lookup_int_default(-1, &format!("{}.activity_base", section))))
            }
            Activity::GenRoad if target.is_none() => {
                Some((&roads, file.lookup_int_default(-1, &format!("{}.activity_road", section))))
            }
            _ => None,
        };
        let mut target_name = target.take().map(str::to_string);
        if let Some((names, index)) = indexed {
            target_name = usize::try_from(index)
                .ok()
                .and_then(|i| names.get(i))
                .cloned();
            if target_name.is_none() {
                diag.warn(format!("Activity target {} in '{}' is unknown", index, section));
            }
        }

        file.insert_if_absent(
            &format!("{}.activity", section),
            activity_to_char(activity).to_string(),
        )?;
        file.insert_if_absent(
            &format!("{}.activity_tgt", section),
            target_name.unwrap_or_default(),
        )?;
    }
    Ok(())
}

// ============================================================================
// 36: research records
// ============================================================================

fn move_research(file: &mut SectionFile, _diag: &mut Diagnostics) -> Result<(), LoadError> {
    if file.contains("research.count") {
        return Ok(());
    }
    let pooled = file.lookup_bool_default(true, "settings.team_pooled_research");

    let mut keys: Vec<(&'static str, i64)> = Vec::new();
    for slot in player_sections(file) {
        let player = format!("player{}", slot);
        let key = if pooled {
            ("team", file.lookup_int_default(slot as i64, &format!("{}.team", player)))
        } else {
            ("player", slot as i64)
        };
        if keys.contains(&key) {
            continue;
        }
        let record = format!("research.r{}", keys.len());
        keys.push(key);

        file.insert_if_absent(&format!("{}.kind", record), key.0)?;
        file.insert_if_absent(&format!("{}.number", record), key.1)?;
        for (from, to) in [
            ("researching_name", "researching_name"),
            ("goal_name", "goal_name"),
            ("bulbs_researched", "bulbs"),
            ("techs_researched", "techs"),
            ("done", "done"),
        ] {
            if let Some(value) = file.lookup(&format!("{}.{}", player, from)).cloned() {
                file.insert_if_absent(&format!("{}.{}", record, to), value)?;
            }
        }
    }
    file.insert_int("research.count", keys.len() as i64)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_twice(
        step: fn(&mut SectionFile, &mut Diagnostics) -> Result<(), LoadError>,
        file: &mut SectionFile,
    ) {
        let mut diag = Diagnostics::new();
        step(file, &mut diag).unwrap();
        let once = file.clone();
        step(file, &mut diag).unwrap();
        assert_eq!(*file, once, "migration step is not idempotent");
    }

    #[test]
    fn test_registry_is_ordered() {
        let registry = MigrationRegistry::standard();
        assert_eq!(registry.step_count(), 5);
        let versions: Vec<u32> = registry.steps.iter().map(|s| s.version).collect();
        assert_eq!(versions, vec![20, 24, 28, 32, 36]);
    }

    #[test]
    fn test_version_checks() {
        let mut file = SectionFile::new();
        assert!(matches!(read_savefile_version(&file), Err(LoadError::MissingVersion)));
        file.insert_int("savefile.version", 0).unwrap();
        assert!(matches!(read_savefile_version(&file), Err(LoadError::MissingVersion)));
        file.insert_str("savefile.version", "3.0").unwrap();
        assert!(matches!(read_savefile_version(&file), Err(LoadError::MissingVersion)));
        file.insert_int("savefile.version", 24).unwrap();
        assert_eq!(read_savefile_version(&file).unwrap(), 24);
    }

    #[test]
    fn test_only_newer_steps_run() {
        let mut file = SectionFile::new();
        file.insert_int("savefile.version", 30).unwrap();
        let mut diag = Diagnostics::new();
        let report = MigrationRegistry::standard()
            .migrate(&mut file, &mut diag, 30)
            .unwrap();
        assert_eq!(report.steps_applied.len(), 2);
        assert_eq!(report.final_version, CURRENT_SAVE_VERSION);
        assert_eq!(file.lookup_int("savefile.version").unwrap(), CURRENT_SAVE_VERSION);
    }

    #[test]
    fn test_newer_file_is_not_downgraded() {
        let mut file = SectionFile::new();
        file.insert_int("savefile.version", 99).unwrap();
        let mut diag = Diagnostics::new();
        let report = MigrationRegistry::standard()
            .migrate(&mut file, &mut diag, 99)
            .unwrap();
        assert!(report.steps_applied.is_empty());
        assert_eq!(report.final_version, 99);
        assert_eq!(file.lookup_int("savefile.version").unwrap(), 99);
    }

    #[test]
    fn test_steps_compose_across_checkpoints() {
        let mut old = SectionFile::new();
        old.insert_int("savefile.version", 22).unwrap();
        old.insert_int("settings.killcitizen", 1).unwrap();
        old.insert_int("player0.diplstate1.status", 3).unwrap();
        old.insert_int("player0.u0.activity_id", 4).unwrap();
        let registry = MigrationRegistry::standard();

        let mut direct = old.clone();
        registry.migrate(&mut direct, &mut Diagnostics::new(), 22).unwrap();

        // Same file, already brought to 24 by an earlier build.
        let mut staged = old;
        upgrade_settings(&mut staged, &mut Diagnostics::new()).unwrap();
        staged.insert_int("savefile.version", 24).unwrap();
        let report = registry.migrate(&mut staged, &mut Diagnostics::new(), 24).unwrap();

        assert_eq!(report.steps_applied.len(), 3);
        assert_eq!(direct, staged);
    }

    #[test]
    fn test_extras_unified_from_default_specials() {
        let mut file = SectionFile::new();
        file.insert_str_vec("savefile.bases_vector", &["Fortress", "Buoy"]).unwrap();
        file.insert_str_vec("savefile.roads_vector", &["Road", "Railroad"]).unwrap();
        file.insert_int("map.xsize", 2).unwrap();
        file.insert_int("map.ysize", 1).unwrap();
        // Tile 0: Road + Mine (bits 0, 3). Tile 1: Special1 (bit 7).
        file.insert_str("map.spe00_0000", "90").unwrap();
        file.insert_str("map.spe01_0000", "08").unwrap();
        file.insert_str("map.spe02_0000", "00").unwrap();
        file.insert_str("map.spe03_0000", "00").unwrap();
        // Tile 1: Buoy base.
        file.insert_str("map.b00_0000", "02").unwrap();
        // Tile 1: Railroad road.
        file.insert_str("map.r00_0000", "02").unwrap();

        run_twice(unify_extras, &mut file);

        let extras = file.lookup_str_vec("savefile.extras_vector").unwrap();
        assert!(!extras.iter().any(|e| e.starts_with("Special")));
        assert_eq!(extras.iter().filter(|e| *e == "Road").count(), 1);

        let mut diag = Diagnostics::new();
        let bits = load_bit_rows(&file, &mut diag, "map.e", 2, 1, extras.len());
        let names = |tile: usize| -> Vec<&str> {
            bits[tile].iter_ones().map(|i| extras[i].as_str()).collect()
        };
        assert_eq!(names(0), vec!["Road", "Mine"]);
        assert_eq!(names(1), vec!["Railroad", "Buoy"]);
    }

    #[test]
    fn test_settings_upgrade() {
        let mut file = SectionFile::new();
        file.insert_int("settings.killcitizen", 5).unwrap();
        file.insert_int("settings.diplcost", 15).unwrap();
        run_twice(upgrade_settings, &mut file);
        assert!(file.lookup_bool("settings.killcitizen").unwrap());
        assert_eq!(file.lookup_int("settings.diplbulbcost").unwrap(), 15);
        assert_eq!(file.lookup_int("settings.diplcost").unwrap(), 15);

        let mut off = SectionFile::new();
        off.insert_int("settings.killcitizen", 0).unwrap();
        run_twice(upgrade_settings, &mut off);
        assert!(!off.lookup_bool("settings.killcitizen").unwrap());
    }

    #[test]
    fn test_diplstates_named() {
        let mut file = SectionFile::new();
        file.insert_int("player0.diplstate1.status", 0).unwrap();
        file.insert_int("player0.diplstate2.status", 4).unwrap();
        file.insert_int("player0.diplstate2.max_status", 6).unwrap();
        file.insert_int("player1.diplstate0.status", 42).unwrap();

        let mut diag = Diagnostics::new();
        name_diplstates(&mut file, &mut diag).unwrap();
        run_twice(name_diplstates, &mut file);

        assert_eq!(file.lookup_str("player0.diplstate1.type").unwrap(), "War");
        assert_eq!(file.lookup_str("player0.diplstate1.max_state").unwrap(), "War");
        assert_eq!(file.lookup_str("player0.diplstate2.type").unwrap(), "Alliance");
        assert_eq!(file.lookup_str("player0.diplstate2.max_state").unwrap(), "Team");
        assert_eq!(file.lookup_str("player1.diplstate0.type").unwrap(), "War");
        assert!(diag.mentions("Unknown diplomatic status 42"));
    }

    #[test]
    fn test_activities_converted() {
        let mut file = SectionFile::new();
        file.insert_str_vec("savefile.bases_vector", &["Fortress", "Airbase"]).unwrap();
        file.insert_str_vec("savefile.roads_vector", &["Road", "Railroad"]).unwrap();
        file.insert_int("player0.u0.activity_id", 8).unwrap();
        file.insert_int("player0.u1.activity_id", 18).unwrap();
        file.insert_int("player0.u1.activity_base", 1).unwrap();
        file.insert_int("player0.u2.activity_id", 4).unwrap();
        file.insert_int("player1.u0.activity_id", 77).unwrap();

        run_twice(convert_activities, &mut file);

        assert_eq!(file.lookup_str("player0.u0.activity").unwrap(), "R");
        assert_eq!(file.lookup_str("player0.u0.activity_tgt").unwrap(), "Railroad");
        assert_eq!(file.lookup_str("player0.u1.activity").unwrap(), "b");
        assert_eq!(file.lookup_str("player0.u1.activity_tgt").unwrap(), "Airbase");
        assert_eq!(file.lookup_str("player0.u2.activity").unwrap(), "i");
        assert_eq!(file.lookup_str("player0.u2.activity_tgt").unwrap(), "");
        assert_eq!(file.lookup_str("player1.u0.activity").unwrap(), "w");
    }

    #[test]
    fn test_research_pooled_by_team() {
        let mut file = SectionFile::new();
        for (slot, team, bulbs) in [(0, 0, 30), (1, 0, 99), (2, 1, 12)] {
            file.insert_int(&format!("player{}.team", slot), team).unwrap();
            file.insert_int(&format!("player{}.bulbs_researched", slot), bulbs)
                .unwrap();
            file.insert_str(&format!("player{}.researching_name", slot), "Pottery")
                .unwrap();
        }
        run_twice(move_research, &mut file);

        assert_eq!(file.lookup_int("research.count").unwrap(), 2);
        assert_eq!(file.lookup_str("research.r0.kind").unwrap(), "team");
        assert_eq!(file.lookup_int("research.r0.number").unwrap(), 0);
        assert_eq!(file.lookup_int("research.r0.bulbs").unwrap(), 30);
        assert_eq!(file.lookup_int("research.r1.number").unwrap(), 1);
        assert_eq!(file.lookup_int("research.r1.bulbs").unwrap(), 12);
        assert_eq!(file.lookup_str("research.r1.researching_name").unwrap(), "Pottery");
    }

    #[test]
    fn test_research_per_player_when_not_pooled() {
        let mut file = SectionFile::new();
        file.insert_bool("settings.team_pooled_research", false).unwrap();
        file.insert_int("player0.team", 0).unwrap();
        file.insert_int("player1.team", 0).unwrap();
        move_research(&mut file, &mut Diagnostics::new()).unwrap();
        assert_eq!(file.lookup_int("research.count").unwrap(), 2);
        assert_eq!(file.lookup_str("research.r1.kind").unwrap(), "player");
        assert_eq!(file.lookup_int("research.r1.number").unwrap(), 1);
    }
}
