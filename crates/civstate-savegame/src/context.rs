//! Per-operation state for loading and saving.
//!
//! A [`LoadContext`] lives for exactly one load. It owns the section file
//! being read, the game state being built and the savefile's name tables,
//! which map the small indices used inside the file to objects of the
//! running ruleset.

use crate::config::{LoadOptions, SaveOptions};
use crate::error::{Diagnostics, LoadError};
use crate::secfile::SectionFile;
use civstate_core::game_state::GameState;
use civstate_core::ruleset::Ruleset;
use civstate_core::types::{
    CityId, ExtraId, ImprovementId, SpecialistId, TechId, TerrainId, UnitId,
};
use civstate_core::unit::ActionId;
use std::collections::{BTreeMap, HashMap};

/// Savefile index to ruleset object mappings.
#[derive(Clone, Debug, Default)]
pub struct NameTables {
    pub improvements: Vec<Option<ImprovementId>>,
    pub techs: Vec<Option<TechId>>,
    pub extras: Vec<Option<ExtraId>>,
    pub specialists: Vec<Option<SpecialistId>>,
    pub traits: Vec<Option<usize>>,
    pub actions: Vec<Option<ActionId>>,
    /// Terrain identifier used in the file to ruleset terrain.
    pub terrain: HashMap<char, TerrainId>,
}

fn resolve_table<T>(
    file: &SectionFile,
    diag: &mut Diagnostics,
    path: &str,
    kind: &str,
    default_names: impl Iterator<Item = String>,
    lookup: impl Fn(&str) -> Option<T>,
) -> Result<Vec<Option<T>>, LoadError> {
    let mut names = file.lookup_str_vec(path)?;
    if names.is_empty() {
        tracing::debug!(path, "name table absent, using ruleset order");
        names = default_names.collect();
    }
    Ok(names
        .iter()
        .map(|name| {
            let found = lookup(name);
            if found.is_none() {
                diag.warn(format!("{} '{}' is not in the current ruleset", kind, name));
            }
            found
        })
        .collect())
}

impl NameTables {
    /// Read the name tables from the `[savefile]` section.
    pub fn load(
        file: &SectionFile,
        ruleset: &Ruleset,
        diag: &mut Diagnostics,
    ) -> Result<Self, LoadError> {
        let improvements = resolve_table(
            file,
            diag,
            "savefile.improvement_vector",
            "Improvement",
            ruleset.improvements.iter().map(|i| i.name.clone()),
            |n| ruleset.improvement_by_name(n),
        )?;
        let techs = resolve_table(
            file,
            diag,
            "savefile.technology_vector",
            "Technology",
            ruleset.techs.iter().map(|t| t.name.clone()),
            |n| ruleset.tech_by_name(n),
        )?;
        let extras = resolve_table(
            file,
            diag,
            "savefile.extras_vector",
            "Extra",
            ruleset.extras.iter().map(|e| e.name.clone()),
            |n| ruleset.extra_by_name(n),
        )?;
        let specialists = resolve_table(
            file,
            diag,
            "savefile.specialists_vector",
            "Specialist",
            ruleset.specialists.iter().cloned(),
            |n| ruleset.specialist_by_name(n),
        )?;
        let traits = resolve_table(
            file,
            diag,
            "savefile.trait_vector",
            "Trait",
            ruleset.traits.iter().cloned(),
            |n| ruleset.trait_by_name(n),
        )?;
        let actions = resolve_table(
            file,
            diag,
            "savefile.action_vector",
            "Action",
            ActionId::ALL.iter().map(|a| a.name().to_string()),
            ActionId::by_name,
        )?;
        let terrain = Self::load_terrain(file, ruleset, diag)?;

        Ok(Self {
            improvements,
            techs,
            extras,
            specialists,
            traits,
            actions,
            terrain,
        })
    }

    fn load_terrain(
        file: &SectionFile,
        ruleset: &Ruleset,
        diag: &mut Diagnostics,
    ) -> Result<HashMap<char, TerrainId>, LoadError> {
        let names = file.lookup_str_vec("savefile.terrain_vector")?;
        let idents = file.lookup_str_vec("savefile.terrain_ident")?;
        if names.is_empty() {
            return Ok(ruleset
                .terrains
                .iter()
                .enumerate()
                .map(|(id, t)| (t.identifier, id))
                .collect());
        }
        if names.len() != idents.len() {
            return Err(LoadError::Corrupt(format!(
                "{} terrain names but {} terrain identifiers",
                names.len(),
                idents.len()
            )));
        }

        let mut table = HashMap::new();
        for (name, ident) in names.iter().zip(&idents) {
            let mut chars = ident.chars();
            let (Some(ch), None) = (chars.next(), chars.next()) else {
                return Err(LoadError::Corrupt(format!(
                    "terrain '{}' has invalid identifier '{}'",
                    name, ident
                )));
            };
            match ruleset.terrain_by_name(name) {
                Some(id) => {
                    table.insert(ch, id);
                }
                None => diag.warn(format!("Terrain '{}' is not in the current ruleset", name)),
            }
        }
        Ok(table)
    }

    fn get<T: Copy>(table: &[Option<T>], index: i64) -> Option<T> {
        usize::try_from(index)
            .ok()
            .and_then(|i| table.get(i).copied().flatten())
    }

    pub fn improvement(&self, index: i64) -> Option<ImprovementId> {
        Self::get(&self.improvements, index)
    }

    pub fn tech(&self, index: i64) -> Option<TechId> {
        Self::get(&self.techs, index)
    }

    pub fn extra(&self, index: i64) -> Option<ExtraId> {
        Self::get(&self.extras, index)
    }

    pub fn specialist(&self, index: i64) -> Option<SpecialistId> {
        Self::get(&self.specialists, index)
    }

    pub fn action(&self, index: i64) -> Option<ActionId> {
        Self::get(&self.actions, index)
    }
}

/// State of one load operation.
pub(crate) struct LoadContext<'a> {
    /// The file being read. Migrations rewrite it in place.
    pub file: SectionFile,
    pub ruleset: &'a Ruleset,
    pub options: &'a LoadOptions,
    /// Version found on disk, before migrations.
    pub version: i64,
    /// Capability string of the file.
    pub capabilities: String,
    pub names: NameTables,
    /// City working each tile, as recorded in the map rows.
    pub worked_tiles: Vec<Option<CityId>>,
    /// Specialists owed to cities not loaded yet, after their worked center
    /// was taken away.
    pub pending_specialists: BTreeMap<CityId, u32>,
    /// Unit and the carrier it claims, resolved after all units exist.
    pub pending_transports: Vec<(UnitId, UnitId)>,
    /// The state under construction. Only published on success.
    pub state: GameState,
    pub diag: Diagnostics,
    /// Descriptions of migrations applied.
    pub migrations: Vec<&'static str>,
}

impl<'a> LoadContext<'a> {
    pub fn new(file: SectionFile, ruleset: &'a Ruleset, options: &'a LoadOptions) -> Self {
        Self {
            file,
            ruleset,
            options,
            version: 0,
            capabilities: String::new(),
            names: NameTables::default(),
            worked_tiles: Vec::new(),
            pending_specialists: BTreeMap::new(),
            pending_transports: Vec::new(),
            state: GameState::new(ruleset),
            diag: Diagnostics::new(),
            migrations: Vec::new(),
        }
    }
}

/// State of one save operation.
pub(crate) struct SaveContext<'a> {
    pub file: SectionFile,
    pub ruleset: &'a Ruleset,
    pub state: &'a GameState,
    pub options: &'a SaveOptions,
}

impl<'a> SaveContext<'a> {
    pub fn new(ruleset: &'a Ruleset, state: &'a GameState, options: &'a SaveOptions) -> Self {
        Self {
            file: SectionFile::new(),
            ruleset,
            state,
            options,
        }
    }
}
