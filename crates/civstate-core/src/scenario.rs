//! Scenario metadata.

use serde::{Deserialize, Serialize};

/// Describes a game set up as a scenario rather than a regular save.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Whether the game is a scenario at all.
    pub is_scenario: bool,
    pub name: String,
    pub authors: String,
    pub description: String,
    /// Keep the random state in scenario saves.
    pub save_random: bool,
    /// Players may join the scenario.
    pub players: bool,
    /// Start positions are fixed by the scenario.
    pub startpos_nations: bool,
    /// Prevent changing the scenario's settings.
    pub prevent_new_cities: bool,
    /// Lake flooding is disabled.
    pub lake_flooding: bool,
    /// Ruleset the scenario was designed for, if it locks one.
    pub ruleset_locked: bool,
}

impl Scenario {
    /// A scenario with the given name.
    pub fn named(name: &str) -> Self {
        Self {
            is_scenario: true,
            name: name.to_string(),
            players: true,
            lake_flooding: true,
            ..Self::default()
        }
    }
}
