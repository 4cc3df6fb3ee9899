//! Load and save options.

use serde::{Deserialize, Serialize};

/// Options controlling a load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Try to load files written by a newer version instead of refusing
    /// them. Intended for debugging.
    pub allow_newer_versions: bool,
    /// Run the sanity and repair pass after loading.
    pub run_sanity_checks: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            allow_newer_versions: false,
            run_sanity_checks: true,
        }
    }
}

/// Why a game was saved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveReason {
    #[default]
    Autosave,
    UserRequest,
    Scenario,
    GameOver,
    Quitidle,
    Interrupt,
}

impl SaveReason {
    pub const fn name(&self) -> &'static str {
        match self {
            SaveReason::Autosave => "Autosave",
            SaveReason::UserRequest => "User request",
            SaveReason::Scenario => "Scenario",
            SaveReason::GameOver => "Game over",
            SaveReason::Quitidle => "Quitidle",
            SaveReason::Interrupt => "Interrupted",
        }
    }
}

/// Options controlling a save.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    pub reason: SaveReason,
    /// Write a scenario: no event cache, and no random state unless the
    /// scenario asks to keep it.
    pub scenario: bool,
}
