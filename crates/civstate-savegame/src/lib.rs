//! Civstate Savegame Library
//!
//! Reads and writes Civstate games as versioned section files. A file
//! written by any earlier format version is upgraded in memory by an
//! ordered chain of migrations before the game is rebuilt from it.
//!
//! # Loading
//!
//! [`load_game`] runs a fixed sequence of [`LoadPhase`]s. Inconsistencies
//! with a reasonable fallback are repaired and reported through
//! [`Diagnostic`]s; anything else aborts the load with a [`LoadError`] and
//! leaves the game empty.
//!
//! # Saving
//!
//! [`save_game`] always writes the current format version and replaces the
//! target file atomically.

// Section file format
pub mod secfile;

// Errors and options
pub mod config;
pub mod error;

// Format versioning
pub mod capability;
pub mod compat;

// Shared codec helpers and load/save state
pub mod codec;
mod context;

// Section codecs
mod city_codec;
mod game_codec;
mod map_codec;
mod player_codec;
mod research_codec;
mod unit_codec;

// Post-load repair
pub mod sanity;

// Orchestration
pub mod atomic_write;
pub mod loader;
pub mod saver;

// Re-exports for convenience
pub use capability::{has_capabilities, has_capability, REQUIRED_OPTIONS, SAVEFILE_OPTIONS};
pub use compat::{read_savefile_version, MigrationReport, CURRENT_SAVE_VERSION};
pub use config::{LoadOptions, SaveOptions, SaveReason};
pub use error::{Diagnostic, Diagnostics, LoadError, SaveError};
pub use loader::{load_from_str, load_game, load_section_file, LoadPhase, LoadReport};
pub use saver::{save_game, save_section_file, save_to_string};
pub use secfile::{SectionFile, SectionFileError, Value};
