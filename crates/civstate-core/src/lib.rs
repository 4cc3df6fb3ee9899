//! Civstate Core Library
//!
//! This crate contains the game-state object graph of Civstate: the ruleset
//! registry, the tile map, players and their diplomacy, cities, units,
//! research records and the rest of the state a savegame captures.
//!
//! # Design Principles
//!
//! - **No I/O**: reading and writing savegames lives in `civstate-savegame`
//! - **Index relations**: entities refer to each other by identity number or
//!   tile index, never by owning pointers
//! - **Rule names at the edges**: ruleset objects are looked up by name, so
//!   reordered rulesets stay compatible

// Core modules
pub mod bitset;
pub mod coord;
pub mod terrain;
pub mod types;

// Ruleset
pub mod ruleset;

// Game state modules
pub mod game_state;
pub mod map;
pub mod player;
pub mod settings;

// Units and cities
pub mod city;
pub mod unit;

// Technology
pub mod technology;

// Auxiliary state
pub mod events;
pub mod mapimg;
pub mod random;
pub mod scenario;

// Re-exports for convenience
pub use bitset::{BitVector, PlayerSet};
pub use city::{City, ProductionTarget, WorkerTask, Worklist};
pub use coord::{Direction8, MapCoord};
pub use events::{CachedEvent, EventCache, EventTarget};
pub use game_state::{GameContext, GameError, GameInfo, GameState, IdentityAllocator};
pub use map::{Map, StartPosition, Tile};
pub use mapimg::{MapImageDef, MapImageError};
pub use player::{
    AiLevel, AiState, DiplState, DiplStateType, DumbCity, Player, PlayerVision, Score,
    Spaceship, SpaceshipState, TaxRates, TileMemory, TraitValue,
};
pub use random::RandomState;
pub use ruleset::{Advance, ImprovementGenus, ImprovementType, Ruleset, RulesetError, UnitType};
pub use scenario::Scenario;
pub use settings::{SettingValue, SettingsError, SettingsTable};
pub use technology::{Research, ResearchKey, TechState};
pub use terrain::{ExtraKind, ExtraType, ResourceType, TerrainType};
pub use types::*;
pub use unit::{ActionId, Activity, Order, Unit, UnitAi, UnitOrders};
