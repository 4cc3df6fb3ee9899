//! City system - settlements, citizens, production and worked tiles.

use crate::types::{
    CityId, ExtraId, ImprovementId, PlayerId, TileIndex, UnitTypeId,
};
use crate::unit::Activity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Maximum number of entries in a worklist.
pub const MAX_WORKLIST_LEN: usize = 64;

/// Something a city can build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductionTarget {
    Improvement(ImprovementId),
    Unit(UnitTypeId),
}

impl ProductionTarget {
    /// Savefile kind tag.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            ProductionTarget::Improvement(_) => "improvement",
            ProductionTarget::Unit(_) => "unit",
        }
    }
}

/// Bounded queue of future production targets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worklist {
    entries: VecDeque<ProductionTarget>,
}

impl Worklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a target. Returns false if the worklist is full.
    pub fn push(&mut self, target: ProductionTarget) -> bool {
        if self.entries.len() >= MAX_WORKLIST_LEN {
            return false;
        }
        self.entries.push_back(target);
        true
    }

    /// Take the next target off the front.
    pub fn advance(&mut self) -> Option<ProductionTarget> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductionTarget> {
        self.entries.iter()
    }

    pub fn retain(&mut self, f: impl FnMut(&ProductionTarget) -> bool) {
        self.entries.retain(f);
    }
}

/// A pending request for workers to improve a tile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerTask {
    pub tile: TileIndex,
    pub activity: Activity,
    pub target: Option<ExtraId>,
    /// Priority.
    pub want: i32,
}

/// A city on the game map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    /// Identity number.
    pub id: CityId,
    /// Owning player.
    pub owner: PlayerId,
    /// Player that founded the city.
    pub original_owner: PlayerId,
    pub name: String,
    /// Center tile.
    pub tile: TileIndex,
    /// Number of citizens.
    pub size: u32,
    /// Citizen count per ruleset specialist type.
    pub specialists: Vec<u32>,
    /// Citizens per nationality (player slot). Empty when the game does not
    /// track citizen nationality.
    pub nationality: BTreeMap<PlayerId, u32>,
    /// Built improvements.
    pub improvements: BTreeSet<ImprovementId>,
    /// Current production target.
    pub production: ProductionTarget,
    /// Shields accumulated toward production.
    pub shield_stock: i32,
    pub food_stock: i32,
    pub pollution: i32,
    pub turn_founded: i32,
    /// Whether production was bought this turn.
    pub did_buy: bool,
    pub capital: bool,
    pub worklist: Worklist,
    /// Squared work radius.
    pub radius_sq: u32,
    /// Tiles worked by citizens, including the center.
    pub worked: BTreeSet<TileIndex>,
    pub worker_task: Option<WorkerTask>,
}

impl City {
    /// Create a size-1 city working only its center tile.
    pub fn new(
        id: CityId,
        owner: PlayerId,
        name: &str,
        tile: TileIndex,
        num_specialists: usize,
        radius_sq: u32,
    ) -> Self {
        Self {
            id,
            owner,
            original_owner: owner,
            name: name.to_string(),
            tile,
            size: 1,
            specialists: vec![0; num_specialists],
            nationality: BTreeMap::new(),
            improvements: BTreeSet::new(),
            production: ProductionTarget::Unit(0),
            shield_stock: 0,
            food_stock: 0,
            pollution: 0,
            turn_founded: 0,
            did_buy: false,
            capital: false,
            worklist: Worklist::new(),
            radius_sq,
            worked: BTreeSet::from([tile]),
            worker_task: None,
        }
    }

    /// Total specialist citizens.
    pub fn specialists_total(&self) -> u32 {
        self.specialists.iter().sum()
    }

    /// Size implied by specialists and worked tiles.
    pub fn implied_size(&self, free_worked_tiles: u32) -> u32 {
        self.specialists_total() + (self.worked.len() as u32).saturating_sub(free_worked_tiles)
    }

    /// Whether citizens, specialists and worked tiles agree.
    pub fn is_size_consistent(&self, free_worked_tiles: u32) -> bool {
        self.size == self.implied_size(free_worked_tiles)
    }

    pub fn has_improvement(&self, improvement: ImprovementId) -> bool {
        self.improvements.contains(&improvement)
    }

    /// Total citizens recorded in the nationality table.
    pub fn nationality_total(&self) -> u32 {
        self.nationality.values().sum()
    }
}
