//! Research records.
//!
//! A research record belongs either to a single player or, when research is
//! pooled, to a whole team. Either way it holds the tri-state knowledge of
//! every ruleset technology plus the current target and goal.

use crate::ruleset::Ruleset;
use crate::types::{PlayerId, TeamId, TechId};
use serde::{Deserialize, Serialize};

/// Knowledge state of one technology.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TechState {
    #[default]
    Unknown,
    /// Not known, but every prerequisite is.
    PrereqsKnown,
    Known,
}

/// Which research record a player contributes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResearchKey {
    Player(PlayerId),
    Team(TeamId),
}

impl std::fmt::Display for ResearchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResearchKey::Player(slot) => write!(f, "player {}", slot),
            ResearchKey::Team(team) => write!(f, "team {}", team),
        }
    }
}

/// A research record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Research {
    pub key: ResearchKey,
    /// Technology currently being researched.
    pub researching: Option<TechId>,
    /// Long-term research goal.
    pub goal: Option<TechId>,
    /// Bulbs accumulated toward `researching`.
    pub bulbs_researched: i32,
    /// Number of technologies learned so far.
    pub techs_researched: u32,
    /// One state per ruleset technology.
    pub inventions: Vec<TechState>,
}

impl Research {
    pub fn new(key: ResearchKey, num_techs: usize) -> Self {
        Self {
            key,
            researching: None,
            goal: None,
            bulbs_researched: 0,
            techs_researched: 0,
            inventions: vec![TechState::Unknown; num_techs],
        }
    }

    pub fn state(&self, tech: TechId) -> TechState {
        self.inventions.get(tech).copied().unwrap_or_default()
    }

    pub fn is_known(&self, tech: TechId) -> bool {
        self.state(tech) == TechState::Known
    }

    /// Mark a technology known. Prerequisite states are not refreshed; call
    /// [`Research::recompute_prereqs`] afterwards.
    pub fn set_known(&mut self, tech: TechId) {
        if let Some(state) = self.inventions.get_mut(tech) {
            *state = TechState::Known;
        }
    }

    /// Number of known technologies.
    pub fn known_count(&self) -> usize {
        self.inventions
            .iter()
            .filter(|s| **s == TechState::Known)
            .count()
    }

    /// Whether the technology can be researched right now.
    pub fn can_research(&self, tech: TechId) -> bool {
        self.state(tech) == TechState::PrereqsKnown
    }

    /// Refresh the unknown / prerequisites-known split from the known set.
    pub fn recompute_prereqs(&mut self, ruleset: &Ruleset) {
        for tech in 0..self.inventions.len() {
            if self.inventions[tech] == TechState::Known {
                continue;
            }
            let ready = ruleset
                .tech_reqs(tech)
                .into_iter()
                .all(|req| self.is_known(req));
            self.inventions[tech] = if ready {
                TechState::PrereqsKnown
            } else {
                TechState::Unknown
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_techs_are_researchable() {
        let ruleset = Ruleset::classic();
        let mut research = Research::new(ResearchKey::Player(0), ruleset.techs.len());
        research.recompute_prereqs(&ruleset);

        let alphabet = ruleset.tech_by_name("Alphabet").unwrap();
        let writing = ruleset.tech_by_name("Writing").unwrap();
        assert!(research.can_research(alphabet));
        assert!(!research.can_research(writing));
    }

    #[test]
    fn test_learning_unlocks_dependents() {
        let ruleset = Ruleset::classic();
        let mut research = Research::new(ResearchKey::Team(1), ruleset.techs.len());
        let alphabet = ruleset.tech_by_name("Alphabet").unwrap();
        let writing = ruleset.tech_by_name("Writing").unwrap();

        research.set_known(alphabet);
        research.recompute_prereqs(&ruleset);
        assert!(research.is_known(alphabet));
        assert!(research.can_research(writing));
        assert_eq!(research.known_count(), 1);
    }

    #[test]
    fn test_out_of_range_tech_is_unknown() {
        let research = Research::new(ResearchKey::Player(0), 3);
        assert_eq!(research.state(99), TechState::Unknown);
    }

    #[test]
    fn test_research_key_ordering() {
        assert!(ResearchKey::Player(5) < ResearchKey::Team(0));
        assert_eq!(ResearchKey::Team(2).to_string(), "team 2");
    }
}
