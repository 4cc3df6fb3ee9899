//! Event cache.
//!
//! Recent game messages are cached so that players reconnecting to a game can
//! be shown what happened while they were away. The cache survives a save and
//! reload (except in scenario saves).

use crate::bitset::PlayerSet;
use crate::types::{PlayerId, TileIndex};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of events kept.
pub const DEFAULT_EVENT_CACHE_SIZE: usize = 256;

/// Who may see a cached event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTarget {
    /// Everyone, observers included.
    All,
    /// Observers only.
    GlobalObservers,
    /// The listed player slots.
    Players(PlayerSet),
}

/// One cached game message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEvent {
    pub turn: i32,
    /// Unix timestamp.
    pub timestamp: i64,
    /// Event type name, e.g. `E_CITY_BUILD`.
    pub event: String,
    /// Tile the message is about, if any.
    pub tile: Option<TileIndex>,
    pub message: String,
    pub target: EventTarget,
}

impl CachedEvent {
    pub fn is_visible_to(&self, slot: PlayerId) -> bool {
        match &self.target {
            EventTarget::All => true,
            EventTarget::GlobalObservers => false,
            EventTarget::Players(set) => set.contains(slot),
        }
    }
}

/// A bounded list of recent events, oldest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCache {
    events: VecDeque<CachedEvent>,
    max_size: usize,
}

impl Default for EventCache {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CACHE_SIZE)
    }
}

impl EventCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            events: VecDeque::new(),
            max_size,
        }
    }

    /// Add an event, dropping the oldest one if the cache is full.
    pub fn push(&mut self, event: CachedEvent) {
        if self.max_size == 0 {
            return;
        }
        while self.events.len() >= self.max_size {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn iter(&self) -> impl Iterator<Item = &CachedEvent> {
        self.events.iter()
    }

    /// Events a player is allowed to see.
    pub fn for_player(&self, slot: PlayerId) -> impl Iterator<Item = &CachedEvent> {
        self.events.iter().filter(move |e| e.is_visible_to(slot))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(turn: i32, target: EventTarget) -> CachedEvent {
        CachedEvent {
            turn,
            timestamp: 0,
            event: "E_CITY_BUILD".to_string(),
            tile: None,
            message: format!("turn {}", turn),
            target,
        }
    }

    #[test]
    fn test_cache_is_bounded() {
        let mut cache = EventCache::new(2);
        cache.push(event(1, EventTarget::All));
        cache.push(event(2, EventTarget::All));
        cache.push(event(3, EventTarget::All));
        let turns: Vec<_> = cache.iter().map(|e| e.turn).collect();
        assert_eq!(turns, vec![2, 3]);
    }

    #[test]
    fn test_visibility() {
        let mut cache = EventCache::default();
        cache.push(event(1, EventTarget::All));
        cache.push(event(2, EventTarget::Players([1u8].into_iter().collect())));
        cache.push(event(3, EventTarget::GlobalObservers));
        assert_eq!(cache.for_player(0).count(), 1);
        assert_eq!(cache.for_player(1).count(), 2);
    }
}
