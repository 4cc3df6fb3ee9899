//! Compact bit vectors used for per-tile extras, known-tile maps and
//! technology sets.
//!
//! This module provides:
//! - `BitVector`: a growable, fixed-length vector of bits
//! - `PlayerSet`: one bit per player slot, packed into a `u128`

use crate::types::{PlayerId, MAX_PLAYER_SLOTS};
use serde::{Deserialize, Serialize};

const WORD_BITS: usize = 64;

// ============================================================================
// Bit Vector
// ============================================================================

/// A fixed-length vector of bits.
///
/// Bits past `len` are always zero, so two vectors with the same bits set
/// compare equal.
///
/// # Example
/// ```
/// use civstate_core::bitset::BitVector;
///
/// let mut bits = BitVector::new(10);
/// bits.set(3);
/// assert!(bits.get(3));
/// assert_eq!(bits.count_ones(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitVector {
    words: Vec<u64>,
    len: usize,
}

impl BitVector {
    /// Create a vector of `len` cleared bits.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    /// Number of bits in the vector.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the vector holds zero bits.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read a bit. Out-of-range indices read as cleared.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        self.words[index / WORD_BITS] & (1 << (index % WORD_BITS)) != 0
    }

    /// Set a bit. Out-of-range indices are ignored.
    #[inline]
    pub fn set(&mut self, index: usize) {
        if index < self.len {
            self.words[index / WORD_BITS] |= 1 << (index % WORD_BITS);
        }
    }

    /// Clear a bit. Out-of-range indices are ignored.
    #[inline]
    pub fn clear(&mut self, index: usize) {
        if index < self.len {
            self.words[index / WORD_BITS] &= !(1 << (index % WORD_BITS));
        }
    }

    /// Set or clear a bit.
    pub fn assign(&mut self, index: usize, value: bool) {
        if value {
            self.set(index);
        } else {
            self.clear(index);
        }
    }

    /// Clear every bit.
    pub fn clear_all(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Count the set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Check if no bit is set.
    pub fn none(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Iterate over the indices of set bits, ascending.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |i| self.get(*i))
    }
}

// ============================================================================
// Player Set
// ============================================================================

/// A set of player slots, one bit per slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerSet(u128);

impl PlayerSet {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build a set from raw bits.
    pub const fn from_bits(bits: u128) -> Self {
        Self(bits)
    }

    /// Raw bits, slot 0 in the least significant bit.
    pub const fn bits(&self) -> u128 {
        self.0
    }

    /// Check membership.
    pub fn contains(&self, slot: PlayerId) -> bool {
        (slot as usize) < MAX_PLAYER_SLOTS && self.0 & (1u128 << slot) != 0
    }

    /// Add a slot.
    pub fn insert(&mut self, slot: PlayerId) {
        if (slot as usize) < MAX_PLAYER_SLOTS {
            self.0 |= 1u128 << slot;
        }
    }

    /// Remove a slot.
    pub fn remove(&mut self, slot: PlayerId) {
        if (slot as usize) < MAX_PLAYER_SLOTS {
            self.0 &= !(1u128 << slot);
        }
    }

    /// Check if the set is empty.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of slots in the set.
    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// The 32-bit word covering slots `line * 32 .. line * 32 + 32`.
    pub const fn word(&self, line: usize) -> u32 {
        (self.0 >> (line * 32)) as u32
    }

    /// Replace the 32-bit word covering slots `line * 32 .. line * 32 + 32`.
    pub fn set_word(&mut self, line: usize, word: u32) {
        let shift = line * 32;
        self.0 = (self.0 & !((u32::MAX as u128) << shift)) | ((word as u128) << shift);
    }

    /// Iterate over member slots, ascending.
    pub fn iter(&self) -> impl Iterator<Item = PlayerId> + '_ {
        (0..MAX_PLAYER_SLOTS as u16)
            .map(|s| s as PlayerId)
            .filter(move |s| self.contains(*s))
    }
}

impl FromIterator<PlayerId> for PlayerSet {
    fn from_iter<I: IntoIterator<Item = PlayerId>>(iter: I) -> Self {
        let mut set = PlayerSet::empty();
        for slot in iter {
            set.insert(slot);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitvector_set_get_clear() {
        let mut bits = BitVector::new(70);
        bits.set(0);
        bits.set(64);
        bits.set(69);
        assert!(bits.get(0));
        assert!(bits.get(64));
        assert!(bits.get(69));
        assert!(!bits.get(1));
        assert_eq!(bits.count_ones(), 3);

        bits.clear(64);
        assert!(!bits.get(64));
        assert_eq!(bits.iter_ones().collect::<Vec<_>>(), vec![0, 69]);
    }

    #[test]
    fn test_bitvector_out_of_range_is_ignored() {
        let mut bits = BitVector::new(4);
        bits.set(10);
        assert!(!bits.get(10));
        assert!(bits.none());
    }

    #[test]
    fn test_bitvector_equality_ignores_history() {
        let mut a = BitVector::new(8);
        let b = BitVector::new(8);
        a.set(5);
        a.clear(5);
        assert_eq!(a, b);
    }

    #[test]
    fn test_player_set_words() {
        let mut set = PlayerSet::empty();
        set.insert(0);
        set.insert(33);
        set.insert(127);
        assert_eq!(set.word(0), 1);
        assert_eq!(set.word(1), 2);
        assert_eq!(set.word(3), 1 << 31);

        set.set_word(1, 0);
        assert!(!set.contains(33));
        assert!(set.contains(0));
        assert!(set.contains(127));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_player_set_iter() {
        let set: PlayerSet = [3u8, 1, 100].into_iter().collect();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 3, 100]);
    }
}
