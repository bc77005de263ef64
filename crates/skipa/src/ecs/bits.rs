//! Growable component bitsets ("signatures").
//!
//! One bit per [`ComponentKind`]. Words are `u64` and the set grows on demand,
//! so there is no hard cap on the number of component types. Trailing zero
//! words are trimmed on every clear, which keeps derived equality meaningful:
//! two sets with the same bits compare equal regardless of history.

use std::fmt;

use super::kind::ComponentKind;

const WORD_BITS: usize = 64;

/// A set of component kinds.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ComponentBits {
    words: Vec<u64>,
}

impl ComponentBits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, kind: ComponentKind) {
        let (word, bit) = locate(kind);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= bit;
    }

    pub fn clear(&mut self, kind: ComponentKind) {
        let (word, bit) = locate(kind);
        if let Some(w) = self.words.get_mut(word) {
            *w &= !bit;
        }
        self.trim();
    }

    pub fn contains(&self, kind: ComponentKind) -> bool {
        let (word, bit) = locate(kind);
        self.words.get(word).is_some_and(|w| w & bit != 0)
    }

    /// `true` if every bit of `other` is also set here.
    pub fn contains_all(&self, other: &ComponentBits) -> bool {
        other.words.iter().enumerate().all(|(i, &theirs)| {
            let ours = self.words.get(i).copied().unwrap_or(0);
            ours & theirs == theirs
        })
    }

    /// `true` if at least one bit is set in both.
    pub fn intersects(&self, other: &ComponentBits) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .any(|(a, b)| a & b != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of set bits.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Set kinds in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            (0..WORD_BITS)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| ComponentKind((i * WORD_BITS + bit) as u32))
        })
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

fn locate(kind: ComponentKind) -> (usize, u64) {
    let index = kind.index();
    (index / WORD_BITS, 1u64 << (index % WORD_BITS))
}

impl FromIterator<ComponentKind> for ComponentBits {
    fn from_iter<I: IntoIterator<Item = ComponentKind>>(iter: I) -> Self {
        let mut bits = ComponentBits::new();
        for kind in iter {
            bits.set(kind);
        }
        bits
    }
}

impl fmt::Debug for ComponentBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|k| k.0)).finish()
    }
}
