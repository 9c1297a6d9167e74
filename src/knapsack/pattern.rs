use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;
use std::fmt::Display;

use crate::math::{
    fraction::Fraction,
    traits::{One, Zero},
};

/// Copies of one item size within a pattern. The number of copies is never zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PatternEntry {
    pub size: Fraction,
    pub weight: Fraction,
    pub copies: usize,
}

/// A multiset of items that is packed into a bin of capacity one.
///
/// The free space of the bin is considered to be filled with sand: infinitesimally small items of a
/// fixed weight per unit of size (the sand expansion). The weight of the sand is not included in
/// the total weight and is computed on demand.
///
/// A pattern does not check the capacity of the bin itself; this is up to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    entries: IndexMap<Fraction, PatternEntry>,
    total_size: Fraction,
    total_weight: Fraction,
}

impl Pattern {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            total_size: Fraction::zero(),
            total_weight: Fraction::zero(),
        }
    }

    /// Adds `copies` items of the given size and weight.
    ///
    /// Panics if the size is already present with a different weight, as the weight of an item size
    /// is fixed within one search.
    pub fn add_copies(&mut self, size: &Fraction, weight: &Fraction, copies: usize) {
        if copies == 0 {
            return;
        }

        match self.entries.get_mut(size) {
            Some(entry) => {
                assert!(
                    entry.weight == *weight,
                    "item size {} is present with weight {} but was added with weight {}",
                    size,
                    entry.weight,
                    weight
                );
                entry.copies += copies;
            }
            None => {
                self.entries.insert(
                    size.clone(),
                    PatternEntry {
                        size: size.clone(),
                        weight: weight.clone(),
                        copies,
                    },
                );
            }
        }

        self.total_size += size * copies;
        self.total_weight += weight * copies;
    }

    /// Removes one item of the given size. If it was the last copy, the size disappears from the pattern.
    pub fn remove_one_copy(&mut self, size: &Fraction) {
        let Some(entry) = self.entries.get_mut(size) else {
            return;
        };
        let weight = entry.weight.clone();
        if entry.copies > 1 {
            entry.copies -= 1;
        } else {
            self.entries.shift_remove(size);
        }

        self.total_size -= size;
        self.total_weight -= weight;
    }

    /// Removes all items of the given size.
    pub fn remove_all_copies(&mut self, size: &Fraction) {
        if let Some(entry) = self.entries.shift_remove(size) {
            self.total_size -= &entry.size * entry.copies;
            self.total_weight -= &entry.weight * entry.copies;
        }
    }

    pub fn remaining_space(&self) -> Fraction {
        &Fraction::one() - &self.total_size
    }

    /// Returns how many items of the given size can be added space-wise.
    ///
    /// If the remaining space is an exact multiple of the size, one copy less is returned, such
    /// that a strictly positive amount of sand remains in the bin.
    pub fn max_copies_that_fit(&self, size: &Fraction) -> usize {
        let quotient = &self.remaining_space() / size;
        let copies = quotient.floor_usize().unwrap_or(0);
        if quotient.is_integer() {
            copies.saturating_sub(1)
        } else {
            copies
        }
    }

    pub fn total_size(&self) -> &Fraction {
        &self.total_size
    }

    /// The total weight of the items, excluding sand.
    pub fn total_weight(&self) -> &Fraction {
        &self.total_weight
    }

    pub fn sand_weight(&self, sand_expansion: &Fraction) -> Fraction {
        &self.remaining_space() * sand_expansion
    }

    pub fn weight_incl_filler(&self, sand_expansion: &Fraction) -> Fraction {
        &self.total_weight + &self.sand_weight(sand_expansion)
    }

    /// Sums the weight function over all items of this pattern, excluding sand.
    pub fn weight_components<F>(&self, weight_of_size: F) -> Fraction
    where
        F: Fn(&Fraction) -> Fraction,
    {
        self.entries
            .values()
            .map(|entry| &weight_of_size(&entry.size) * entry.copies)
            .sum()
    }

    pub fn contains_size(&self, size: &Fraction) -> bool {
        self.entries.contains_key(size)
    }

    pub fn copies_of(&self, size: &Fraction) -> usize {
        self.entries.get(size).map_or(0, |entry| entry.copies)
    }

    pub fn entries(&self) -> impl Iterator<Item = &PatternEntry> {
        self.entries.values()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn weight_string(&self) -> String {
        self.entries
            .values()
            .map(|entry| format!("{:.5} [{} times]", entry.weight, entry.copies))
            .join(" , ")
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.entries.is_empty() {
            return write!(f, "only sand");
        }
        write!(
            f,
            "{}",
            self.entries
                .values()
                .map(|entry| format!("{} [{} times]", entry.size, entry.copies))
                .join(" , ")
        )
    }
}
