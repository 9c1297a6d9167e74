use crate::math::fraction::Fraction;

use super::pattern::Pattern;

/// Decides whether an item size may be added to a pattern, given the items already in it.
///
/// The capacity of the bin is not part of this check.
pub trait PatternFeasibilityCheck {
    fn can_add(&self, size: &Fraction, pattern: &Pattern) -> bool;
}

/// Every combination of items is allowed.
#[derive(Clone, Debug, Default)]
pub struct AllowAll;

impl PatternFeasibilityCheck for AllowAll {
    fn can_add(&self, _size: &Fraction, _pattern: &Pattern) -> bool {
        true
    }
}

/// Two item sizes that may not appear together in one pattern.
#[derive(Clone, Debug)]
pub struct MutualExclusion {
    pub size_a: Fraction,
    pub size_b: Fraction,
}

impl MutualExclusion {
    pub fn new(size_a: Fraction, size_b: Fraction) -> Self {
        Self { size_a, size_b }
    }
}

impl PatternFeasibilityCheck for MutualExclusion {
    fn can_add(&self, size: &Fraction, pattern: &Pattern) -> bool {
        if size == &self.size_a && pattern.contains_size(&self.size_b) {
            return false;
        }
        if size == &self.size_b && pattern.contains_size(&self.size_a) {
            return false;
        }
        true
    }
}

impl<F> PatternFeasibilityCheck for F
where
    F: Fn(&Fraction, &Pattern) -> bool,
{
    fn can_add(&self, size: &Fraction, pattern: &Pattern) -> bool {
        (self)(size, pattern)
    }
}
