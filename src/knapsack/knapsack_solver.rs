use anyhow::{Result, anyhow};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt::Display;

use crate::math::{
    fraction::Fraction,
    traits::{One, Signed},
};

use super::{pattern::Pattern, pattern_check::PatternFeasibilityCheck};

/// An item size together with the weight of one copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemType {
    pub size: Fraction,
    pub weight: Fraction,
}

impl ItemType {
    pub fn new(size: Fraction, weight: Fraction) -> Self {
        Self { size, weight }
    }

    /// Weight per unit of size.
    pub fn expansion(&self) -> Fraction {
        &self.weight / &self.size
    }
}

impl Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "size {} weight {}", self.size, self.weight)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct KnapsackStatistics {
    pub nodes_explored: u64,
    pub prunings_bound: u64,
    pub leaves_reached: u64,
    pub incumbent_updates: u64,
    pub max_depth: usize,
}

impl KnapsackStatistics {
    fn on_node_explored(&mut self, depth: usize) {
        self.nodes_explored = self.nodes_explored.saturating_add(1);
        self.max_depth = self.max_depth.max(depth);
    }

    fn on_pruning_bound(&mut self) {
        self.prunings_bound = self.prunings_bound.saturating_add(1);
    }

    fn on_leaf(&mut self) {
        self.leaves_reached = self.leaves_reached.saturating_add(1);
    }

    fn on_incumbent(&mut self) {
        self.incumbent_updates = self.incumbent_updates.saturating_add(1);
    }
}

impl Display for KnapsackStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "nodes explored {}, prunings (bound) {}, leaves {}, incumbent updates {}, max depth {}",
            self.nodes_explored,
            self.prunings_bound,
            self.leaves_reached,
            self.incumbent_updates,
            self.max_depth
        )
    }
}

/// Finds the heaviest pattern of item copies that fits into a bin of capacity one.
///
/// The free space of a pattern is filled with sand of the given expansion. Items with an expansion
/// below the sand expansion can never improve a pattern and are left out of the search. The
/// remaining items are considered in order of decreasing expansion; ties keep their input order.
pub struct KnapsackSolver {
    items: Vec<ItemType>,
    expansions: Vec<Fraction>,
    check: Box<dyn PatternFeasibilityCheck>,
    sand_expansion: Fraction,
}

impl KnapsackSolver {
    /// Sets up a search. Items of identical size and weight are merged; items of identical size
    /// but different weight, sizes outside (0, 1] and a negative sand expansion are errors.
    pub fn new(
        items: Vec<ItemType>,
        check: Box<dyn PatternFeasibilityCheck>,
        sand_expansion: Fraction,
    ) -> Result<Self> {
        if sand_expansion.is_negative() {
            return Err(anyhow!(
                "the sand expansion {} is negative",
                sand_expansion
            ));
        }

        let mut unique: IndexMap<Fraction, ItemType> = IndexMap::new();
        for item in items {
            if !item.size.is_positive() || item.size > Fraction::one() {
                return Err(anyhow!(
                    "item size {} is not in the range (0, 1]",
                    item.size
                ));
            }
            match unique.get(&item.size) {
                Some(existing) if existing.weight != item.weight => {
                    return Err(anyhow!(
                        "item size {} is given with weights {} and {}",
                        item.size,
                        existing.weight,
                        item.weight
                    ));
                }
                Some(_) => {}
                None => {
                    unique.insert(item.size.clone(), item);
                }
            }
        }

        let mut ordered: Vec<(ItemType, Fraction)> = unique
            .into_values()
            .map(|item| {
                let expansion = item.expansion();
                (item, expansion)
            })
            .filter(|(_, expansion)| expansion >= &sand_expansion)
            .collect();
        ordered.sort_by(|(_, a), (_, b)| b.cmp(a));

        let (items, expansions): (Vec<ItemType>, Vec<Fraction>) = ordered.into_iter().unzip();

        Ok(Self {
            items,
            expansions,
            check,
            sand_expansion,
        })
    }

    /// The items that take part in the search, in search order.
    pub fn items(&self) -> &[ItemType] {
        &self.items
    }

    /// Returns the heaviest pattern whose weight including sand strictly exceeds the threshold, or
    /// None if there is no such pattern.
    pub fn solve(&self, weight_threshold: &Fraction) -> Option<Pattern> {
        self.solve_with_statistics(weight_threshold).0
    }

    pub fn solve_with_statistics(
        &self,
        weight_threshold: &Fraction,
    ) -> (Option<Pattern>, KnapsackStatistics) {
        let mut search = self.new_search(weight_threshold);
        let mut pattern = Pattern::new();
        search.run(&mut pattern);

        log::debug!(
            "knapsack search over {} item types: {}",
            self.items.len(),
            search.statistics
        );

        (search.incumbent, search.statistics)
    }

    fn new_search(&self, weight_threshold: &Fraction) -> Search<'_> {
        Search {
            items: &self.items,
            expansions: &self.expansions,
            check: self.check.as_ref(),
            sand_expansion: &self.sand_expansion,
            best_weight: weight_threshold.clone(),
            incumbent: None,
            statistics: KnapsackStatistics::default(),
        }
    }
}

struct Search<'a> {
    items: &'a [ItemType],
    expansions: &'a [Fraction],
    check: &'a dyn PatternFeasibilityCheck,
    sand_expansion: &'a Fraction,
    best_weight: Fraction,
    incumbent: Option<Pattern>,
    statistics: KnapsackStatistics,
}

impl<'a> Search<'a> {
    /// Searches all extensions of the pattern. Afterwards, the pattern is as it was before.
    fn run(&mut self, pattern: &mut Pattern) {
        let root_bound = self.upper_bound(pattern, 0);
        self.branch(pattern, 0, &root_bound);
    }

    /// Weight of the pattern plus its free space filled at the highest expansion that can still
    /// be added from the given index on.
    fn upper_bound(&self, pattern: &Pattern, index: usize) -> Fraction {
        let remaining = pattern.remaining_space();
        let expansion = self.items[index..]
            .iter()
            .zip(self.expansions[index..].iter())
            .find(|(item, _)| item.size < remaining)
            .map(|(_, expansion)| expansion)
            .unwrap_or(self.sand_expansion)
            .max(self.sand_expansion);
        pattern.total_weight() + &(&remaining * expansion)
    }

    fn branch(&mut self, pattern: &mut Pattern, index: usize, parent_bound: &Fraction) {
        self.statistics.on_node_explored(index);

        let bound = self.upper_bound(pattern, index);
        assert!(
            &bound <= parent_bound,
            "the bound {} at depth {} exceeds the bound {} of its parent",
            bound,
            index,
            parent_bound
        );

        if bound <= self.best_weight {
            self.statistics.on_pruning_bound();
            return;
        }

        if index == self.items.len() {
            self.statistics.on_leaf();
            let weight = pattern.weight_incl_filler(self.sand_expansion);
            if weight > self.best_weight {
                log::trace!("new incumbent of weight {:.5}: {}", weight, pattern);
                self.statistics.on_incumbent();
                self.best_weight = weight;
                self.incumbent = Some(pattern.clone());
            }
            return;
        }

        let items = self.items;
        let item = &items[index];

        let mut copies = if self.check.can_add(&item.size, pattern) {
            pattern.max_copies_that_fit(&item.size)
        } else {
            0
        };
        pattern.add_copies(&item.size, &item.weight, copies);

        loop {
            self.branch(pattern, index + 1, &bound);
            if copies == 0 {
                break;
            }
            copies -= 1;
            pattern.remove_one_copy(&item.size);
        }

        pattern.remove_all_copies(&item.size);
    }
}

#[cfg(test)]
mod tests {
    use ntest::timeout;

    use crate::{
        knapsack::{
            pattern::Pattern,
            pattern_check::{AllowAll, MutualExclusion},
        },
        math::{
            fraction::Fraction,
            traits::{One, Zero},
        },
    };

    use super::{ItemType, KnapsackSolver};

    fn f(numerator: u64, denominator: u64) -> Fraction {
        Fraction::from((numerator, denominator))
    }

    fn items(sizes: &[Fraction], weights: &[Fraction]) -> Vec<ItemType> {
        sizes
            .iter()
            .zip(weights.iter())
            .map(|(size, weight)| ItemType::new(size.clone(), weight.clone()))
            .collect()
    }

    fn optimum(items: Vec<ItemType>, sand_expansion: &Fraction) -> Fraction {
        let solver = KnapsackSolver::new(items, Box::new(AllowAll), sand_expansion.clone()).unwrap();
        let pattern = solver.solve(&Fraction::from(-1i64)).unwrap();
        pattern.weight_incl_filler(sand_expansion)
    }

    /// Enumerates all patterns of the sizes 1/2, 1/3 and 1/7 that leave strictly positive space.
    fn brute_force(weights: &[Fraction; 3], sand_expansion: &Fraction) -> Fraction {
        let mut best: Option<Fraction> = None;
        for a in 0..=2usize {
            for b in 0..=3usize {
                for c in 0..=7usize {
                    let size = &(&f(1, 2) * a) + &(&(&f(1, 3) * b) + &(&f(1, 7) * c));
                    if size >= Fraction::one() {
                        continue;
                    }
                    let mut weight = &(&weights[0] * a) + &(&(&weights[1] * b) + &(&weights[2] * c));
                    weight += &size.one_minus() * sand_expansion;
                    best = Some(match best {
                        Some(x) if x >= weight => x,
                        _ => weight,
                    });
                }
            }
        }
        best.unwrap()
    }

    #[test]
    fn knapsack_dominated_by_sand() {
        let solver = KnapsackSolver::new(
            items(&[f(2, 3), f(1, 2)], &[f(1, 1), f(1, 1)]),
            Box::new(AllowAll),
            Fraction::two(),
        )
        .unwrap();
        assert_eq!(solver.items().len(), 1);

        let pattern = solver.solve(&Fraction::zero()).unwrap();
        assert_eq!(pattern.copies_of(&f(1, 2)), 1);
        assert!(!pattern.contains_size(&f(2, 3)));
        assert_eq!(pattern.weight_incl_filler(&Fraction::two()), Fraction::two());

        //nothing is strictly heavier than 2
        assert!(solver.solve(&Fraction::two()).is_none());
    }

    #[test]
    fn knapsack_only_sand() {
        let solver = KnapsackSolver::new(
            items(&[f(1, 2), f(1, 3)], &[f(1, 2), f(1, 3)]),
            Box::new(AllowAll),
            Fraction::two(),
        )
        .unwrap();
        assert!(solver.items().is_empty());

        let pattern = solver.solve(&Fraction::one()).unwrap();
        assert!(pattern.is_empty());
        assert_eq!(pattern.weight_incl_filler(&Fraction::two()), Fraction::two());

        assert!(solver.solve(&Fraction::two()).is_none());
        assert!(solver.solve(&f(3, 1)).is_none());
    }

    #[test]
    fn knapsack_mutual_exclusion() {
        let sizes = [f(1, 2), f(1, 3)];
        let weights = [f(1, 1), f(3, 4)];

        let solver = KnapsackSolver::new(items(&sizes, &weights), Box::new(AllowAll), Fraction::zero())
            .unwrap();
        let pattern = solver.solve(&Fraction::zero()).unwrap();
        assert_eq!(pattern.weight_incl_filler(&Fraction::zero()), f(7, 4));
        assert_eq!(pattern.copies_of(&f(1, 2)), 1);
        assert_eq!(pattern.copies_of(&f(1, 3)), 1);

        let solver = KnapsackSolver::new(
            items(&sizes, &weights),
            Box::new(MutualExclusion::new(f(1, 2), f(1, 3))),
            Fraction::zero(),
        )
        .unwrap();
        let pattern = solver.solve(&Fraction::zero()).unwrap();
        assert_eq!(pattern.weight_incl_filler(&Fraction::zero()), f(3, 2));
        assert_eq!(pattern.copies_of(&f(1, 3)), 2);
        assert!(!pattern.contains_size(&f(1, 2)));
    }

    #[test]
    fn knapsack_closure_check() {
        //at most one copy of anything
        let check = |size: &Fraction, pattern: &Pattern| !pattern.contains_size(size);
        let solver = KnapsackSolver::new(
            items(&[f(1, 3)], &[f(1, 1)]),
            Box::new(check),
            Fraction::zero(),
        )
        .unwrap();
        let pattern = solver.solve(&Fraction::zero()).unwrap();
        assert_eq!(pattern.copies_of(&f(1, 3)), 1);
    }

    #[test]
    #[timeout(10000)]
    fn knapsack_brute_force() {
        let weight_sets = [
            [f(1, 1), f(3, 4), f(1, 5)],
            [f(1, 1), f(1, 2), f(1, 3)],
            [f(3, 5), f(2, 5), f(1, 6)],
        ];
        let sands = [Fraction::zero(), Fraction::one(), f(6, 5)];
        let sizes = [f(1, 2), f(1, 3), f(1, 7)];

        for weights in weight_sets.iter() {
            for sand in sands.iter() {
                let found = optimum(items(&sizes, weights), sand);
                assert_eq!(found, brute_force(weights, sand), "weights {:?} sand {}", weights, sand);
            }
        }
    }

    #[test]
    #[timeout(10000)]
    fn knapsack_monotone() {
        let sizes = [f(1, 2), f(1, 3), f(1, 7)];
        let weights = [f(1, 1), f(3, 4), f(1, 5)];
        let sand = f(1, 2);
        let full = optimum(items(&sizes, &weights), &sand);

        for leave_out in 0..sizes.len() {
            let reduced = items(&sizes, &weights)
                .into_iter()
                .enumerate()
                .filter(|(i, _)| *i != leave_out)
                .map(|(_, item)| item)
                .collect();
            assert!(optimum(reduced, &sand) <= full);
        }
    }

    #[test]
    fn knapsack_restores_pattern() {
        let solver = KnapsackSolver::new(
            items(&[f(1, 2), f(1, 3), f(1, 7)], &[f(1, 1), f(3, 4), f(1, 5)]),
            Box::new(AllowAll),
            Fraction::zero(),
        )
        .unwrap();

        let mut pattern = Pattern::new();
        pattern.add_copies(&f(1, 5), &f(1, 4), 1);
        let before = pattern.clone();

        let mut search = solver.new_search(&Fraction::zero());
        search.run(&mut pattern);

        assert_eq!(pattern, before);
        assert!(search.incumbent.is_some());
        assert!(search.statistics.nodes_explored > 0);
        assert!(search.statistics.incumbent_updates > 0);
    }

    #[test]
    fn knapsack_restores_pattern_below_root() {
        let solver = KnapsackSolver::new(
            items(&[f(1, 2), f(1, 3), f(1, 7)], &[f(1, 1), f(3, 4), f(1, 5)]),
            Box::new(AllowAll),
            Fraction::zero(),
        )
        .unwrap();
        //expansions 2, 9/4 and 7/5
        assert_eq!(solver.items()[0].size, f(1, 3));

        //the first item is decided, the branch continues with 1/2 and 1/7
        let mut pattern = Pattern::new();
        pattern.add_copies(&f(1, 3), &f(3, 4), 1);
        let before = pattern.clone();

        let mut search = solver.new_search(&Fraction::zero());
        let bound = search.upper_bound(&pattern, 1);
        assert_eq!(bound, f(25, 12));
        search.branch(&mut pattern, 1, &bound);

        assert_eq!(pattern, before);
        assert_eq!(pattern.copies_of(&f(1, 3)), 1);
        assert_eq!(pattern.total_weight(), &f(3, 4));

        let incumbent = search.incumbent.unwrap();
        assert_eq!(incumbent.copies_of(&f(1, 3)), 1);
        assert_eq!(incumbent.copies_of(&f(1, 2)), 1);
        assert_eq!(incumbent.weight_incl_filler(&Fraction::zero()), f(39, 20));
    }

    #[test]
    fn knapsack_input_contract() {
        assert!(
            KnapsackSolver::new(items(&[Fraction::zero()], &[f(1, 1)]), Box::new(AllowAll), Fraction::zero())
                .is_err()
        );
        assert!(
            KnapsackSolver::new(items(&[f(3, 2)], &[f(1, 1)]), Box::new(AllowAll), Fraction::zero())
                .is_err()
        );
        assert!(
            KnapsackSolver::new(
                items(&[f(1, 3), f(1, 3)], &[f(1, 1), f(1, 2)]),
                Box::new(AllowAll),
                Fraction::zero()
            )
            .is_err()
        );
        assert!(
            KnapsackSolver::new(items(&[f(1, 3)], &[f(1, 1)]), Box::new(AllowAll), Fraction::from(-1i64))
                .is_err()
        );

        //identical duplicates are merged
        let solver = KnapsackSolver::new(
            items(&[f(1, 3), f(1, 3)], &[f(1, 2), f(1, 2)]),
            Box::new(AllowAll),
            Fraction::zero(),
        )
        .unwrap();
        assert_eq!(solver.items().len(), 1);
        let pattern = solver.solve(&Fraction::zero()).unwrap();
        assert_eq!(pattern.copies_of(&f(1, 3)), 2);
    }

    #[test]
    fn knapsack_order_and_statistics() {
        let solver = KnapsackSolver::new(
            items(&[f(1, 2), f(1, 3), f(1, 4)], &[f(1, 1), f(3, 4), f(1, 2)]),
            Box::new(AllowAll),
            Fraction::zero(),
        )
        .unwrap();
        //expansions 2, 9/4 and 2: the tie keeps the input order
        let order: Vec<Fraction> = solver.items().iter().map(|item| item.size.clone()).collect();
        assert_eq!(order, vec![f(1, 3), f(1, 2), f(1, 4)]);

        let (pattern, statistics) = solver.solve_with_statistics(&Fraction::zero());
        assert!(pattern.is_some());
        assert!(statistics.leaves_reached >= statistics.incumbent_updates);
        assert!(statistics.max_depth <= 3);
    }
}
