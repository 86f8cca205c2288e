//! Pattern registry
//!
//! The ordered list of patterns an engine can switch between. Indices and
//! names are stable: clients address patterns by either.

use super::random_depth::DEFAULT_SEED;
use super::{
    AnyPattern, Deeper, HalfNHalf, Insist, RandomDepth, RoboStroke, StopNGo, TeasingPounding,
};

/// Registered pattern names in index order
pub const PATTERN_NAMES: [&str; 7] = [
    TeasingPounding::NAME,
    RoboStroke::NAME,
    HalfNHalf::NAME,
    Deeper::NAME,
    StopNGo::NAME,
    Insist::NAME,
    RandomDepth::NAME,
];

/// Factory for the built-in patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternRegistry {
    seed: u64,
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl PatternRegistry {
    /// All built-in patterns
    pub const fn standard() -> Self {
        Self { seed: DEFAULT_SEED }
    }

    /// Seed for patterns that draw random numbers
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn len(&self) -> usize {
        PATTERN_NAMES.len()
    }

    pub fn is_empty(&self) -> bool {
        PATTERN_NAMES.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&'static str> {
        PATTERN_NAMES.get(index).copied()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        PATTERN_NAMES.iter().position(|n| *n == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        PATTERN_NAMES.iter().copied()
    }

    /// Create a fresh instance of the pattern at `index`
    pub fn create(&self, index: usize) -> Option<AnyPattern> {
        let pattern = match index {
            0 => AnyPattern::TeasingPounding(TeasingPounding::new()),
            1 => AnyPattern::RoboStroke(RoboStroke::new()),
            2 => AnyPattern::HalfNHalf(HalfNHalf::new()),
            3 => AnyPattern::Deeper(Deeper::new()),
            4 => AnyPattern::StopNGo(StopNGo::new()),
            5 => AnyPattern::Insist(Insist::new()),
            6 => AnyPattern::RandomDepth(RandomDepth::with_seed(self.seed)),
            _ => return None,
        };
        Some(pattern)
    }

    pub fn create_by_name(&self, name: &str) -> Option<AnyPattern> {
        self.index_of(name).and_then(|index| self.create(index))
    }
}
