//! The admitted solution set, unique by schedule combination.

use std::collections::HashSet;

use crate::search::{ScheduleCombination, Solution};

#[derive(Debug, Default)]
pub struct SolutionSet {
    solutions: Vec<Solution>,
    keys: HashSet<ScheduleCombination>,
}

impl SolutionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless a solution with the same schedule combination is
    /// already present; the rejected solution is handed back.
    pub fn insert(&mut self, solution: Solution) -> Result<(), Solution> {
        if self.keys.contains(&solution.key) {
            return Err(solution);
        }
        self.keys.insert(solution.key.clone());
        self.solutions.push(solution);
        Ok(())
    }

    pub fn contains(&self, key: &ScheduleCombination) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    /// Solutions in admission order.
    pub fn iter(&self) -> impl Iterator<Item = &Solution> {
        self.solutions.iter()
    }

    pub fn remove(&mut self, key: &ScheduleCombination) -> Option<Solution> {
        let idx = self.solutions.iter().position(|s| &s.key == key)?;
        self.keys.remove(key);
        Some(self.solutions.remove(idx))
    }

    /// Keep solutions matching `keep`; return the others.
    pub fn retain(&mut self, mut keep: impl FnMut(&Solution) -> bool) -> Vec<Solution> {
        let (kept, removed): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.solutions).into_iter().partition(|s| keep(s));
        for s in &removed {
            self.keys.remove(&s.key);
        }
        self.solutions = kept;
        removed
    }

    pub fn take(&mut self) -> Vec<Solution> {
        self.keys.clear();
        std::mem::take(&mut self.solutions)
    }
}
