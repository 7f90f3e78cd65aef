//! Per-solver search state indexed by dense cell index.

/// Generation-stamped scratch arena holding costs and predecessor links.
///
/// Entries written during an earlier search are ignored once
/// [`SearchScratch::begin`] bumps the generation, so consecutive searches
/// reuse the same allocation without clearing it.
#[derive(Clone, Debug, Default)]
pub struct SearchScratch<C> {
    generation: u32,
    visited: Vec<u32>,
    closed: Vec<u32>,
    costs: Vec<C>,
    parents: Vec<Option<usize>>,
}

impl<C> SearchScratch<C>
where
    C: Copy + Default,
{
    /// Prepares the arena for a new search over `cell_count` cells.
    pub fn begin(&mut self, cell_count: usize) {
        if self.visited.len() != cell_count {
            self.visited.resize(cell_count, 0);
            self.closed.resize(cell_count, 0);
            self.costs.resize(cell_count, C::default());
            self.parents.resize(cell_count, None);
        }

        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.visited.fill(0);
            self.closed.fill(0);
            self.generation = 1;
        }
    }

    /// Generation of the search currently being run.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Best known cost of the cell during the current search.
    #[must_use]
    pub fn cost(&self, index: usize) -> Option<C> {
        if self.visited.get(index) == Some(&self.generation) {
            self.costs.get(index).copied()
        } else {
            None
        }
    }

    /// Predecessor of the cell during the current search.
    #[must_use]
    pub fn parent(&self, index: usize) -> Option<usize> {
        if self.visited.get(index) == Some(&self.generation) {
            self.parents.get(index).copied().flatten()
        } else {
            None
        }
    }

    /// Records a cost and predecessor for the cell.
    pub fn record(&mut self, index: usize, cost: C, parent: Option<usize>) {
        if let (Some(stamp), Some(slot), Some(link)) = (
            self.visited.get_mut(index),
            self.costs.get_mut(index),
            self.parents.get_mut(index),
        ) {
            *stamp = self.generation;
            *slot = cost;
            *link = parent;
        }
    }

    /// Marks the cell as fully expanded.
    pub fn close(&mut self, index: usize) {
        if let Some(stamp) = self.closed.get_mut(index) {
            *stamp = self.generation;
        }
    }

    /// Reports whether the cell was fully expanded during the current search.
    #[must_use]
    pub fn is_closed(&self, index: usize) -> bool {
        self.closed.get(index) == Some(&self.generation)
    }

    /// Walks predecessor links from `goal` back to the search origin.
    ///
    /// Returns the cell indices in start-to-goal order.
    #[must_use]
    pub fn trace(&self, goal: usize) -> Vec<usize> {
        let mut path = vec![goal];
        let mut current = goal;
        while let Some(parent) = self.parent(current) {
            if path.len() > self.visited.len() {
                break;
            }
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }
}
