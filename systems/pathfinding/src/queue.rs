//! Flat priority queue shared by both solvers.

/// Minimum-first priority queue backed by an unsorted list.
///
/// Insertion is constant time and removal scans every pending element, which
/// stays cheap for the grid sizes the solvers work on. Equal priorities are
/// served in insertion order.
#[derive(Clone, Debug)]
pub struct PriorityQueue<T, P = f32> {
    elements: Vec<(T, P)>,
}

impl<T, P> Default for PriorityQueue<T, P> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
        }
    }
}

impl<T, P> PriorityQueue<T, P>
where
    P: PartialOrd + Copy,
{
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item with the provided priority.
    pub fn enqueue(&mut self, item: T, priority: P) {
        self.elements.push((item, priority));
    }

    /// Removes the item with the smallest priority.
    pub fn dequeue(&mut self) -> Option<T> {
        self.dequeue_with_priority().map(|(item, _)| item)
    }

    /// Removes the item with the smallest priority together with that priority.
    pub fn dequeue_with_priority(&mut self) -> Option<(T, P)> {
        let mut best: Option<(usize, P)> = None;
        for (index, (_, priority)) in self.elements.iter().enumerate() {
            let improves = match best {
                Some((_, best_priority)) => *priority < best_priority,
                None => true,
            };
            if improves {
                best = Some((index, *priority));
            }
        }
        best.map(|(index, _)| self.elements.remove(index))
    }

    /// Number of pending items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Reports whether no items are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Drops every pending item, keeping the allocation.
    pub fn clear(&mut self) {
        self.elements.clear();
    }
}
