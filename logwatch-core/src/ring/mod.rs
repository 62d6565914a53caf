use std::collections::VecDeque;


/// Fixed-capacity store that overwrites its oldest entry once full.
///
/// Invariants:
/// - Holds at most `capacity` items
/// - Iteration order is push order, oldest first
#[derive(Debug, Clone)]
pub struct EventRing<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> EventRing<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// O(1); evicts the oldest item when the ring is full.
    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }
}

impl<T: Clone> EventRing<T> {
    /// Fresh copy of the contents, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
