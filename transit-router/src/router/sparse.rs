//! A set of small integer indices with O(1) clear.

/// Set over `0..capacity` that remembers insertion order.
///
/// Membership is tracked with a generation stamp per slot, so clearing only
/// bumps the generation and truncates the member list. Iteration visits
/// members only, never the full capacity.
#[derive(Debug, Clone, Default)]
pub struct SparseIndexSet {
    stamp: Vec<u32>,
    generation: u32,
    members: Vec<usize>,
}

impl SparseIndexSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            stamp: vec![0; capacity],
            generation: 1,
            members: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.stamp.len()
    }

    /// Mark an index. Returns true if it was not already marked.
    ///
    /// # Panics
    ///
    /// Panics if `index >= capacity`.
    pub fn insert(&mut self, index: usize) -> bool {
        if self.stamp[index] == self.generation {
            return false;
        }
        self.stamp[index] = self.generation;
        self.members.push(index);
        true
    }

    pub fn contains(&self, index: usize) -> bool {
        self.stamp.get(index) == Some(&self.generation)
    }

    pub fn clear(&mut self) {
        self.members.clear();
        if self.generation == u32::MAX {
            self.stamp.fill(0);
            self.generation = 1;
        } else {
            self.generation += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied()
    }

    /// Members in insertion order, as a slice.
    pub fn as_slice(&self) -> &[usize] {
        &self.members
    }
}
