//! Search labels and their arena.
//!
//! Every accepted label is appended to a [`PathArena`] and addressed by a
//! [`PathId`]. A label's predecessor is always an older entry of the same
//! arena, so predecessor chains are finite and acyclic. The engine keeps one
//! "current best" `PathId` per route-stop; replacing it never invalidates a
//! chain that still points at the previous label.

use crate::network::{DepartureIndex, RouteStopIndex};

/// Handle of a [`PathElement`] in a [`PathArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathId(usize);

impl PathId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// How a label's route-stop was reached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arrival {
    /// Directly from the access candidate at position `candidate`.
    Access { candidate: usize },
    /// By a vehicle boarded at the predecessor's route-stop.
    Ride {
        departure: DepartureIndex,
        /// When the vehicle left the boarding route-stop.
        boarding_time: f64,
    },
    /// On foot from the predecessor's stop.
    Transfer {
        /// Walking time, after applying the minimal transfer time.
        duration: f64,
        /// Walking cost plus transfer penalty of this transfer alone.
        cost: f64,
    },
}

/// Best-known arrival at a route-stop.
#[derive(Debug, Clone, PartialEq)]
pub struct PathElement {
    pub coming_from: Option<PathId>,
    pub route_stop: RouteStopIndex,
    pub arrival: Arrival,
    pub arrival_time: f64,
    pub arrival_cost: f64,
    /// Transfer penalties attributed along the chain so far.
    pub arrival_transfer_cost: f64,
    pub transfer_count: usize,
}

impl PathElement {
    pub fn is_transfer(&self) -> bool {
        matches!(self.arrival, Arrival::Transfer { .. })
    }

    pub fn is_ride(&self) -> bool {
        matches!(self.arrival, Arrival::Ride { .. })
    }

    /// Whether a candidate with this cost and transfer count beats `self`:
    /// lower cost wins, equal cost with fewer transfers wins.
    pub fn is_beaten_by(&self, cost: f64, transfer_count: usize) -> bool {
        cost < self.arrival_cost
            || (cost == self.arrival_cost && transfer_count < self.transfer_count)
    }
}

/// Append-only store of labels, cleared between queries.
#[derive(Debug, Default)]
pub struct PathArena {
    elements: Vec<PathElement>,
}

impl PathArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: Vec::with_capacity(capacity),
        }
    }

    /// Forget all labels, keeping the allocation.
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    pub fn push(&mut self, element: PathElement) -> PathId {
        debug_assert!(
            element.coming_from.is_none_or(|p| p.0 < self.elements.len()),
            "predecessor must already be stored"
        );
        let id = PathId(self.elements.len());
        self.elements.push(element);
        id
    }

    pub fn get(&self, id: PathId) -> &PathElement {
        &self.elements[id.0]
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The chain from `id` back to its access label, newest first.
    pub fn chain(&self, id: PathId) -> impl Iterator<Item = (PathId, &PathElement)> + '_ {
        std::iter::successors(Some(id), |&current| self.get(current).coming_from)
            .map(|current| (current, self.get(current)))
    }
}
