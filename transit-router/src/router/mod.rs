//! Least-cost journey search over a [`NetworkIndex`](crate::network::NetworkIndex).
//!
//! The search is a round-based, cost-minimising variant of RAPTOR: each
//! round allows one more vehicle ride, labels carry a cost rather than an
//! arrival time, and a pluggable [`TransferCostPolicy`] prices transfers.
//! The winning label chain is turned into an [`Itinerary`].

mod config;
mod engine;
mod itinerary;
mod path;
mod pool;
mod sparse;
mod transfer_cost;

#[cfg(test)]
mod engine_tests;

pub use config::{
    ConfigError, ModeToModePenalties, ModeToModePenalty, RaptorParameters, RaptorStaticConfig,
    TransferPenalty,
};
pub use engine::{RaptorEngine, SearchStats};
pub use itinerary::{Itinerary, Leg, NonTransitKind, NonTransitLeg, Place, TransitLeg};
pub use path::{Arrival, PathArena, PathElement, PathId};
pub use pool::EnginePool;
pub use sparse::SparseIndexSet;
pub use transfer_cost::{
    FlatTransferCost, TimeProportionalTransferCost, TransferContext, TransferCostPolicy,
};
