//! Finding the stops a trip can start or end at.
//!
//! A resolver turns a facility (home, work, ...) into a list of
//! [`InitialStop`]s, each carrying the time and cost of reaching that stop
//! from the facility, or the facility from the stop.

mod beeline;
mod cache;
mod initial_stop;
mod intermodal;

use std::fmt;

use rand::RngCore;

use crate::network::NetworkIndex;

pub use beeline::BeelineWalkResolver;
pub use cache::{AccessCacheConfig, AccessRouteCache};
pub use initial_stop::{AccessRequest, Direction, Facility, InitialStop};
pub use intermodal::{
    AccessLegRouter, AccessModeParams, AttributeFilter, BeelineLegRouter, IntermodalConfig,
    IntermodalResolver, ModeSelection, RouteCharacteristics,
};

/// Produces access or egress candidates for a facility.
///
/// Implementations are shared between concurrent queries. Randomised
/// policies draw from the caller's `rng` so a seeded generator reproduces
/// the same candidates.
pub trait AccessEgressResolver: Send + Sync + fmt::Debug {
    fn find_candidates(
        &self,
        request: &AccessRequest<'_>,
        network: &NetworkIndex,
        rng: &mut dyn RngCore,
    ) -> Vec<InitialStop>;
}
