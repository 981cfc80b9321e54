//! Straight-line walking to nearby stops.

use rand::RngCore;
use tracing::debug;

use crate::domain::Mode;
use crate::network::NetworkIndex;

use super::{AccessEgressResolver, AccessRequest, InitialStop};

/// Walks in a straight line to every stop within the search radius.
///
/// When fewer than two stops lie within the radius, the radius is widened
/// to the nearest stop's distance plus the extension radius. Walk time is
/// the beeline distance over the beeline walk speed, rounded up to whole
/// seconds; the reported distance is scaled by the beeline distance factor.
#[derive(Debug, Clone, Copy, Default)]
pub struct BeelineWalkResolver;

impl BeelineWalkResolver {
    pub fn new() -> Self {
        Self
    }
}

impl AccessEgressResolver for BeelineWalkResolver {
    fn find_candidates(
        &self,
        request: &AccessRequest<'_>,
        network: &NetworkIndex,
        _rng: &mut dyn RngCore,
    ) -> Vec<InitialStop> {
        let params = request.params;
        let origin = &request.facility.coord;

        let mut stops = network.stops_within(origin, params.search_radius);
        if stops.len() < 2 {
            if let Some((_, nearest)) = network.nearest_stop(origin) {
                stops = network.stops_within(origin, nearest + params.extension_radius);
            }
        }

        let mode = Mode::non_network_walk();
        let cost_per_second = params.access_mode_cost_per_second(&mode);
        let candidates: Vec<InitialStop> = stops
            .into_iter()
            .map(|stop| {
                let beeline = network.stop(stop).coord.distance(origin);
                let time = (beeline / params.beeline_walk_speed).ceil();
                InitialStop::new(
                    stop,
                    time,
                    time * cost_per_second,
                    beeline * params.beeline_distance_factor,
                    mode.clone(),
                )
            })
            .collect();

        debug!(
            facility = %request.facility.id,
            direction = ?request.direction,
            candidates = candidates.len(),
            "beeline candidates"
        );
        candidates
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::access::{Direction, Facility};
    use crate::domain::Coord;
    use crate::network::{NetworkBuilder, Stop, StopIndex};
    use crate::router::RaptorParameters;

    fn network(xs: &[f64]) -> NetworkIndex {
        let mut builder = NetworkBuilder::new();
        for (i, &x) in xs.iter().enumerate() {
            builder
                .add_stop(Stop::new(format!("s{i}"), format!("Stop {i}"), Coord::new(x, 0.0)))
                .unwrap();
        }
        builder.build().unwrap()
    }

    fn candidates(network: &NetworkIndex, params: &RaptorParameters) -> Vec<InitialStop> {
        let facility = Facility::new("home", Coord::new(0.0, 0.0));
        let traveller = BTreeMap::new();
        let request = AccessRequest::new(&facility, Direction::Access, 28800.0, params, &traveller);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        BeelineWalkResolver::new().find_candidates(&request, network, &mut rng)
    }

    #[test]
    fn stops_within_radius() {
        let network = network(&[100.0, 400.0, 900.0, 2500.0]);
        let params = RaptorParameters::default();

        let found = candidates(&network, &params);

        let stops: Vec<StopIndex> = found.iter().map(|c| c.stop).collect();
        assert_eq!(stops, vec![StopIndex(0), StopIndex(1), StopIndex(2)]);
        assert!(found.iter().all(|c| c.mode == Mode::non_network_walk()));
    }

    #[test]
    fn time_cost_and_distance() {
        let network = network(&[100.0, 400.0]);
        let params = RaptorParameters::default();

        let found = candidates(&network, &params);
        let first = &found[0];

        // 100m at 1.34 m/s is 74.6s
        assert_eq!(first.time, 75.0);
        assert!((first.cost - 75.0 * 12.0 / 3600.0).abs() < 1e-12);
        assert!((first.distance - 130.0).abs() < 1e-9);
    }

    #[test]
    fn access_mode_utility_overrides_walk() {
        let network = network(&[100.0, 400.0]);
        let mut params = RaptorParameters::default();
        params
            .access_mode_utilities
            .insert(Mode::non_network_walk(), -36.0);

        let found = candidates(&network, &params);
        assert!((found[0].cost - 75.0 * 36.0 / 3600.0).abs() < 1e-12);
    }

    #[test]
    fn radius_is_extended_when_too_few_stops() {
        // Nothing within 1000m; nearest at 3000m, extension 200m
        let network = network(&[3000.0, 3150.0, 3300.0]);
        let params = RaptorParameters::default();

        let stops: Vec<StopIndex> = candidates(&network, &params).iter().map(|c| c.stop).collect();
        assert_eq!(stops, vec![StopIndex(0), StopIndex(1)]);
    }

    #[test]
    fn a_single_stop_in_range_also_extends() {
        let network = network(&[50.0, 1100.0, 1300.0]);
        let params = RaptorParameters::default();

        // 50 + 200 does not reach the second stop
        let stops: Vec<StopIndex> = candidates(&network, &params).iter().map(|c| c.stop).collect();
        assert_eq!(stops, vec![StopIndex(0)]);
    }

    #[test]
    fn empty_network_has_no_candidates() {
        let network = network(&[]);
        assert!(candidates(&network, &RaptorParameters::default()).is_empty());
    }
}
