//! Round-based least-cost search.
//!
//! Each round scans every route touched by a route-stop improved in the
//! previous round, riding vehicles from route-stops reached earlier to
//! later route-stops of the same route, then relaxes footpath transfers from
//! the route-stops reached by those rides. Round `k` therefore finds trips
//! with up to `k` transfers. A running bound on the best known arrival cost
//! at any destination route-stop prunes labels that can no longer win.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::access::InitialStop;
use crate::domain::Mode;
use crate::network::{DepartureIndex, NetworkIndex, RouteIndex, RouteStopIndex};

use super::config::RaptorParameters;
use super::itinerary::{Itinerary, Leg, NonTransitKind, NonTransitLeg, Place, TransitLeg};
use super::path::{Arrival, PathArena, PathElement, PathId};
use super::sparse::SparseIndexSet;
use super::transfer_cost::{TransferContext, TransferCostPolicy};

/// Counters describing the last query run by an engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchStats {
    /// Rounds executed.
    pub rounds: usize,
    /// Route-stops improved by transfers at the end of each round.
    pub improved_per_round: Vec<usize>,
    /// Whether the search stopped at the round cap rather than converging.
    pub round_cap_hit: bool,
    /// Labels created, including replaced ones.
    pub labels: usize,
}

/// The vehicle currently held while scanning a route.
#[derive(Debug, Clone, Copy)]
struct Boarding {
    route_stop: RouteStopIndex,
    path: PathId,
    departure: DepartureIndex,
    enter_time: f64,
    waiting_time: f64,
    cost: f64,
    transfer_cost: f64,
    transfer_count: usize,
}

/// Egress cost and candidate position for a destination route-stop.
#[derive(Debug, Clone, Copy)]
struct Egress {
    cost: f64,
    candidate: usize,
}

/// Search engine with per-query scratch state sized to one network.
///
/// Not shareable between concurrent queries; use one engine per thread or
/// draw engines from an [`EnginePool`](super::EnginePool). All engines may
/// share the same `Arc<NetworkIndex>`.
#[derive(Debug)]
pub struct RaptorEngine {
    network: Arc<NetworkIndex>,
    policy: Arc<dyn TransferCostPolicy>,

    arena: PathArena,
    best_path: Vec<Option<PathId>>,
    egress: Vec<Option<Egress>>,
    earliest_route_stop: Vec<Option<RouteStopIndex>>,

    labelled: SparseIndexSet,
    destinations: SparseIndexSet,
    improved: SparseIndexSet,
    reached: SparseIndexSet,
    touched_routes: SparseIndexSet,
    relax_from: Vec<(RouteStopIndex, PathId)>,

    best_arrival_cost: f64,
    stats: SearchStats,
}

impl RaptorEngine {
    /// Create an engine with scratch space sized for `network`.
    pub fn new(network: Arc<NetworkIndex>, policy: Arc<dyn TransferCostPolicy>) -> Self {
        let route_stops = network.route_stop_count();
        let routes = network.route_count();
        Self {
            arena: PathArena::with_capacity(route_stops),
            best_path: vec![None; route_stops],
            egress: vec![None; route_stops],
            earliest_route_stop: vec![None; routes],
            labelled: SparseIndexSet::new(route_stops),
            destinations: SparseIndexSet::new(route_stops),
            improved: SparseIndexSet::new(route_stops),
            reached: SparseIndexSet::new(route_stops),
            touched_routes: SparseIndexSet::new(routes),
            relax_from: Vec::new(),
            best_arrival_cost: f64::INFINITY,
            stats: SearchStats::default(),
            network,
            policy,
        }
    }

    /// The network this engine searches.
    pub fn network(&self) -> &Arc<NetworkIndex> {
        &self.network
    }

    /// The transfer cost policy applied to every query.
    pub fn policy(&self) -> &Arc<dyn TransferCostPolicy> {
        &self.policy
    }

    /// Statistics of the most recent query.
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// The label currently held for a route-stop after the last query.
    pub fn arrival_at(&self, route_stop: RouteStopIndex) -> Option<&PathElement> {
        self.best_path[route_stop.0].map(|id| self.arena.get(id))
    }

    /// Find the least-cost itinerary leaving at `departure_time` from any
    /// access candidate to any egress candidate, using at most `max_rounds`
    /// transfers.
    ///
    /// Returns `None` when no egress candidate can be reached.
    pub fn find_best_itinerary(
        &mut self,
        departure_time: f64,
        access: &[InitialStop],
        egress: &[InitialStop],
        max_rounds: usize,
        params: &RaptorParameters,
    ) -> Option<Itinerary> {
        let network = Arc::clone(&self.network);
        let policy = Arc::clone(&self.policy);

        self.reset();
        self.init_egress(&network, egress);
        self.init_access(&network, departure_time, access);

        for round in 0..=max_rounds {
            self.stats.rounds = round + 1;

            let mut touched = std::mem::take(&mut self.touched_routes);
            touched.clear();
            for rs in self.improved.iter() {
                touched.insert(network.route_stop(RouteStopIndex(rs)).route.0);
            }
            self.improved.clear();
            self.reached.clear();

            for &route in touched.as_slice() {
                self.scan_route(&network, RouteIndex(route), params);
            }

            trace!(
                round,
                touched_routes = touched.len(),
                reached = self.reached.len(),
                best_arrival_cost = self.best_arrival_cost,
                "route scan complete"
            );
            self.touched_routes = touched;

            self.relax_transfers(&network, policy.as_ref(), departure_time, params);
            self.stats.improved_per_round.push(self.improved.len());

            trace!(round, improved = self.improved.len(), "transfers relaxed");

            if self.improved.is_empty() {
                break;
            }
        }
        self.stats.round_cap_hit = !self.improved.is_empty();
        self.stats.labels = self.arena.len();

        let itinerary = self.reconstruct(&network, departure_time, access, egress);
        debug!(
            rounds = self.stats.rounds,
            labels = self.stats.labels,
            round_cap_hit = self.stats.round_cap_hit,
            found = itinerary.is_some(),
            cost = itinerary.as_ref().map(Itinerary::total_cost),
            "search complete"
        );
        itinerary
    }

    fn reset(&mut self) {
        for rs in self.labelled.iter() {
            self.best_path[rs] = None;
        }
        self.labelled.clear();
        for rs in self.destinations.iter() {
            self.egress[rs] = None;
        }
        self.destinations.clear();
        self.earliest_route_stop.fill(None);
        self.improved.clear();
        self.reached.clear();
        self.arena.clear();
        self.best_arrival_cost = f64::INFINITY;
        self.stats = SearchStats::default();
    }

    fn init_egress(&mut self, network: &NetworkIndex, egress: &[InitialStop]) {
        for (candidate, stop) in egress.iter().enumerate() {
            let route_stops = network.route_stops_at(stop.stop);
            if route_stops.is_empty() {
                warn!(stop = %network.stop(stop.stop).id, "egress stop is not served by any route");
            }
            for &rs in route_stops {
                let better = self.egress[rs.0].is_none_or(|e| stop.cost < e.cost);
                if better {
                    self.egress[rs.0] = Some(Egress {
                        cost: stop.cost,
                        candidate,
                    });
                    self.destinations.insert(rs.0);
                }
            }
        }
    }

    fn init_access(&mut self, network: &NetworkIndex, departure_time: f64, access: &[InitialStop]) {
        for (candidate, stop) in access.iter().enumerate() {
            let route_stops = network.route_stops_at(stop.stop);
            if route_stops.is_empty() {
                warn!(stop = %network.stop(stop.stop).id, "access stop is not served by any route");
            }
            for &rs in route_stops {
                if !self.improves(rs, stop.cost, 0) {
                    continue;
                }
                let path = self.arena.push(PathElement {
                    coming_from: None,
                    route_stop: rs,
                    arrival: Arrival::Access { candidate },
                    arrival_time: departure_time + stop.time,
                    arrival_cost: stop.cost,
                    arrival_transfer_cost: 0.0,
                    transfer_count: 0,
                });
                self.set_best(rs, path);
                self.improved.insert(rs.0);
                self.update_earliest_route_stop(network, rs);
            }
        }
    }

    fn scan_route(&mut self, network: &NetworkIndex, route_index: RouteIndex, params: &RaptorParameters) {
        let route = network.route(route_index);
        let first = self.earliest_route_stop[route_index.0]
            .take()
            .unwrap_or_else(|| route.first_route_stop());
        let waiting_cost = params.waiting_cost_per_second();
        let in_vehicle_cost = params.in_vehicle_cost_per_second();

        let mut boarding: Option<Boarding> = None;
        for rs in (first.0..route.route_stop_end()).map(RouteStopIndex) {
            if let Some(path) = self.best_path[rs.0] {
                let pe = self.arena.get(path);
                let time = pe.arrival_time;
                let next = network.next_departure(rs, time);
                let boards_earlier = match (next, &boarding) {
                    (Some(_), None) => true,
                    (Some(departure), Some(current)) => departure < current.departure,
                    (None, _) => false,
                };
                if boards_earlier {
                    if let Some(departure) = next {
                        let enter_time = time.max(network.vehicle_arrival(departure, rs));
                        boarding = Some(Boarding {
                            route_stop: rs,
                            path,
                            departure,
                            enter_time,
                            waiting_time: enter_time - time,
                            cost: pe.arrival_cost,
                            transfer_cost: pe.arrival_transfer_cost,
                            transfer_count: pe.transfer_count,
                        });
                    }
                    continue;
                }
            }

            let Some(current) = boarding else {
                continue;
            };
            let arrival_time = network.vehicle_arrival(current.departure, rs);
            let cost = current.cost
                + current.waiting_time * waiting_cost
                + (arrival_time - current.enter_time) * in_vehicle_cost;
            if cost > self.best_arrival_cost || !self.improves(rs, cost, current.transfer_count) {
                continue;
            }
            let path = self.arena.push(PathElement {
                coming_from: Some(current.path),
                route_stop: rs,
                arrival: Arrival::Ride {
                    departure: current.departure,
                    boarding_time: network.vehicle_departure(current.departure, current.route_stop),
                },
                arrival_time,
                arrival_cost: cost,
                arrival_transfer_cost: current.transfer_cost,
                transfer_count: current.transfer_count,
            });
            self.set_best(rs, path);
            self.reached.insert(rs.0);
        }
    }

    fn relax_transfers(
        &mut self,
        network: &NetworkIndex,
        policy: &dyn TransferCostPolicy,
        departure_time: f64,
        params: &RaptorParameters,
    ) {
        // Relax from the ride labels, not from transfer labels written
        // earlier in this stage.
        let mut relax_from = std::mem::take(&mut self.relax_from);
        relax_from.clear();
        relax_from.extend(self.reached.iter().filter_map(|rs| {
            self.best_path[rs].map(|path| (RouteStopIndex(rs), path))
        }));

        let walk_cost = params.walk_cost_per_second();
        for &(from_rs, from_path) in &relax_from {
            let from = self.arena.get(from_path);
            if from.arrival_cost > self.best_arrival_cost {
                continue;
            }
            let (from_time, from_cost) = (from.arrival_time, from.arrival_cost);
            let (from_transfer_cost, transfer_count) =
                (from.arrival_transfer_cost, from.transfer_count + 1);
            let from_mode: &Mode = network.mode_of(from_rs);

            for transfer in network.transfers_from(network.route_stop(from_rs).stop) {
                let duration = transfer.duration.max(params.min_transfer_time);
                let arrival_time = from_time + duration;
                for &to_rs in network.route_stops_at(transfer.to) {
                    let ctx = TransferContext {
                        arena: &self.arena,
                        from: from_path,
                        from_mode,
                        to_mode: network.mode_of(to_rs),
                        arrival_time,
                        total_travel_time: arrival_time - departure_time,
                        transfer_count,
                        existing_transfer_cost: from_transfer_cost,
                        params,
                    };
                    let increment = policy.transfer_cost(&ctx, network);
                    let transfer_cost = duration * walk_cost + increment;
                    let cost = from_cost + transfer_cost;
                    if cost > self.best_arrival_cost || !self.improves(to_rs, cost, transfer_count) {
                        continue;
                    }
                    let path = self.arena.push(PathElement {
                        coming_from: Some(from_path),
                        route_stop: to_rs,
                        arrival: Arrival::Transfer {
                            duration,
                            cost: transfer_cost,
                        },
                        arrival_time,
                        arrival_cost: cost,
                        arrival_transfer_cost: from_transfer_cost + increment,
                        transfer_count,
                    });
                    self.set_best(to_rs, path);
                    self.improved.insert(to_rs.0);
                    self.update_earliest_route_stop(network, to_rs);
                }
            }
        }
        self.relax_from = relax_from;
    }

    fn improves(&self, rs: RouteStopIndex, cost: f64, transfer_count: usize) -> bool {
        self.best_path[rs.0].is_none_or(|id| self.arena.get(id).is_beaten_by(cost, transfer_count))
    }

    /// Record a new best label and tighten the destination bound.
    fn set_best(&mut self, rs: RouteStopIndex, path: PathId) {
        self.best_path[rs.0] = Some(path);
        self.labelled.insert(rs.0);
        if let Some(egress) = self.egress[rs.0] {
            let total = self.arena.get(path).arrival_cost + egress.cost;
            if total < self.best_arrival_cost {
                self.best_arrival_cost = total;
            }
        }
    }

    fn update_earliest_route_stop(&mut self, network: &NetworkIndex, rs: RouteStopIndex) {
        let route = network.route_stop(rs).route.0;
        let earliest = &mut self.earliest_route_stop[route];
        if earliest.is_none_or(|current| rs < current) {
            *earliest = Some(rs);
        }
    }

    fn reconstruct(
        &self,
        network: &NetworkIndex,
        departure_time: f64,
        access: &[InitialStop],
        egress: &[InitialStop],
    ) -> Option<Itinerary> {
        let mut destinations: Vec<usize> = self.destinations.iter().collect();
        destinations.sort_unstable();

        let mut best: Option<(f64, PathId, Egress)> = None;
        for rs in destinations {
            let (Some(path), Some(egress)) = (self.best_path[rs], self.egress[rs]) else {
                continue;
            };
            let pe = self.arena.get(path);
            let total = pe.arrival_cost + egress.cost;
            let better = match best {
                None => true,
                Some((best_total, best_path, _)) => {
                    total < best_total
                        || (total == best_total
                            && pe.transfer_count < self.arena.get(best_path).transfer_count)
                }
            };
            if better {
                best = Some((total, path, egress));
            }
        }
        let (total_cost, last, egress_choice) = best?;

        let mut chain: Vec<&PathElement> = self.arena.chain(last).map(|(_, pe)| pe).collect();
        chain.reverse();

        let mut legs = Vec::with_capacity(chain.len() + 1);
        let mut time = departure_time;
        // Cost of same-stop transfers, charged to the ride that follows
        let mut collapsed_cost = 0.0;
        for pe in &chain {
            let stop = network.route_stop(pe.route_stop).stop;
            match pe.arrival {
                Arrival::Access { candidate } => {
                    let candidate = &access[candidate];
                    legs.push(Leg::NonTransit(NonTransitLeg {
                        kind: NonTransitKind::Access,
                        from: Place::Origin,
                        to: Place::Stop(network.stop(stop).id.clone()),
                        mode: candidate.mode.clone(),
                        departure_time: time,
                        travel_time: pe.arrival_time - time,
                        distance: candidate.distance,
                        cost: candidate.cost,
                    }));
                }
                Arrival::Ride {
                    departure,
                    boarding_time,
                } => {
                    let boarded = self.arena.get(pe.coming_from?);
                    let route = network.route_of(pe.route_stop);
                    legs.push(Leg::Transit(TransitLeg {
                        from: network.stop(network.route_stop(boarded.route_stop).stop).id.clone(),
                        to: network.stop(stop).id.clone(),
                        line: route.line.clone(),
                        route: route.id.clone(),
                        mode: route.mode.clone(),
                        trip: network.departure(departure).id.clone(),
                        departure_time: boarding_time,
                        arrival_time: pe.arrival_time,
                        cost: pe.arrival_cost - boarded.arrival_cost + collapsed_cost,
                    }));
                    collapsed_cost = 0.0;
                }
                Arrival::Transfer { duration, cost } => {
                    let from_stop = network.route_stop(self.arena.get(pe.coming_from?).route_stop).stop;
                    // Changing routes at one stop needs no leg, only time
                    if from_stop == stop {
                        collapsed_cost += cost;
                    } else {
                        let (from, to) = (network.stop(from_stop), network.stop(stop));
                        legs.push(Leg::NonTransit(NonTransitLeg {
                            kind: NonTransitKind::Transfer,
                            from: Place::Stop(from.id.clone()),
                            to: Place::Stop(to.id.clone()),
                            mode: Mode::transit_walk(),
                            departure_time: time,
                            travel_time: duration,
                            distance: from.coord.distance(&to.coord),
                            cost,
                        }));
                    }
                }
            }
            time = pe.arrival_time;
        }

        let last_pe = self.arena.get(last);
        let egress_stop = &egress[egress_choice.candidate];
        legs.push(Leg::NonTransit(NonTransitLeg {
            kind: NonTransitKind::Egress,
            from: Place::Stop(network.stop(egress_stop.stop).id.clone()),
            to: Place::Destination,
            mode: egress_stop.mode.clone(),
            departure_time: time,
            travel_time: egress_stop.time,
            distance: egress_stop.distance,
            cost: egress_stop.cost + collapsed_cost,
        }));

        match Itinerary::new(
            legs,
            total_cost,
            last_pe.arrival_transfer_cost,
            last_pe.transfer_count,
        ) {
            Ok(itinerary) => Some(itinerary),
            Err(err) => {
                warn!(error = %err, "discarding inconsistent predecessor chain");
                None
            }
        }
    }
}
