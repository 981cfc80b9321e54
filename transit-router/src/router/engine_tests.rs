//! Scenario tests for the search engine.

use std::sync::Arc;

use proptest::prelude::*;

use super::*;
use crate::access::InitialStop;
use crate::domain::{Coord, LineId, Mode, RouteId, StopId};
use crate::network::{
    DepartureSpec, NetworkBuilder, NetworkIndex, RouteSpec, RouteStopIndex, RouteStopSpec, Stop,
    StopIndex,
};

const EPSILON: f64 = 1e-7;

fn route(id: &str, mode: &str, stops: &[&str], departures: &[f64]) -> RouteSpec {
    RouteSpec {
        id: RouteId::new(format!("{id}1")),
        line: LineId::new(id),
        mode: Mode::new(mode),
        stops: stops
            .iter()
            .enumerate()
            .map(|(i, &s)| RouteStopSpec::new(s, 120.0 * i as f64, 120.0 * i as f64))
            .collect(),
        departures: departures
            .iter()
            .enumerate()
            .map(|(i, &t)| DepartureSpec::new(format!("{id}-{i}"), t))
            .collect(),
    }
}

fn builder(stops: &[(&str, f64)]) -> NetworkBuilder {
    let mut builder = NetworkBuilder::new();
    for &(id, x) in stops {
        builder
            .add_stop(Stop::new(id, format!("Stop {id}"), Coord::new(x, 1000.0)))
            .unwrap();
    }
    builder
}

/// Blue (train) 1-2 at 08:00, red (bus) 2-3 at 08:04, green 3-4 at 08:08,
/// each ride taking two minutes.
fn three_lines(green_mode: &str) -> Arc<NetworkIndex> {
    let mut builder = builder(&[("1", 3000.0), ("2", 5000.0), ("3", 7000.0), ("4", 9000.0)]);
    builder.add_route(route("blue", "train", &["1", "2"], &[28800.0]));
    builder.add_route(route("red", "bus", &["2", "3"], &[29040.0]));
    builder.add_route(route("green", green_mode, &["3", "4"], &[29280.0]));
    Arc::new(builder.build().unwrap())
}

fn params(transfer_penalty: TransferPenalty) -> RaptorParameters {
    RaptorParameters {
        marginal_utility_in_vehicle: -6.0,
        marginal_utility_waiting: -6.0,
        marginal_utility_walk: -12.0,
        transfer_penalty,
        min_transfer_time: 60.0,
        ..Default::default()
    }
}

fn at(network: &NetworkIndex, stop: &str) -> InitialStop {
    let index = network.find_stop(&StopId::new(stop)).unwrap();
    InitialStop::new(index, 0.0, 0.0, 0.0, Mode::walk())
}

fn engine(network: &Arc<NetworkIndex>, policy: impl TransferCostPolicy + 'static) -> RaptorEngine {
    RaptorEngine::new(Arc::clone(network), Arc::new(policy))
}

fn search(
    engine: &mut RaptorEngine,
    from: &str,
    to: &str,
    departure_time: f64,
    params: &RaptorParameters,
) -> Option<Itinerary> {
    let network = Arc::clone(engine.network());
    engine.find_best_itinerary(
        departure_time,
        &[at(&network, from)],
        &[at(&network, to)],
        params.max_transfers,
        params,
    )
}

/// In-vehicle 360s, waiting 120s and transfer walking 120s with the
/// utilities of `params`.
const BASE_COST: f64 = 360.0 * 6.0 / 3600.0 + 120.0 * 6.0 / 3600.0 + 120.0 * 12.0 / 3600.0;

#[test]
fn three_line_trip_uses_every_line() {
    let network = three_lines("bus");
    let params = params(TransferPenalty::flat(3.0));
    let mut engine = engine(&network, FlatTransferCost::new(3.0));

    let itinerary = search(&mut engine, "1", "4", 28800.0, &params).unwrap();

    let lines: Vec<&str> = itinerary.transit_legs().map(|l| l.line.as_str()).collect();
    assert_eq!(lines, vec!["blue", "red", "green"]);
    assert_eq!(itinerary.transfer_count(), 2);
    // Same-stop transfers produce no leg
    assert_eq!(itinerary.transfer_legs().count(), 0);
    assert_eq!(itinerary.legs().len(), 5);
    assert_eq!(itinerary.departure_time(), 28800.0);
    assert_eq!(itinerary.arrival_time(), 29400.0);

    let red = itinerary.transit_legs().nth(1).unwrap();
    assert_eq!(red.departure_time, 29040.0);
    assert_eq!(red.arrival_time, 29160.0);
    assert_eq!(red.trip, "red-0");

    assert!((itinerary.total_cost() - (BASE_COST + 6.0)).abs() < EPSILON);
    assert!((itinerary.transfer_cost() - 6.0).abs() < EPSILON);

    // The hidden change at stop 2 is charged to the red ride
    let change = 60.0 * 12.0 / 3600.0 + 3.0;
    let ride = 60.0 * 6.0 / 3600.0 + 120.0 * 6.0 / 3600.0;
    assert!((red.cost - (ride + change)).abs() < EPSILON);
    let leg_costs: f64 = itinerary.legs().iter().map(Leg::cost).sum();
    assert!((leg_costs - itinerary.total_cost()).abs() < EPSILON);
}

#[test]
fn time_proportional_transfer_cost_against_flat() {
    let network = three_lines("bus");
    let flat_params = params(TransferPenalty::flat(3.0));
    let flat = search(
        &mut engine(&network, FlatTransferCost::new(3.0)),
        "1",
        "4",
        28800.0,
        &flat_params,
    )
    .unwrap();

    // Transfers end at 08:03 and 08:07; the second re-prices both
    let elapsed: f64 = 29220.0 - 28800.0;
    for penalty in [
        TransferPenalty::new(1.0, 2.0, Some(2.0), Some(12.0)),
        TransferPenalty::new(1.0, 2.0, Some(0.0), Some(12.0)),
    ] {
        let params = params(penalty);
        let proportional = search(
            &mut engine(&network, TimeProportionalTransferCost::new()),
            "1",
            "4",
            28800.0,
            &params,
        )
        .unwrap();

        let per_transfer = (1.0 + 2.0 * elapsed / 3600.0).clamp(penalty.min.unwrap(), 12.0);
        let expected_difference = 2.0 * per_transfer - 2.0 * 3.0;
        let actual_difference = proportional.total_cost() - flat.total_cost();
        assert!(
            (actual_difference - expected_difference).abs() < EPSILON,
            "expected {expected_difference}, got {actual_difference}"
        );
        assert!((proportional.transfer_cost() - 2.0 * per_transfer).abs() < EPSILON);
    }
}

fn mode_to_mode_engine(network: &Arc<NetworkIndex>, penalty: f64) -> RaptorEngine {
    let config = RaptorStaticConfig {
        mode_to_mode_penalties: vec![
            ModeToModePenalty::new("train", "bus", penalty),
            ModeToModePenalty::new("bus", "train", penalty),
        ],
    };
    let table = config.mode_to_mode_table(network.modes()).unwrap().unwrap();
    engine(network, TimeProportionalTransferCost::with_mode_to_mode(table))
}

#[test]
fn mode_to_mode_penalty_once_per_transition() {
    let params = params(TransferPenalty::new(1.0, 2.0, Some(0.0), Some(12.0)));
    let c = |elapsed: f64| 1.0 + 2.0 * elapsed / 3600.0;

    // train -> bus -> bus: one mode change
    let network = three_lines("bus");
    let with = search(&mut mode_to_mode_engine(&network, 1.5), "1", "4", 28800.0, &params).unwrap();
    let without = search(&mut mode_to_mode_engine(&network, 0.0), "1", "4", 28800.0, &params).unwrap();

    assert!((with.transfer_cost() - without.transfer_cost() - 1.5).abs() < EPSILON);
    // The bus run starts with the first transfer at 08:03
    let expected = c(180.0) + 1.5 + c(240.0);
    assert!((with.transfer_cost() - expected).abs() < EPSILON);
    assert!((with.total_cost() - (BASE_COST + expected)).abs() < EPSILON);

    // train -> bus -> train: two mode changes
    let network = three_lines("train");
    let with = search(&mut mode_to_mode_engine(&network, 1.5), "1", "4", 28800.0, &params).unwrap();
    let without = search(&mut mode_to_mode_engine(&network, 0.0), "1", "4", 28800.0, &params).unwrap();
    assert!((with.transfer_cost() - without.transfer_cost() - 3.0).abs() < EPSILON);
}

#[test]
fn direct_connection_has_no_transfer() {
    let network = three_lines("bus");
    let params = params(TransferPenalty::flat(3.0));
    let mut engine = engine(&network, FlatTransferCost::new(3.0));

    let itinerary = search(&mut engine, "2", "3", 28800.0, &params).unwrap();

    assert_eq!(itinerary.transit_legs().count(), 1);
    assert_eq!(itinerary.transfer_legs().count(), 0);
    assert_eq!(itinerary.transfer_count(), 0);
    assert_eq!(itinerary.transfer_cost(), 0.0);

    let kinds: Vec<_> = itinerary
        .legs()
        .iter()
        .map(|leg| leg.as_non_transit().map(|l| l.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![Some(NonTransitKind::Access), None, Some(NonTransitKind::Egress)]
    );
    // 4 minutes waiting for the 08:04 and 2 minutes riding
    let expected = 240.0 * 6.0 / 3600.0 + 120.0 * 6.0 / 3600.0;
    assert!((itinerary.total_cost() - expected).abs() < EPSILON);
}

#[test]
fn walking_transfer_between_stops_becomes_a_leg() {
    let mut builder = builder(&[("1", 0.0), ("2", 2000.0), ("2b", 2150.0), ("3", 4000.0)]);
    builder.add_route(route("blue", "train", &["1", "2"], &[28800.0]));
    builder.add_route(route("red", "bus", &["2b", "3"], &[29100.0]));
    builder.add_transfer("2", "2b", 150.0);
    let network = Arc::new(builder.build().unwrap());

    let params = params(TransferPenalty::flat(1.0));
    let itinerary = search(
        &mut engine(&network, FlatTransferCost::new(1.0)),
        "1",
        "3",
        28800.0,
        &params,
    )
    .unwrap();

    let walks: Vec<_> = itinerary.transfer_legs().collect();
    assert_eq!(walks.len(), 1);
    assert_eq!(walks[0].from, Place::Stop(StopId::new("2")));
    assert_eq!(walks[0].to, Place::Stop(StopId::new("2b")));
    assert_eq!(walks[0].departure_time, 28920.0);
    assert_eq!(walks[0].travel_time, 150.0);
    assert_eq!(walks[0].distance, 150.0);
    assert_eq!(walks[0].mode, Mode::transit_walk());
    assert!((walks[0].cost - (150.0 * 12.0 / 3600.0 + 1.0)).abs() < EPSILON);
    assert_eq!(itinerary.transfer_count(), 1);
}

#[test]
fn minimal_transfer_time_can_make_a_connection_impossible() {
    let network = three_lines("bus");
    let mut params = params(TransferPenalty::flat(3.0));
    let mut engine = engine(&network, FlatTransferCost::new(3.0));

    // Arrive 08:02 at stop 2, red leaves 08:04
    params.min_transfer_time = 120.0;
    assert!(search(&mut engine, "1", "3", 28800.0, &params).is_some());
    params.min_transfer_time = 121.0;
    assert!(search(&mut engine, "1", "3", 28800.0, &params).is_none());
}

#[test]
fn disconnected_components_are_not_found() {
    let mut builder = builder(&[("a", 0.0), ("b", 1000.0), ("c", 5000.0), ("d", 6000.0)]);
    builder.add_route(route("west", "bus", &["a", "b"], &[28800.0, 29400.0]));
    builder.add_route(route("east", "bus", &["c", "d"], &[28800.0, 29400.0]));
    let network = Arc::new(builder.build().unwrap());
    let params = params(TransferPenalty::flat(1.0));
    let mut engine = engine(&network, FlatTransferCost::new(1.0));

    assert!(search(&mut engine, "a", "d", 28000.0, &params).is_none());
    assert!(search(&mut engine, "a", "b", 28000.0, &params).is_some());
    // Too late for any departure
    assert!(search(&mut engine, "a", "b", 30000.0, &params).is_none());
}

#[test]
fn equal_cost_prefers_fewer_transfers() {
    let mut builder = builder(&[("1", 0.0), ("2", 1000.0), ("3", 2000.0)]);
    builder.add_route(route("local", "bus", &["1", "2"], &[28800.0]));
    builder.add_route(route("feeder", "bus", &["2", "3"], &[28800.0 + 300.0]));
    builder.add_route(route("express", "bus", &["1", "3"], &[28800.0]));
    let network = Arc::new(builder.build().unwrap());

    // Every path is free
    let params = RaptorParameters {
        marginal_utility_in_vehicle: 0.0,
        marginal_utility_waiting: 0.0,
        marginal_utility_walk: 0.0,
        transfer_penalty: TransferPenalty::flat(0.0),
        ..Default::default()
    };
    let mut engine = engine(&network, FlatTransferCost::new(0.0));

    for _ in 0..3 {
        let itinerary = search(&mut engine, "1", "3", 28800.0, &params).unwrap();
        assert_eq!(itinerary.total_cost(), 0.0);
        assert_eq!(itinerary.transfer_count(), 0);
        let lines: Vec<&str> = itinerary.transit_legs().map(|l| l.line.as_str()).collect();
        assert_eq!(lines, vec!["express"]);
    }
}

#[test]
fn cheaper_path_with_more_transfers_wins() {
    let mut builder = builder(&[("1", 0.0), ("2", 1000.0), ("3", 2000.0)]);
    builder.add_route(route("local", "bus", &["1", "2"], &[28800.0]));
    builder.add_route(route("feeder", "bus", &["2", "3"], &[29000.0]));
    // Leaves an hour later; the waiting makes it expensive
    builder.add_route(route("express", "bus", &["1", "3"], &[32400.0]));
    let network = Arc::new(builder.build().unwrap());
    let params = params(TransferPenalty::flat(0.5));

    let itinerary = search(
        &mut engine(&network, FlatTransferCost::new(0.5)),
        "1",
        "3",
        28800.0,
        &params,
    )
    .unwrap();
    let lines: Vec<&str> = itinerary.transit_legs().map(|l| l.line.as_str()).collect();
    assert_eq!(lines, vec!["local", "feeder"]);
}

#[test]
fn access_and_egress_costs_are_included() {
    let network = three_lines("bus");
    let params = params(TransferPenalty::flat(3.0));
    let mut engine = engine(&network, FlatTransferCost::new(3.0));

    let access = [InitialStop::new(StopIndex(1), 120.0, 0.5, 160.0, Mode::access_walk())];
    let egress = [
        InitialStop::new(StopIndex(2), 60.0, 5.0, 80.0, Mode::egress_walk()),
        InitialStop::new(StopIndex(3), 30.0, 2.0, 40.0, Mode::egress_walk()),
    ];

    // Reach stop 2 at 08:02 and ride red to stop 3; continuing on green
    // to the cheaper-looking stop 4 costs a transfer
    let itinerary = engine
        .find_best_itinerary(28800.0, &access, &egress, 99, &params)
        .unwrap();

    let ride = 120.0 * 6.0 / 3600.0;
    let wait = 120.0 * 6.0 / 3600.0;
    assert!((itinerary.total_cost() - (0.5 + wait + ride + 5.0)).abs() < EPSILON);

    let first = itinerary.legs().first().unwrap().as_non_transit().unwrap();
    assert_eq!(first.kind, NonTransitKind::Access);
    assert_eq!(first.travel_time, 120.0);
    assert_eq!(first.distance, 160.0);
    assert_eq!(first.mode, Mode::access_walk());

    let last = itinerary.legs().last().unwrap().as_non_transit().unwrap();
    assert_eq!(last.kind, NonTransitKind::Egress);
    assert_eq!(last.from, Place::Stop(StopId::new("3")));
    assert_eq!(last.departure_time, 29160.0);
    assert_eq!(itinerary.arrival_time(), 29220.0);
}

#[test]
fn search_is_idempotent_across_reuse() {
    let network = three_lines("bus");
    let params = params(TransferPenalty::new(1.0, 2.0, Some(2.0), Some(12.0)));
    let mut reused = engine(&network, TimeProportionalTransferCost::new());

    let first = search(&mut reused, "1", "4", 28800.0, &params);
    // A different query in between must not leak state
    assert!(search(&mut reused, "2", "3", 28800.0, &params).is_some());
    assert!(search(&mut reused, "4", "1", 28800.0, &params).is_none());
    let second = search(&mut reused, "1", "4", 28800.0, &params);
    let fresh = search(
        &mut engine(&network, TimeProportionalTransferCost::new()),
        "1",
        "4",
        28800.0,
        &params,
    );

    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(first, fresh);
}

#[test]
fn stats_report_convergence_and_round_cap() {
    let network = three_lines("bus");
    let params = params(TransferPenalty::flat(3.0));
    let mut engine = engine(&network, FlatTransferCost::new(3.0));

    assert!(search(&mut engine, "1", "4", 28800.0, &params).is_some());
    let stats = engine.stats().clone();
    assert_eq!(stats.rounds, 3);
    assert!(!stats.round_cap_hit);
    assert_eq!(stats.improved_per_round.last(), Some(&0));
    assert_eq!(stats.improved_per_round.len(), stats.rounds);

    // Three rides need two transfers
    let network_clone = Arc::clone(&network);
    let result = engine.find_best_itinerary(
        28800.0,
        &[at(&network_clone, "1")],
        &[at(&network_clone, "4")],
        1,
        &params,
    );
    assert!(result.is_none());
    assert!(engine.stats().round_cap_hit);
    assert_eq!(engine.stats().rounds, 2);
}

/// Fast o-d at 08:00, a o-x1 at 08:01 and b x1-x2 at 08:10; z is served by
/// nothing.
fn branching_network() -> Arc<NetworkIndex> {
    let mut builder = builder(&[
        ("o", 0.0),
        ("d", 2000.0),
        ("x1", 4000.0),
        ("x2", 6000.0),
        ("z", 20000.0),
    ]);
    builder.add_route(route("fast", "bus", &["o", "d"], &[28800.0]));
    builder.add_route(route("a", "bus", &["o", "x1"], &[28860.0]));
    builder.add_route(route("b", "bus", &["x1", "x2"], &[29400.0]));
    Arc::new(builder.build().unwrap())
}

#[test]
fn cost_bound_prunes_labels_beyond_the_best_arrival() {
    let network = branching_network();
    let params = params(TransferPenalty::flat(3.0));
    let mut engine = engine(&network, FlatTransferCost::new(3.0));

    assert!(search(&mut engine, "o", "z", 28800.0, &params).is_none());
    let unbounded = engine.stats().clone();
    // Two access labels, rides to d and x1, the change onto b, the ride to x2
    assert_eq!(unbounded.labels, 6);
    assert_eq!(unbounded.rounds, 2);

    assert!(search(&mut engine, "o", "d", 28800.0, &params).is_some());
    let bounded = engine.stats().clone();
    // Changing onto b at x1 already costs more than reaching d
    assert!(bounded.labels <= 4, "{} labels", bounded.labels);
    assert!(bounded.labels < unbounded.labels);
    assert!(bounded.labels <= network.route_stop_count() * bounded.rounds);
}

#[test]
fn labels_never_get_worse_across_rounds() {
    let network = three_lines("bus");
    let params = params(TransferPenalty::flat(3.0));
    let mut engine = engine(&network, FlatTransferCost::new(3.0));

    let mut previous: Vec<Option<f64>> = vec![None; network.route_stop_count()];
    for rounds in 0..4 {
        let network = Arc::clone(&network);
        engine.find_best_itinerary(
            28800.0,
            &[at(&network, "1")],
            &[at(&network, "4")],
            rounds,
            &params,
        );
        for (rs, before) in previous.iter_mut().enumerate() {
            let now = engine.arrival_at(RouteStopIndex(rs)).map(|pe| pe.arrival_cost);
            if let Some(before) = *before {
                let now = now.unwrap();
                assert!(now <= before + EPSILON);
            }
            *before = now;
        }
    }
}

/// Random networks over stops laid out on a line.
fn network_strategy() -> impl Strategy<Value = NetworkIndex> {
    let route_strategy = (
        prop::sample::subsequence((0..6).collect::<Vec<usize>>(), 2..=4),
        any::<bool>(),
        prop::collection::vec(60u32..900, 1..4),
    );
    prop::collection::vec(route_strategy, 1..7).prop_map(|routes| {
        let ids: Vec<String> = (0..6).map(|i| format!("s{i}")).collect();
        let mut builder = NetworkBuilder::new();
        for (i, id) in ids.iter().enumerate() {
            builder
                .add_stop(Stop::new(id.as_str(), id.as_str(), Coord::new(500.0 * i as f64, 0.0)))
                .unwrap();
        }
        for (r, (mut stops, reversed, gaps)) in routes.into_iter().enumerate() {
            if reversed {
                stops.reverse();
            }
            let names: Vec<&str> = stops.iter().map(|&s| ids[s].as_str()).collect();
            let mut t = 28800.0;
            let departures: Vec<f64> = gaps
                .iter()
                .map(|&g| {
                    t += f64::from(g);
                    t
                })
                .collect();
            let mode = if r % 2 == 0 { "bus" } else { "train" };
            builder.add_route(route(&format!("r{r}"), mode, &names, &departures));
        }
        builder.generate_transfers(crate::network::FootpathGeneration::new(600.0, 1.34, 1.3));
        builder.build().unwrap()
    })
}

proptest! {
    #[test]
    fn more_rounds_never_cost_more(network in network_strategy(), from in 0usize..6, to in 0usize..6) {
        prop_assume!(from != to);
        let network = Arc::new(network);
        let params = params(TransferPenalty::new(1.0, 2.0, Some(0.5), Some(12.0)));
        let mut engine = engine(&network, TimeProportionalTransferCost::new());
        let access = [InitialStop::new(StopIndex(from), 0.0, 0.0, 0.0, Mode::walk())];
        let egress = [InitialStop::new(StopIndex(to), 0.0, 0.0, 0.0, Mode::walk())];

        let mut previous: Option<f64> = None;
        for rounds in 0..5 {
            let cost = engine
                .find_best_itinerary(28800.0, &access, &egress, rounds, &params)
                .map(|i| i.total_cost());
            if let Some(before) = previous {
                let now = cost.unwrap_or(f64::INFINITY);
                prop_assert!(now <= before + EPSILON, "rounds {}: {} > {}", rounds, now, before);
            }
            if cost.is_some() {
                previous = cost;
            }
        }
    }

    #[test]
    fn repeated_queries_are_identical(network in network_strategy(), from in 0usize..6, to in 0usize..6) {
        let network = Arc::new(network);
        let params = params(TransferPenalty::new(1.0, 2.0, Some(0.5), Some(12.0)));
        let mut engine = engine(&network, TimeProportionalTransferCost::new());
        let access = [InitialStop::new(StopIndex(from), 0.0, 0.0, 0.0, Mode::walk())];
        let egress = [InitialStop::new(StopIndex(to), 0.0, 0.0, 0.0, Mode::walk())];

        let first = engine.find_best_itinerary(28800.0, &access, &egress, 99, &params);
        let second = engine.find_best_itinerary(28800.0, &access, &egress, 99, &params);
        prop_assert_eq!(first, second);
    }
}
