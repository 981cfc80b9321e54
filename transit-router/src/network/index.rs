//! The flat, immutable network index.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Range;

use crate::domain::{Coord, LineId, Mode, RouteId, StopId};

use super::spatial::StopLocator;

/// Position of a stop in [`NetworkIndex::stops`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StopIndex(pub usize);

/// Position of a route in [`NetworkIndex::routes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteIndex(pub usize);

/// Position of a route-stop in the global route-stop array.
///
/// Route-stops of one route occupy a contiguous range in sequence order, so
/// comparing two indices of the same route compares their positions along it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteStopIndex(pub usize);

/// Position of a departure in the global departure array.
///
/// Departures of one route occupy a contiguous, time-sorted range, so a
/// smaller index within a route is an earlier vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepartureIndex(pub usize);

/// A physical stop.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub coord: Coord,
    /// Free-form attributes, used by access mode stop filters.
    pub attributes: BTreeMap<String, String>,
}

impl Stop {
    pub fn new(id: impl Into<StopId>, name: impl Into<String>, coord: Coord) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            coord,
            attributes: BTreeMap::new(),
        }
    }

    /// Adds an attribute, builder style.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// One stop's occurrence within one route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteStop {
    pub route: RouteIndex,
    pub stop: StopIndex,
    /// Zero-based position along the route.
    pub sequence: usize,
    /// Seconds after the route's reference departure at which vehicles arrive.
    pub arrival_offset: f64,
    /// Seconds after the route's reference departure at which vehicles leave.
    pub departure_offset: f64,
}

/// One direction of one stopping pattern of a line.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: RouteId,
    pub line: LineId,
    pub mode: Mode,
    pub(crate) route_stops: Range<usize>,
    pub(crate) departures: Range<usize>,
}

impl Route {
    /// Route-stop indices in sequence order.
    pub fn route_stops(&self) -> impl DoubleEndedIterator<Item = RouteStopIndex> {
        self.route_stops.clone().map(RouteStopIndex)
    }

    pub fn first_route_stop(&self) -> RouteStopIndex {
        RouteStopIndex(self.route_stops.start)
    }

    /// One past the last route-stop of this route.
    pub(crate) fn route_stop_end(&self) -> usize {
        self.route_stops.end
    }

    pub fn route_stop_count(&self) -> usize {
        self.route_stops.len()
    }

    pub fn departure_count(&self) -> usize {
        self.departures.len()
    }
}

/// One scheduled trip of a route, defined by its time at the reference point.
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub id: String,
    pub time: f64,
}

/// A directed footpath between two stops.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub from: StopIndex,
    pub to: StopIndex,
    /// Walking duration in seconds.
    pub duration: f64,
}

/// Immutable, scan-optimised representation of a timetable snapshot.
///
/// Built by [`NetworkBuilder`](super::NetworkBuilder); all accessors are O(1)
/// except departure lookup (O(log n)) and spatial queries.
#[derive(Debug)]
pub struct NetworkIndex {
    pub(crate) stops: Vec<Stop>,
    pub(crate) stop_lookup: HashMap<StopId, StopIndex>,
    pub(crate) route_stops: Vec<RouteStop>,
    pub(crate) routes: Vec<Route>,
    pub(crate) departures: Vec<Departure>,
    /// Departure times parallel to `departures`, kept separate for binary search.
    pub(crate) departure_times: Vec<f64>,
    /// Transfers grouped by origin stop.
    pub(crate) transfers: Vec<Transfer>,
    pub(crate) transfer_ranges: Vec<Range<usize>>,
    pub(crate) route_stops_by_stop: Vec<Vec<RouteStopIndex>>,
    pub(crate) modes: BTreeSet<Mode>,
    pub(crate) locator: StopLocator,
}

impl NetworkIndex {
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn stop(&self, index: StopIndex) -> &Stop {
        &self.stops[index.0]
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    /// Look up a stop by its id.
    pub fn find_stop(&self, id: &StopId) -> Option<StopIndex> {
        self.stop_lookup.get(id).copied()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, index: RouteIndex) -> &Route {
        &self.routes[index.0]
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Look up a route by its id. Linear; intended for tests and tooling.
    pub fn find_route(&self, id: &RouteId) -> Option<RouteIndex> {
        self.routes.iter().position(|r| &r.id == id).map(RouteIndex)
    }

    pub fn route_stop(&self, index: RouteStopIndex) -> &RouteStop {
        &self.route_stops[index.0]
    }

    pub fn route_stop_count(&self) -> usize {
        self.route_stops.len()
    }

    /// The route a route-stop belongs to.
    pub fn route_of(&self, index: RouteStopIndex) -> &Route {
        &self.routes[self.route_stops[index.0].route.0]
    }

    /// The transport mode of the route a route-stop belongs to.
    pub fn mode_of(&self, index: RouteStopIndex) -> &Mode {
        &self.route_of(index).mode
    }

    /// All route-stops located at a stop.
    pub fn route_stops_at(&self, stop: StopIndex) -> &[RouteStopIndex] {
        &self.route_stops_by_stop[stop.0]
    }

    /// The departures of a route, sorted ascending by time.
    pub fn departures_of(&self, route: RouteIndex) -> &[Departure] {
        &self.departures[self.routes[route.0].departures.clone()]
    }

    pub fn departure(&self, index: DepartureIndex) -> &Departure {
        &self.departures[index.0]
    }

    /// Earliest departure of the route-stop's route that leaves the
    /// route-stop at or after `time`.
    ///
    /// Returns `None` when every vehicle of the route has already left.
    pub fn next_departure(&self, route_stop: RouteStopIndex, time: f64) -> Option<DepartureIndex> {
        let rs = &self.route_stops[route_stop.0];
        let range = self.routes[rs.route.0].departures.clone();
        let reference_time = time - rs.departure_offset;
        let times = &self.departure_times[range.clone()];
        let pos = times.partition_point(|&t| t < reference_time);
        (pos < times.len()).then_some(DepartureIndex(range.start + pos))
    }

    /// Time at which a departure's vehicle arrives at a route-stop.
    pub fn vehicle_arrival(&self, departure: DepartureIndex, route_stop: RouteStopIndex) -> f64 {
        self.departure_times[departure.0] + self.route_stops[route_stop.0].arrival_offset
    }

    /// Time at which a departure's vehicle leaves a route-stop.
    pub fn vehicle_departure(&self, departure: DepartureIndex, route_stop: RouteStopIndex) -> f64 {
        self.departure_times[departure.0] + self.route_stops[route_stop.0].departure_offset
    }

    /// Outgoing footpaths of a stop.
    pub fn transfers_from(&self, stop: StopIndex) -> &[Transfer] {
        &self.transfers[self.transfer_ranges[stop.0].clone()]
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.len()
    }

    /// Every transport mode served by at least one route.
    pub fn modes(&self) -> &BTreeSet<Mode> {
        &self.modes
    }

    /// Stops within `radius` metres of `coord`, ordered by index.
    pub fn stops_within(&self, coord: &Coord, radius: f64) -> Vec<StopIndex> {
        self.locator.within(coord, radius)
    }

    /// The stop closest to `coord` and its distance, if the network has stops.
    pub fn nearest_stop(&self, coord: &Coord) -> Option<(StopIndex, f64)> {
        self.locator.nearest(coord)
    }
}
