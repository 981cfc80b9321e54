//! Validating construction of a [`NetworkIndex`].

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Deserialize;
use tracing::debug;

use crate::domain::{LineId, Mode, RouteId, StopId, deserialize_time};

use super::error::NetworkError;
use super::index::{
    Departure, NetworkIndex, Route, RouteIndex, RouteStop, RouteStopIndex, Stop, StopIndex,
    Transfer,
};
use super::spatial::StopLocator;

/// One stop of a route pattern, with offsets relative to the route's
/// reference departure time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RouteStopSpec {
    pub stop: StopId,
    #[serde(alias = "arrival")]
    pub arrival_offset: f64,
    #[serde(alias = "departure")]
    pub departure_offset: f64,
}

impl RouteStopSpec {
    pub fn new(stop: impl Into<StopId>, arrival_offset: f64, departure_offset: f64) -> Self {
        Self {
            stop: stop.into(),
            arrival_offset,
            departure_offset,
        }
    }
}

/// One trip of a route, identified by its reference departure time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DepartureSpec {
    pub id: String,
    #[serde(deserialize_with = "deserialize_time")]
    pub time: f64,
}

impl DepartureSpec {
    pub fn new(id: impl Into<String>, time: f64) -> Self {
        Self {
            id: id.into(),
            time,
        }
    }
}

/// A route as supplied to the builder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RouteSpec {
    pub id: RouteId,
    pub line: LineId,
    pub mode: Mode,
    pub stops: Vec<RouteStopSpec>,
    #[serde(default)]
    pub departures: Vec<DepartureSpec>,
}

/// Parameters for deriving walking transfers between nearby stops.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FootpathGeneration {
    /// Beeline radius in metres within which stops are connected.
    pub max_distance: f64,
    /// Walking speed in metres per second.
    pub walk_speed: f64,
    /// Ratio of walked distance to beeline distance.
    #[serde(default = "default_distance_factor")]
    pub distance_factor: f64,
}

fn default_distance_factor() -> f64 {
    1.3
}

impl FootpathGeneration {
    pub fn new(max_distance: f64, walk_speed: f64, distance_factor: f64) -> Self {
        Self {
            max_distance,
            walk_speed,
            distance_factor,
        }
    }

    fn validate(&self) -> Result<(), NetworkError> {
        if !(self.max_distance.is_finite() && self.max_distance >= 0.0) {
            return Err(NetworkError::InvalidFootpaths("max distance must be non-negative"));
        }
        if !(self.walk_speed.is_finite() && self.walk_speed > 0.0) {
            return Err(NetworkError::InvalidFootpaths("walk speed must be positive"));
        }
        if !(self.distance_factor.is_finite() && self.distance_factor > 0.0) {
            return Err(NetworkError::InvalidFootpaths("distance factor must be positive"));
        }
        Ok(())
    }
}

/// Collects stops, routes and transfers and builds a validated
/// [`NetworkIndex`].
///
/// Stops are validated as they are added; routes and transfers are validated
/// by [`build`](Self::build), so they may reference stops added later.
///
/// # Example
///
/// ```
/// use transit_router::domain::{Coord, LineId, Mode, RouteId};
/// use transit_router::network::{DepartureSpec, NetworkBuilder, RouteSpec, RouteStopSpec, Stop};
///
/// let mut builder = NetworkBuilder::new();
/// builder.add_stop(Stop::new("1", "First", Coord::new(0.0, 0.0))).unwrap();
/// builder.add_stop(Stop::new("2", "Second", Coord::new(2000.0, 0.0))).unwrap();
/// builder.add_route(RouteSpec {
///     id: RouteId::new("blue1"),
///     line: LineId::new("blue"),
///     mode: Mode::new("train"),
///     stops: vec![RouteStopSpec::new("1", 0.0, 0.0), RouteStopSpec::new("2", 120.0, 120.0)],
///     departures: vec![DepartureSpec::new("b1", 28800.0)],
/// });
///
/// let network = builder.build().unwrap();
/// assert_eq!(network.route_stop_count(), 2);
/// // Intra-stop transfers are added by default
/// assert_eq!(network.transfer_count(), 2);
/// ```
#[derive(Debug)]
pub struct NetworkBuilder {
    stops: Vec<Stop>,
    stop_lookup: HashMap<StopId, StopIndex>,
    routes: Vec<RouteSpec>,
    transfers: Vec<(StopId, StopId, f64)>,
    intra_stop_transfers: bool,
    footpaths: Option<FootpathGeneration>,
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self {
            stops: Vec::new(),
            stop_lookup: HashMap::new(),
            routes: Vec::new(),
            transfers: Vec::new(),
            intra_stop_transfers: true,
            footpaths: None,
        }
    }
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stop, returning its index.
    pub fn add_stop(&mut self, stop: Stop) -> Result<StopIndex, NetworkError> {
        if self.stop_lookup.contains_key(&stop.id) {
            return Err(NetworkError::DuplicateStop(stop.id));
        }
        if !stop.coord.is_finite() {
            return Err(NetworkError::InvalidCoordinate(stop.id));
        }
        let index = StopIndex(self.stops.len());
        self.stop_lookup.insert(stop.id.clone(), index);
        self.stops.push(stop);
        Ok(index)
    }

    pub fn add_route(&mut self, route: RouteSpec) {
        self.routes.push(route);
    }

    /// Add a directed footpath. The first transfer given for a stop pair wins.
    pub fn add_transfer(&mut self, from: impl Into<StopId>, to: impl Into<StopId>, duration: f64) {
        self.transfers.push((from.into(), to.into(), duration));
    }

    /// Whether to add a zero-length transfer from every stop to itself.
    /// Enabled by default.
    pub fn intra_stop_transfers(&mut self, enabled: bool) -> &mut Self {
        self.intra_stop_transfers = enabled;
        self
    }

    /// Derive footpaths between all stop pairs within a beeline radius.
    ///
    /// Explicit transfers take precedence over generated ones.
    pub fn generate_transfers(&mut self, footpaths: FootpathGeneration) -> &mut Self {
        self.footpaths = Some(footpaths);
        self
    }

    /// Validate everything and produce the index.
    pub fn build(self) -> Result<NetworkIndex, NetworkError> {
        if let Some(footpaths) = &self.footpaths {
            footpaths.validate()?;
        }

        let locator = StopLocator::new(
            self.stops
                .iter()
                .enumerate()
                .map(|(i, stop)| (StopIndex(i), stop.coord)),
        );

        let mut route_ids = HashSet::new();
        let mut routes = Vec::with_capacity(self.routes.len());
        let mut route_stops = Vec::new();
        let mut departures = Vec::new();
        let mut modes = BTreeSet::new();
        let mut route_stops_by_stop = vec![Vec::new(); self.stops.len()];

        for spec in self.routes {
            if !route_ids.insert(spec.id.clone()) {
                return Err(NetworkError::DuplicateRoute(spec.id));
            }
            if spec.stops.len() < 2 {
                return Err(NetworkError::TooFewStops(spec.id));
            }
            validate_offsets(&spec)?;
            validate_departures(&spec)?;

            let route_index = RouteIndex(routes.len());
            let first_route_stop = route_stops.len();
            for (sequence, rs) in spec.stops.iter().enumerate() {
                let stop = *self.stop_lookup.get(&rs.stop).ok_or_else(|| {
                    NetworkError::UnknownStop {
                        stop: rs.stop.clone(),
                        context: format!("route {}", spec.id),
                    }
                })?;
                route_stops_by_stop[stop.0].push(RouteStopIndex(route_stops.len()));
                route_stops.push(RouteStop {
                    route: route_index,
                    stop,
                    sequence,
                    arrival_offset: rs.arrival_offset,
                    departure_offset: rs.departure_offset,
                });
            }

            let first_departure = departures.len();
            departures.extend(spec.departures.into_iter().map(|d| Departure {
                id: d.id,
                time: d.time,
            }));

            modes.insert(spec.mode.clone());
            routes.push(Route {
                id: spec.id,
                line: spec.line,
                mode: spec.mode,
                route_stops: first_route_stop..route_stops.len(),
                departures: first_departure..departures.len(),
            });
        }

        let transfers = collect_transfers(
            &self.stops,
            &self.stop_lookup,
            self.transfers,
            self.intra_stop_transfers,
            self.footpaths.as_ref(),
            &locator,
        )?;
        let mut transfer_ranges = vec![0..0; self.stops.len()];
        let mut start = 0;
        while start < transfers.len() {
            let from = transfers[start].from;
            let end = start + transfers[start..].partition_point(|t| t.from == from);
            transfer_ranges[from.0] = start..end;
            start = end;
        }

        let departure_times = departures.iter().map(|d| d.time).collect();

        debug!(
            stops = self.stops.len(),
            routes = routes.len(),
            route_stops = route_stops.len(),
            departures = departures.len(),
            transfers = transfers.len(),
            "built network index"
        );

        Ok(NetworkIndex {
            stops: self.stops,
            stop_lookup: self.stop_lookup,
            route_stops,
            routes,
            departures,
            departure_times,
            transfers,
            transfer_ranges,
            route_stops_by_stop,
            modes,
            locator,
        })
    }
}

fn validate_offsets(spec: &RouteSpec) -> Result<(), NetworkError> {
    let mut previous_departure = f64::NEG_INFINITY;
    for (position, rs) in spec.stops.iter().enumerate() {
        let consistent = rs.arrival_offset.is_finite()
            && rs.departure_offset.is_finite()
            && rs.arrival_offset >= previous_departure
            && rs.departure_offset >= rs.arrival_offset;
        if !consistent {
            return Err(NetworkError::InvalidOffsets {
                route: spec.id.clone(),
                position,
            });
        }
        previous_departure = rs.departure_offset;
    }
    Ok(())
}

fn validate_departures(spec: &RouteSpec) -> Result<(), NetworkError> {
    let mut previous = f64::NEG_INFINITY;
    for (position, departure) in spec.departures.iter().enumerate() {
        if !(departure.time.is_finite() && departure.time > previous) {
            return Err(NetworkError::UnsortedDepartures {
                route: spec.id.clone(),
                position,
            });
        }
        previous = departure.time;
    }
    Ok(())
}

/// Explicit transfers first, then intra-stop, then generated footpaths; the
/// first transfer for each stop pair is kept. The result is grouped by
/// origin stop.
fn collect_transfers(
    stops: &[Stop],
    stop_lookup: &HashMap<StopId, StopIndex>,
    explicit: Vec<(StopId, StopId, f64)>,
    intra_stop: bool,
    footpaths: Option<&FootpathGeneration>,
    locator: &StopLocator,
) -> Result<Vec<Transfer>, NetworkError> {
    let lookup = |id: &StopId, context: &str| {
        stop_lookup
            .get(id)
            .copied()
            .ok_or_else(|| NetworkError::UnknownStop {
                stop: id.clone(),
                context: context.to_string(),
            })
    };

    let mut seen = HashSet::new();
    let mut transfers = Vec::new();
    let mut push = |transfer: Transfer| {
        if seen.insert((transfer.from, transfer.to)) {
            transfers.push(transfer);
        }
    };

    for (from_id, to_id, duration) in explicit {
        let from = lookup(&from_id, "a transfer")?;
        let to = lookup(&to_id, "a transfer")?;
        if !(duration.is_finite() && duration >= 0.0) {
            return Err(NetworkError::InvalidTransfer {
                from: from_id,
                to: to_id,
                duration,
            });
        }
        push(Transfer { from, to, duration });
    }

    if intra_stop {
        for i in 0..stops.len() {
            push(Transfer {
                from: StopIndex(i),
                to: StopIndex(i),
                duration: 0.0,
            });
        }
    }

    if let Some(footpaths) = footpaths {
        for (i, stop) in stops.iter().enumerate() {
            for to in locator.within(&stop.coord, footpaths.max_distance) {
                if to.0 == i {
                    continue;
                }
                let distance = stop.coord.distance(&stops[to.0].coord);
                push(Transfer {
                    from: StopIndex(i),
                    to,
                    duration: distance * footpaths.distance_factor / footpaths.walk_speed,
                });
            }
        }
    }

    transfers.sort_by_key(|t| t.from);
    Ok(transfers)
}
