//! Itinerary types produced by the search engine.
//!
//! An `Itinerary` is the public result of a search: an ordered list of legs
//! from the origin facility to the destination facility, plus the totals the
//! engine optimised.

use std::fmt;

use chrono::Duration;

use crate::domain::{DomainError, LineId, Mode, RouteId, StopId, format_time, to_duration};

/// Where a leg starts or ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Place {
    /// The origin facility of the query
    Origin,
    /// The destination facility of the query
    Destination,
    /// A transit stop
    Stop(StopId),
}

impl Place {
    /// Returns the stop if this place is one.
    pub fn stop(&self) -> Option<&StopId> {
        match self {
            Place::Stop(stop) => Some(stop),
            Place::Origin | Place::Destination => None,
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Place::Origin => f.write_str("origin"),
            Place::Destination => f.write_str("destination"),
            Place::Stop(stop) => write!(f, "stop {stop}"),
        }
    }
}

/// A ride on one vehicle between two stops of a route.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitLeg {
    pub from: StopId,
    pub to: StopId,
    pub line: LineId,
    pub route: RouteId,
    pub mode: Mode,
    /// Identifier of the boarded departure.
    pub trip: String,
    /// When the vehicle leaves the boarding stop.
    pub departure_time: f64,
    /// When the vehicle reaches the alighting stop.
    pub arrival_time: f64,
    /// Waiting and in-vehicle cost of this ride, plus the cost of changing
    /// onto it at the boarding stop.
    pub cost: f64,
}

/// What a non-transit leg connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonTransitKind {
    /// Origin facility to the first stop
    Access,
    /// Between two stops
    Transfer,
    /// Last stop to the destination facility
    Egress,
}

/// A walk or other access-mode movement outside the transit network.
#[derive(Debug, Clone, PartialEq)]
pub struct NonTransitLeg {
    pub kind: NonTransitKind,
    pub from: Place,
    pub to: Place,
    pub mode: Mode,
    pub departure_time: f64,
    /// Seconds.
    pub travel_time: f64,
    /// Metres.
    pub distance: f64,
    pub cost: f64,
}

/// One leg of an itinerary.
#[derive(Debug, Clone, PartialEq)]
pub enum Leg {
    Transit(TransitLeg),
    NonTransit(NonTransitLeg),
}

impl Leg {
    pub fn from_place(&self) -> Place {
        match self {
            Leg::Transit(leg) => Place::Stop(leg.from.clone()),
            Leg::NonTransit(leg) => leg.from.clone(),
        }
    }

    pub fn to_place(&self) -> Place {
        match self {
            Leg::Transit(leg) => Place::Stop(leg.to.clone()),
            Leg::NonTransit(leg) => leg.to.clone(),
        }
    }

    pub fn departure_time(&self) -> f64 {
        match self {
            Leg::Transit(leg) => leg.departure_time,
            Leg::NonTransit(leg) => leg.departure_time,
        }
    }

    pub fn arrival_time(&self) -> f64 {
        match self {
            Leg::Transit(leg) => leg.arrival_time,
            Leg::NonTransit(leg) => leg.departure_time + leg.travel_time,
        }
    }

    /// Travel time in seconds.
    pub fn travel_time(&self) -> f64 {
        self.arrival_time() - self.departure_time()
    }

    pub fn duration(&self) -> Duration {
        to_duration(self.travel_time())
    }

    pub fn mode(&self) -> &Mode {
        match self {
            Leg::Transit(leg) => &leg.mode,
            Leg::NonTransit(leg) => &leg.mode,
        }
    }

    pub fn cost(&self) -> f64 {
        match self {
            Leg::Transit(leg) => leg.cost,
            Leg::NonTransit(leg) => leg.cost,
        }
    }

    pub fn is_transit(&self) -> bool {
        matches!(self, Leg::Transit(_))
    }

    pub fn as_transit(&self) -> Option<&TransitLeg> {
        match self {
            Leg::Transit(leg) => Some(leg),
            Leg::NonTransit(_) => None,
        }
    }

    pub fn as_non_transit(&self) -> Option<&NonTransitLeg> {
        match self {
            Leg::Transit(_) => None,
            Leg::NonTransit(leg) => Some(leg),
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}  ",
            format_time(self.departure_time()),
            format_time(self.arrival_time())
        )?;
        match self {
            Leg::Transit(leg) => write!(
                f,
                "{} {} ({}, trip {}) from {} to {}",
                leg.mode, leg.line, leg.route, leg.trip, leg.from, leg.to
            ),
            Leg::NonTransit(leg) => write!(f, "{} from {} to {}", leg.mode, leg.from, leg.to),
        }
    }
}

/// A complete trip from origin to destination.
///
/// # Invariants
///
/// - At least one leg
/// - Consecutive legs meet at the same place
/// - No leg starts before the previous one ends
/// - No leg has a negative duration
///
/// The leg costs of an itinerary built by the engine add up to its total cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Itinerary {
    legs: Vec<Leg>,
    total_cost: f64,
    transfer_cost: f64,
    transfer_count: usize,
}

impl Itinerary {
    /// Tolerance for comparing leg boundary times.
    const EPSILON: f64 = 1e-9;

    /// Validate and assemble an itinerary.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the legs are empty, disconnected, overlapping, or a
    /// leg has a negative duration.
    pub fn new(
        legs: Vec<Leg>,
        total_cost: f64,
        transfer_cost: f64,
        transfer_count: usize,
    ) -> Result<Self, DomainError> {
        if legs.is_empty() {
            return Err(DomainError::EmptyItinerary);
        }
        for leg in &legs {
            let travel_time = leg.travel_time();
            if travel_time < -Self::EPSILON {
                return Err(DomainError::NegativeDuration(travel_time));
            }
        }
        for window in legs.windows(2) {
            let (previous, next) = (&window[0], &window[1]);
            let (end, start) = (previous.to_place(), next.from_place());
            if end != start {
                return Err(DomainError::LegsNotConnected(end.to_string(), start.to_string()));
            }
            if next.departure_time() < previous.arrival_time() - Self::EPSILON {
                return Err(DomainError::LegsOverlap {
                    previous_end: previous.arrival_time(),
                    start: next.departure_time(),
                });
            }
        }
        Ok(Self {
            legs,
            total_cost,
            transfer_cost,
            transfer_count,
        })
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    /// Access, ride, transfer and egress costs combined.
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    /// The part of the total cost attributed to transfer penalties.
    pub fn transfer_cost(&self) -> f64 {
        self.transfer_cost
    }

    /// Transfers made, including changes between routes at the same stop.
    pub fn transfer_count(&self) -> usize {
        self.transfer_count
    }

    pub fn departure_time(&self) -> f64 {
        self.legs.first().map_or(0.0, Leg::departure_time)
    }

    pub fn arrival_time(&self) -> f64 {
        self.legs.last().map_or(0.0, Leg::arrival_time)
    }

    pub fn duration(&self) -> Duration {
        to_duration(self.arrival_time() - self.departure_time())
    }

    pub fn transit_legs(&self) -> impl Iterator<Item = &TransitLeg> {
        self.legs.iter().filter_map(Leg::as_transit)
    }

    /// Walking legs between two stops.
    pub fn transfer_legs(&self) -> impl Iterator<Item = &NonTransitLeg> {
        self.legs
            .iter()
            .filter_map(Leg::as_non_transit)
            .filter(|leg| leg.kind == NonTransitKind::Transfer)
    }
}

impl fmt::Display for Itinerary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minutes = self.duration().num_minutes();
        writeln!(
            f,
            "{} -> {} ({}h{:02}m), {} transfer(s), cost {:.3}",
            format_time(self.departure_time()),
            format_time(self.arrival_time()),
            minutes / 60,
            minutes % 60,
            self.transfer_count,
            self.total_cost
        )?;
        for leg in &self.legs {
            writeln!(f, "  {leg}")?;
        }
        Ok(())
    }
}
