//! Access and egress candidates and the requests that produce them.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::{Coord, FacilityId, Mode};
use crate::network::StopIndex;
use crate::router::RaptorParameters;

/// A stop at which a trip may enter or leave the transit network, with the
/// time, cost and distance of getting there from the facility (or back).
#[derive(Debug, Clone, PartialEq)]
pub struct InitialStop {
    pub stop: StopIndex,
    /// Seconds.
    pub time: f64,
    pub cost: f64,
    /// Metres.
    pub distance: f64,
    pub mode: Mode,
}

impl InitialStop {
    pub fn new(stop: StopIndex, time: f64, cost: f64, distance: f64, mode: Mode) -> Self {
        Self {
            stop,
            time,
            cost,
            distance,
            mode,
        }
    }
}

/// An origin or destination location such as a home or workplace.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub coord: Coord,
}

impl Facility {
    pub fn new(id: impl Into<FacilityId>, coord: Coord) -> Self {
        Self {
            id: id.into(),
            coord,
        }
    }
}

/// Which end of the trip candidates are requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// From the origin facility to a stop
    Access,
    /// From a stop to the destination facility
    Egress,
}

/// Input of an [`AccessEgressResolver`](super::AccessEgressResolver) call.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    pub facility: &'a Facility,
    pub direction: Direction,
    pub departure_time: f64,
    pub params: &'a RaptorParameters,
    /// Attributes of the traveller, consulted by access mode filters.
    pub traveller: &'a BTreeMap<String, String>,
}

impl<'a> AccessRequest<'a> {
    pub fn new(
        facility: &'a Facility,
        direction: Direction,
        departure_time: f64,
        params: &'a RaptorParameters,
        traveller: &'a BTreeMap<String, String>,
    ) -> Self {
        Self {
            facility,
            direction,
            departure_time,
            params,
            traveller,
        }
    }
}
