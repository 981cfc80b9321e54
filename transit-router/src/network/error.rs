//! Network build errors.
//!
//! Every variant is a precondition violation detected while building the
//! index, before any query runs. A built [`NetworkIndex`](super::NetworkIndex)
//! is guaranteed free of these defects.

use crate::domain::{RouteId, StopId};

/// Errors raised while building or loading a network index.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Two stops share an id
    #[error("duplicate stop id {0}")]
    DuplicateStop(StopId),

    /// Two routes share an id
    #[error("duplicate route id {0}")]
    DuplicateRoute(RouteId),

    /// A stop has a NaN or infinite coordinate
    #[error("stop {0} has a non-finite coordinate")]
    InvalidCoordinate(StopId),

    /// A route or transfer references a stop that was never added
    #[error("unknown stop {stop} referenced by {context}")]
    UnknownStop { stop: StopId, context: String },

    /// A route visits fewer than two stops
    #[error("route {0} must visit at least two stops")]
    TooFewStops(RouteId),

    /// Offsets decrease along the route or departure precedes arrival
    #[error("route {route} has inconsistent time offsets at position {position}")]
    InvalidOffsets { route: RouteId, position: usize },

    /// Departures are not strictly increasing
    #[error("route {route} has unsorted or duplicate departures at position {position}")]
    UnsortedDepartures { route: RouteId, position: usize },

    /// A transfer has a negative or non-finite duration
    #[error("transfer from {from} to {to} has invalid duration {duration}")]
    InvalidTransfer {
        from: StopId,
        to: StopId,
        duration: f64,
    },

    /// Footpath generation parameters are not positive
    #[error("invalid footpath generation parameters: {0}")]
    InvalidFootpaths(&'static str),

    /// Reading a schedule file failed
    #[error("failed to read schedule: {0}")]
    Io(#[from] std::io::Error),

    /// Decoding a schedule file failed
    #[error("failed to decode schedule: {0}")]
    Json(#[from] serde_json::Error),
}
