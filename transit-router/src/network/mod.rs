//! Read-only network index consumed by the search engine.
//!
//! The index condenses a timetable snapshot into flat arrays: stops,
//! route-stops (a stop visited by a route at a given position), routes with
//! their sorted departures, and footpath transfers between stops. It is built
//! once by [`NetworkBuilder`], validated at build time, and then shared
//! read-only (typically behind an `Arc`) by any number of concurrent searches.

mod builder;
mod error;
mod index;
mod io;
mod spatial;

pub use builder::{DepartureSpec, FootpathGeneration, NetworkBuilder, RouteSpec, RouteStopSpec};
pub use error::NetworkError;
pub use index::{
    Departure, DepartureIndex, NetworkIndex, Route, RouteIndex, RouteStop, RouteStopIndex, Stop,
    StopIndex, Transfer,
};
pub use io::{ScheduleFile, StopRecord, TransferRecord, load_network};
pub use spatial::StopLocator;
