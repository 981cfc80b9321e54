//! Domain types for the transit router.
//!
//! Identifiers, coordinates and time-of-day handling shared by the network
//! index, the search engine and the access/egress resolvers.

mod coord;
mod error;
mod ids;
mod time;

pub use coord::Coord;
pub use error::DomainError;
pub use ids::{FacilityId, LineId, Mode, RouteId, StopId};
pub use time::{TimeError, deserialize_time, format_time, parse_time, to_duration};
