//! Identifier newtypes.
//!
//! Every identifier is an owned string wrapped in its own type so that a stop
//! id can never be passed where a route id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from any string-like value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identifier of a physical stop.
    StopId
);

string_id!(
    /// Identifier of a transit line (a family of routes).
    LineId
);

string_id!(
    /// Identifier of one directional stopping pattern of a line.
    RouteId
);

string_id!(
    /// Identifier of an origin or destination facility (home, work, ...).
    FacilityId
);

string_id!(
    /// A transport mode tag such as `train`, `bus` or `walk`.
    Mode
);

impl Mode {
    /// Walking legs that are not routed on a network (beeline walks).
    pub fn non_network_walk() -> Self {
        Self::new("non_network_walk")
    }

    /// Walking between two stops during a transfer.
    pub fn transit_walk() -> Self {
        Self::new("transit_walk")
    }

    /// Walking from the origin facility to the first stop.
    pub fn access_walk() -> Self {
        Self::new("access_walk")
    }

    /// Walking from the last stop to the destination facility.
    pub fn egress_walk() -> Self {
        Self::new("egress_walk")
    }

    /// The plain walk mode.
    pub fn walk() -> Self {
        Self::new("walk")
    }
}
