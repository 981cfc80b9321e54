//! JSON schedule files.
//!
//! A schedule file lists stops, routes and explicit transfers, and may ask
//! for footpaths to be generated between nearby stops:
//!
//! ```json
//! {
//!   "stops": [{"id": "1", "name": "First", "x": 3000, "y": 1000}],
//!   "routes": [{
//!     "id": "blue1", "line": "blue", "mode": "train",
//!     "stops": [{"stop": "1", "arrival": 0, "departure": 0}, ...],
//!     "departures": [{"id": "b1", "time": "08:00:00"}]
//!   }],
//!   "transfers": [{"from": "2", "to": "2", "duration": 60}],
//!   "footpaths": {"max_distance": 300, "walk_speed": 1.34}
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::domain::{Coord, StopId};

use super::builder::{FootpathGeneration, NetworkBuilder, RouteSpec};
use super::error::NetworkError;
use super::index::{NetworkIndex, Stop};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StopRecord {
    pub id: StopId,
    #[serde(default)]
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl From<StopRecord> for Stop {
    fn from(record: StopRecord) -> Self {
        Stop {
            name: if record.name.is_empty() {
                record.id.to_string()
            } else {
                record.name
            },
            id: record.id,
            coord: Coord::new(record.x, record.y),
            attributes: record.attributes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransferRecord {
    pub from: StopId,
    pub to: StopId,
    /// Walking duration in seconds.
    pub duration: f64,
}

/// The deserialized content of a schedule file.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleFile {
    pub stops: Vec<StopRecord>,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
    #[serde(default)]
    pub transfers: Vec<TransferRecord>,
    #[serde(default)]
    pub footpaths: Option<FootpathGeneration>,
    #[serde(default = "default_true")]
    pub intra_stop_transfers: bool,
}

fn default_true() -> bool {
    true
}

impl ScheduleFile {
    /// Read and decode a schedule file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, NetworkError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, NetworkError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Validate the schedule and build the index.
    pub fn into_network(self) -> Result<NetworkIndex, NetworkError> {
        let mut builder = NetworkBuilder::new();
        builder.intra_stop_transfers(self.intra_stop_transfers);
        for record in self.stops {
            builder.add_stop(record.into())?;
        }
        for route in self.routes {
            builder.add_route(route);
        }
        for transfer in self.transfers {
            builder.add_transfer(transfer.from, transfer.to, transfer.duration);
        }
        if let Some(footpaths) = self.footpaths {
            builder.generate_transfers(footpaths);
        }
        builder.build()
    }
}

/// Load a schedule file straight into a network index.
pub fn load_network(path: impl AsRef<Path>) -> Result<NetworkIndex, NetworkError> {
    ScheduleFile::from_path(path)?.into_network()
}
