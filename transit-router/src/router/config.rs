//! Search parameters and static router configuration.
//!
//! Marginal utilities follow the scoring convention: they are utilities per
//! hour and must be zero or negative. The engine works with costs, which are
//! their negation converted to seconds, so every cost it accumulates is
//! non-negative. Transfer penalties are given directly as costs.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Deserialize;

use crate::domain::Mode;

/// Error raised when search or access configuration is inconsistent.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A marginal utility is positive, which would yield negative costs
    #[error("marginal utility of {name} must not be positive, got {value}")]
    PositiveUtility { name: String, value: f64 },

    /// A transfer penalty component is negative or not finite
    #[error("transfer penalty {name} must be a non-negative number, got {value}")]
    InvalidPenalty { name: &'static str, value: f64 },

    /// A speed or factor is zero, negative or not finite
    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    /// A radius or duration is negative or not finite
    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    /// A mode-to-mode penalty references a mode no route serves
    #[error("mode-to-mode penalty references unknown mode {0}")]
    UnknownMode(Mode),

    /// A mode-to-mode penalty connects a mode with itself
    #[error("mode-to-mode penalty from {0} to itself")]
    SameModePenalty(Mode),

    /// A mode-to-mode penalty is negative or not finite
    #[error("mode-to-mode penalty from {from} to {to} must be non-negative, got {penalty}")]
    InvalidModePenalty { from: Mode, to: Mode, penalty: f64 },

    /// The same mode pair is configured twice
    #[error("duplicate mode-to-mode penalty from {from} to {to}")]
    DuplicateModePenalty { from: Mode, to: Mode },

    /// No access mode parameter sets are configured
    #[error("intermodal access needs at least one mode")]
    NoAccessModes,

    /// An access mode has no leg router registered
    #[error("no access leg router registered for mode {0}")]
    MissingLegRouter(Mode),
}

/// Transfer penalty `clamp(base + per_hour * hours, min, max)`.
///
/// Missing bounds leave that side unclamped. Inverted bounds are swapped.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransferPenalty {
    pub base: f64,
    pub per_hour: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl TransferPenalty {
    /// A constant penalty independent of travel time.
    pub fn flat(base: f64) -> Self {
        Self {
            base,
            per_hour: 0.0,
            min: None,
            max: None,
        }
    }

    pub fn new(base: f64, per_hour: f64, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            base,
            per_hour,
            min,
            max,
        }
    }

    /// The penalty for one transfer after `elapsed` seconds of travel.
    pub fn cost(&self, elapsed: f64) -> f64 {
        self.cost_with_base(0.0, elapsed)
    }

    /// Like [`cost`](Self::cost), with `extra` added to the base before
    /// clamping.
    pub fn cost_with_base(&self, extra: f64, elapsed: f64) -> f64 {
        let cost = self.base + extra + self.per_hour * elapsed / 3600.0;
        let (lower, upper) = match (self.min, self.max) {
            (Some(a), Some(b)) => (Some(a.min(b)), Some(a.max(b))),
            bounds => bounds,
        };
        let cost = upper.map_or(cost, |upper| cost.min(upper));
        lower.map_or(cost, |lower| cost.max(lower))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let components = [
            ("base", Some(self.base)),
            ("per_hour", Some(self.per_hour)),
            ("min", self.min),
            ("max", self.max),
        ];
        for (name, value) in components {
            if let Some(value) = value {
                if !(value.is_finite() && value >= 0.0) {
                    return Err(ConfigError::InvalidPenalty { name, value });
                }
            }
        }
        Ok(())
    }
}

impl Default for TransferPenalty {
    fn default() -> Self {
        Self::flat(1.0)
    }
}

/// Per-query search parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RaptorParameters {
    /// Marginal utility of in-vehicle time, per hour.
    pub marginal_utility_in_vehicle: f64,

    /// Marginal utility of waiting for a vehicle, per hour.
    pub marginal_utility_waiting: f64,

    /// Marginal utility of walking, per hour. Applies to transfers and to
    /// beeline access and egress walks.
    pub marginal_utility_walk: f64,

    /// Marginal utility per hour of travel time of other access modes.
    /// Modes not listed use the walk utility.
    pub access_mode_utilities: BTreeMap<Mode, f64>,

    pub transfer_penalty: TransferPenalty,

    /// Beeline walking speed in metres per second.
    pub beeline_walk_speed: f64,

    /// Ratio of walked distance to beeline distance.
    pub beeline_distance_factor: f64,

    /// Radius in metres searched for access and egress stops.
    pub search_radius: f64,

    /// Added to the nearest stop's distance when the search radius finds
    /// fewer than two stops.
    pub extension_radius: f64,

    /// Lower bound on the duration of any transfer, in seconds.
    pub min_transfer_time: f64,

    /// Maximum number of transfers, and so of search rounds.
    pub max_transfers: usize,
}

impl RaptorParameters {
    pub fn in_vehicle_cost_per_second(&self) -> f64 {
        -self.marginal_utility_in_vehicle / 3600.0
    }

    pub fn waiting_cost_per_second(&self) -> f64 {
        -self.marginal_utility_waiting / 3600.0
    }

    pub fn walk_cost_per_second(&self) -> f64 {
        -self.marginal_utility_walk / 3600.0
    }

    /// Cost per second of travelling with an access mode.
    pub fn access_mode_cost_per_second(&self, mode: &Mode) -> f64 {
        self.access_mode_utilities
            .get(mode)
            .map_or_else(|| self.walk_cost_per_second(), |u| -u / 3600.0)
    }

    /// Check that every parameter produces non-negative costs and sane
    /// distances.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let utilities = [
            ("in-vehicle time", self.marginal_utility_in_vehicle),
            ("waiting", self.marginal_utility_waiting),
            ("walking", self.marginal_utility_walk),
        ];
        for (name, value) in utilities {
            check_utility(name.to_string(), value)?;
        }
        for (mode, &value) in &self.access_mode_utilities {
            check_utility(format!("access mode {mode}"), value)?;
        }

        self.transfer_penalty.validate()?;

        let positive = [
            ("beeline walk speed", self.beeline_walk_speed),
            ("beeline distance factor", self.beeline_distance_factor),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { name, value });
            }
        }

        let non_negative = [
            ("search radius", self.search_radius),
            ("extension radius", self.extension_radius),
            ("minimal transfer time", self.min_transfer_time),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Negative { name, value });
            }
        }
        Ok(())
    }
}

fn check_utility(name: String, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value <= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::PositiveUtility { name, value })
    }
}

impl Default for RaptorParameters {
    fn default() -> Self {
        Self {
            marginal_utility_in_vehicle: -6.0,
            marginal_utility_waiting: -6.0,
            marginal_utility_walk: -12.0,
            access_mode_utilities: BTreeMap::new(),
            transfer_penalty: TransferPenalty::default(),
            beeline_walk_speed: 1.34,
            beeline_distance_factor: 1.3,
            search_radius: 1000.0,
            extension_radius: 200.0,
            min_transfer_time: 60.0,
            max_transfers: 99,
        }
    }
}

/// One configured mode-to-mode transfer penalty.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModeToModePenalty {
    pub from_mode: Mode,
    pub to_mode: Mode,
    /// Cost added once when switching from `from_mode` to `to_mode`.
    pub penalty: f64,
}

impl ModeToModePenalty {
    pub fn new(from_mode: impl Into<Mode>, to_mode: impl Into<Mode>, penalty: f64) -> Self {
        Self {
            from_mode: from_mode.into(),
            to_mode: to_mode.into(),
            penalty,
        }
    }
}

/// Configuration fixed for the lifetime of a router instance.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RaptorStaticConfig {
    /// Empty disables mode-to-mode penalties.
    pub mode_to_mode_penalties: Vec<ModeToModePenalty>,
}

impl RaptorStaticConfig {
    /// Validate the mode-to-mode penalties against the modes of a network.
    ///
    /// Returns `None` when no penalties are configured.
    pub fn mode_to_mode_table(
        &self,
        modes: &BTreeSet<Mode>,
    ) -> Result<Option<ModeToModePenalties>, ConfigError> {
        if self.mode_to_mode_penalties.is_empty() {
            return Ok(None);
        }
        ModeToModePenalties::new(self.mode_to_mode_penalties.iter().cloned(), modes).map(Some)
    }
}

/// Validated lookup table of mode-to-mode transfer penalties.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeToModePenalties {
    /// from mode -> to mode -> penalty
    table: HashMap<Mode, HashMap<Mode, f64>>,
}

impl ModeToModePenalties {
    /// Build the table, rejecting unknown modes, same-mode pairs, duplicates
    /// and negative penalties.
    pub fn new(
        entries: impl IntoIterator<Item = ModeToModePenalty>,
        modes: &BTreeSet<Mode>,
    ) -> Result<Self, ConfigError> {
        let mut table = HashMap::new();
        for entry in entries {
            for mode in [&entry.from_mode, &entry.to_mode] {
                if !modes.contains(mode) {
                    return Err(ConfigError::UnknownMode(mode.clone()));
                }
            }
            if entry.from_mode == entry.to_mode {
                return Err(ConfigError::SameModePenalty(entry.from_mode));
            }
            if !(entry.penalty.is_finite() && entry.penalty >= 0.0) {
                return Err(ConfigError::InvalidModePenalty {
                    from: entry.from_mode,
                    to: entry.to_mode,
                    penalty: entry.penalty,
                });
            }
            let targets: &mut HashMap<Mode, f64> =
                table.entry(entry.from_mode.clone()).or_default();
            if targets.contains_key(&entry.to_mode) {
                return Err(ConfigError::DuplicateModePenalty {
                    from: entry.from_mode,
                    to: entry.to_mode,
                });
            }
            targets.insert(entry.to_mode, entry.penalty);
        }
        Ok(Self { table })
    }

    /// The penalty for switching between two modes; zero if none is configured.
    pub fn penalty(&self, from: &Mode, to: &Mode) -> f64 {
        self.table
            .get(from)
            .and_then(|targets| targets.get(to))
            .copied()
            .unwrap_or(0.0)
    }

    /// Number of configured mode pairs.
    pub fn len(&self) -> usize {
        self.table.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
