//! Access and egress with several modes (walk, bike, drop-off, ...).

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use rand::{Rng, RngCore};
use serde::Deserialize;
use tracing::debug;

use crate::domain::{Coord, Mode};
use crate::network::{NetworkIndex, StopIndex};
use crate::router::ConfigError;

use super::cache::{AccessCacheConfig, AccessRouteCache};
use super::{AccessEgressResolver, AccessRequest, Direction, InitialStop};

/// Shape of a routed access leg: an optional walk to the vehicle, the ride
/// itself and an optional walk from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteCharacteristics {
    /// Metres travelled with the mode.
    pub distance: f64,
    pub stage_access_time: Option<f64>,
    pub stage_egress_time: Option<f64>,
    /// Seconds travelled with the mode.
    pub travel_time: f64,
}

impl RouteCharacteristics {
    /// The same leg travelled the other way.
    pub fn reversed(self) -> Self {
        Self {
            stage_access_time: self.stage_egress_time,
            stage_egress_time: self.stage_access_time,
            ..self
        }
    }

    fn stage_time(&self) -> f64 {
        self.stage_access_time.unwrap_or(0.0) + self.stage_egress_time.unwrap_or(0.0)
    }

    /// Door-to-door time, stages included.
    pub fn total_time(&self) -> f64 {
        self.travel_time + self.stage_time()
    }
}

/// Computes a single access or egress leg between two points.
pub trait AccessLegRouter: Send + Sync + fmt::Debug {
    /// Route from `from` to `to`, or `None` if the mode cannot connect them.
    fn route(&self, from: &Coord, to: &Coord, departure_time: f64) -> Option<RouteCharacteristics>;
}

/// Straight-line router at a constant speed, with fixed stage times for
/// fetching and parking the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BeelineLegRouter {
    /// Metres per second.
    pub speed: f64,
    #[serde(default = "default_distance_factor")]
    pub distance_factor: f64,
    #[serde(default)]
    pub stage_access_time: Option<f64>,
    #[serde(default)]
    pub stage_egress_time: Option<f64>,
}

fn default_distance_factor() -> f64 {
    1.3
}

impl BeelineLegRouter {
    pub fn new(speed: f64, distance_factor: f64) -> Self {
        Self {
            speed,
            distance_factor,
            stage_access_time: None,
            stage_egress_time: None,
        }
    }

    pub fn with_stages(mut self, access: Option<f64>, egress: Option<f64>) -> Self {
        self.stage_access_time = access;
        self.stage_egress_time = egress;
        self
    }
}

impl AccessLegRouter for BeelineLegRouter {
    fn route(&self, from: &Coord, to: &Coord, _departure_time: f64) -> Option<RouteCharacteristics> {
        if !(self.speed > 0.0) {
            return None;
        }
        let distance = from.distance(to) * self.distance_factor;
        Some(RouteCharacteristics {
            distance,
            stage_access_time: self.stage_access_time,
            stage_egress_time: self.stage_egress_time,
            travel_time: (distance / self.speed).ceil(),
        })
    }
}

/// Matches an attribute against a required value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttributeFilter {
    pub attribute: String,
    pub value: String,
}

impl AttributeFilter {
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    fn matches<'a>(&self, lookup: impl FnOnce(&str) -> Option<&'a str>) -> bool {
        lookup(&self.attribute) == Some(self.value.as_str())
    }
}

/// One access mode and where it may be used.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccessModeParams {
    pub mode: Mode,
    /// Metres around the facility searched for stops.
    pub max_radius: f64,
    /// Legs are routed on a street network and worth caching.
    #[serde(default)]
    pub routed_on_network: bool,
    /// Only stops carrying this attribute value are candidates.
    #[serde(default)]
    pub stop_filter: Option<AttributeFilter>,
    /// Only travellers carrying this attribute value may use the mode.
    #[serde(default)]
    pub traveller_filter: Option<AttributeFilter>,
}

impl AccessModeParams {
    pub fn new(mode: impl Into<Mode>, max_radius: f64) -> Self {
        Self {
            mode: mode.into(),
            max_radius,
            routed_on_network: false,
            stop_filter: None,
            traveller_filter: None,
        }
    }

    pub fn routed_on_network(mut self) -> Self {
        self.routed_on_network = true;
        self
    }

    pub fn with_stop_filter(mut self, filter: AttributeFilter) -> Self {
        self.stop_filter = Some(filter);
        self
    }

    pub fn with_traveller_filter(mut self, filter: AttributeFilter) -> Self {
        self.traveller_filter = Some(filter);
        self
    }
}

/// How the access modes are combined for one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeSelection {
    /// Try every mode and keep the cheapest candidate per stop.
    #[default]
    LeastCostPerStop,
    /// Draw one mode at random, retrying while it yields no candidate.
    RandomSingleMode,
}

/// Access modes available to a router.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IntermodalConfig {
    pub modes: Vec<AccessModeParams>,
    pub selection: ModeSelection,
}

impl IntermodalConfig {
    pub fn new(modes: Vec<AccessModeParams>, selection: ModeSelection) -> Self {
        Self { modes, selection }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.modes.is_empty() {
            return Err(ConfigError::NoAccessModes);
        }
        for params in &self.modes {
            if !(params.max_radius.is_finite() && params.max_radius >= 0.0) {
                return Err(ConfigError::Negative {
                    name: "max_radius",
                    value: params.max_radius,
                });
            }
        }
        Ok(())
    }
}

/// Resolver combining several access modes, each with its own leg router.
#[derive(Debug)]
pub struct IntermodalResolver {
    config: IntermodalConfig,
    routers: HashMap<Mode, Arc<dyn AccessLegRouter>>,
    cache: AccessRouteCache,
}

impl IntermodalResolver {
    /// Fails if no mode is configured or a mode has no leg router.
    pub fn new(
        config: IntermodalConfig,
        routers: HashMap<Mode, Arc<dyn AccessLegRouter>>,
        cache_config: &AccessCacheConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if let Some(missing) = config.modes.iter().find(|p| !routers.contains_key(&p.mode)) {
            return Err(ConfigError::MissingLegRouter(missing.mode.clone()));
        }
        Ok(Self {
            config,
            routers,
            cache: AccessRouteCache::new(cache_config),
        })
    }

    /// The configured access modes.
    pub fn config(&self) -> &IntermodalConfig {
        &self.config
    }

    /// Legs routed so far, shared by every request.
    pub fn cache(&self) -> &AccessRouteCache {
        &self.cache
    }

    fn add_candidates(
        &self,
        params: &AccessModeParams,
        request: &AccessRequest<'_>,
        network: &NetworkIndex,
        found: &mut BTreeMap<StopIndex, InitialStop>,
    ) {
        if let Some(filter) = &params.traveller_filter {
            if !filter.matches(|key| request.traveller.get(key).map(String::as_str)) {
                return;
            }
        }
        let Some(router) = self.routers.get(&params.mode) else {
            return;
        };

        let facility = request.facility;
        // Walking to the network is never routed on it
        let reported_mode = if params.mode == Mode::walk() {
            Mode::non_network_walk()
        } else {
            params.mode.clone()
        };
        let raptor = request.params;
        let mode_cost = raptor.access_mode_cost_per_second(&params.mode);
        let stage_cost = raptor.access_mode_cost_per_second(&Mode::non_network_walk());

        for stop_index in network.stops_within(&facility.coord, params.max_radius) {
            let stop = network.stop(stop_index);
            if let Some(filter) = &params.stop_filter {
                if !filter.matches(|key| stop.attribute(key)) {
                    continue;
                }
            }

            let leg = if params.routed_on_network {
                let egress = self.cache.get_or_route(&params.mode, &stop.id, &facility.id, || {
                    router.route(&stop.coord, &facility.coord, request.departure_time)
                });
                match request.direction {
                    Direction::Access => egress.map(RouteCharacteristics::reversed),
                    Direction::Egress => egress,
                }
            } else {
                match request.direction {
                    Direction::Access => {
                        router.route(&facility.coord, &stop.coord, request.departure_time)
                    }
                    Direction::Egress => {
                        router.route(&stop.coord, &facility.coord, request.departure_time)
                    }
                }
            };
            let Some(leg) = leg else {
                continue;
            };

            let candidate = InitialStop::new(
                stop_index,
                leg.total_time(),
                leg.travel_time * mode_cost + leg.stage_time() * stage_cost,
                leg.distance,
                reported_mode.clone(),
            );
            let better = found
                .get(&stop_index)
                .is_none_or(|existing| candidate.cost < existing.cost);
            if better {
                found.insert(stop_index, candidate);
            }
        }
    }
}

impl AccessEgressResolver for IntermodalResolver {
    fn find_candidates(
        &self,
        request: &AccessRequest<'_>,
        network: &NetworkIndex,
        rng: &mut dyn RngCore,
    ) -> Vec<InitialStop> {
        let mut found = BTreeMap::new();
        match self.config.selection {
            ModeSelection::LeastCostPerStop => {
                for params in &self.config.modes {
                    self.add_candidates(params, request, network, &mut found);
                }
            }
            ModeSelection::RandomSingleMode => {
                let modes = &self.config.modes;
                // Bounded retries when the drawn mode finds nothing
                for _ in 0..2 * modes.len() {
                    let choice = rng.gen_range(0..modes.len());
                    debug!(mode = %modes[choice].mode, "selected access mode");
                    self.add_candidates(&modes[choice], request, network, &mut found);
                    if !found.is_empty() {
                        break;
                    }
                }
            }
        }

        debug!(
            facility = %request.facility.id,
            direction = ?request.direction,
            candidates = found.len(),
            "intermodal candidates"
        );
        found.into_values().collect()
    }
}
