//! Planning facade: facilities in, itinerary out.
//!
//! [`TransitRouter`] resolves access and egress candidates for the origin
//! and destination, then runs the search on an engine drawn from its pool.
//! One router serves any number of concurrent queries.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use rand::RngCore;
use serde::Deserialize;
use tracing::debug;

use crate::access::{
    AccessCacheConfig, AccessEgressResolver, AccessLegRouter, AccessRequest, BeelineLegRouter,
    BeelineWalkResolver, Direction, Facility, IntermodalConfig, IntermodalResolver,
};
use crate::domain::{Mode, deserialize_time};
use crate::network::NetworkIndex;
use crate::router::{
    ConfigError, EnginePool, Itinerary, RaptorParameters, RaptorStaticConfig,
    TimeProportionalTransferCost, TransferCostPolicy,
};

/// Error from planning.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Parameters or router configuration are inconsistent
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The request itself is malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Reading a query file failed
    #[error("failed to read query: {0}")]
    Io(#[from] std::io::Error),

    /// Decoding a query file failed
    #[error("failed to decode query: {0}")]
    Json(#[from] serde_json::Error),
}

/// A trip to plan.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub origin: Facility,
    pub destination: Facility,
    /// Seconds after midnight.
    pub departure_time: f64,
    /// Traveller attributes consulted by access mode filters.
    pub traveller: BTreeMap<String, String>,
}

impl PlanRequest {
    pub fn new(origin: Facility, destination: Facility, departure_time: f64) -> Self {
        Self {
            origin,
            destination,
            departure_time,
            traveller: BTreeMap::new(),
        }
    }

    pub fn with_traveller(mut self, traveller: BTreeMap<String, String>) -> Self {
        self.traveller = traveller;
        self
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if !self.departure_time.is_finite() {
            return Err(PlanError::InvalidRequest(format!(
                "departure time {} is not a number of seconds",
                self.departure_time
            )));
        }
        for facility in [&self.origin, &self.destination] {
            if !facility.coord.is_finite() {
                return Err(PlanError::InvalidRequest(format!(
                    "facility {} has a non-finite coordinate",
                    facility.id
                )));
            }
        }
        Ok(())
    }
}

/// Least-cost transit planner over one network.
#[derive(Debug)]
pub struct TransitRouter {
    pool: EnginePool,
    resolver: Arc<dyn AccessEgressResolver>,
}

impl TransitRouter {
    /// Router with time-proportional transfer costs, plus the mode-to-mode
    /// penalties of `config` when it has any.
    pub fn new(
        network: Arc<NetworkIndex>,
        config: &RaptorStaticConfig,
        resolver: Arc<dyn AccessEgressResolver>,
    ) -> Result<Self, PlanError> {
        let policy = match config.mode_to_mode_table(network.modes())? {
            Some(table) => TimeProportionalTransferCost::with_mode_to_mode(table),
            None => TimeProportionalTransferCost::new(),
        };
        Ok(Self::with_policy(network, Arc::new(policy), resolver))
    }

    pub fn with_policy(
        network: Arc<NetworkIndex>,
        policy: Arc<dyn TransferCostPolicy>,
        resolver: Arc<dyn AccessEgressResolver>,
    ) -> Self {
        Self {
            pool: EnginePool::new(network, policy),
            resolver,
        }
    }

    pub fn network(&self) -> &Arc<NetworkIndex> {
        self.pool.network()
    }

    /// Plan a trip. `Ok(None)` means no itinerary exists.
    pub fn plan(
        &self,
        request: &PlanRequest,
        params: &RaptorParameters,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Itinerary>, PlanError> {
        request.validate()?;
        params.validate()?;
        let network = self.pool.network();

        let access = self.resolver.find_candidates(
            &AccessRequest::new(
                &request.origin,
                Direction::Access,
                request.departure_time,
                params,
                &request.traveller,
            ),
            network,
            rng,
        );
        let egress = self.resolver.find_candidates(
            &AccessRequest::new(
                &request.destination,
                Direction::Egress,
                request.departure_time,
                params,
                &request.traveller,
            ),
            network,
            rng,
        );
        if access.is_empty() || egress.is_empty() {
            debug!(
                access = access.len(),
                egress = egress.len(),
                "no stops near origin or destination"
            );
            return Ok(None);
        }

        Ok(self.pool.with_engine(|engine| {
            engine.find_best_itinerary(
                request.departure_time,
                &access,
                &egress,
                params.max_transfers,
                params,
            )
        }))
    }
}

/// Intermodal access section of a query file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IntermodalSection {
    #[serde(flatten)]
    pub config: IntermodalConfig,
    /// Straight-line leg router per access mode.
    pub leg_routers: BTreeMap<Mode, BeelineLegRouter>,
    pub cache: Option<u64>,
}

/// The deserialized content of a query file.
///
/// ```json
/// {
///   "origin": {"id": "home", "coord": {"x": 3000, "y": 1100}},
///   "destination": {"id": "work", "coord": {"x": 9000, "y": 1100}},
///   "departure_time": "07:55",
///   "parameters": {"transfer_penalty": {"base": 1, "per_hour": 2, "max": 12}},
///   "router": {"mode_to_mode_penalties": [{"from_mode": "train", "to_mode": "bus", "penalty": 1.5}]},
///   "seed": 42
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct QueryFile {
    pub origin: Facility,
    pub destination: Facility,
    #[serde(deserialize_with = "deserialize_time")]
    pub departure_time: f64,
    #[serde(default)]
    pub parameters: RaptorParameters,
    #[serde(default)]
    pub router: RaptorStaticConfig,
    /// Beeline walking when absent.
    #[serde(default)]
    pub intermodal: Option<IntermodalSection>,
    #[serde(default)]
    pub traveller: BTreeMap<String, String>,
    /// Seed for random access mode selection.
    #[serde(default)]
    pub seed: u64,
}

impl QueryFile {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, PlanError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn request(&self) -> PlanRequest {
        PlanRequest::new(
            self.origin.clone(),
            self.destination.clone(),
            self.departure_time,
        )
        .with_traveller(self.traveller.clone())
    }

    /// The access resolver this query asks for.
    pub fn resolver(&self) -> Result<Arc<dyn AccessEgressResolver>, PlanError> {
        let Some(section) = &self.intermodal else {
            return Ok(Arc::new(BeelineWalkResolver::new()));
        };
        let routers: HashMap<Mode, Arc<dyn AccessLegRouter>> = section
            .leg_routers
            .iter()
            .map(|(mode, router)| (mode.clone(), Arc::new(*router) as Arc<dyn AccessLegRouter>))
            .collect();
        let mut cache = AccessCacheConfig::default();
        if let Some(capacity) = section.cache {
            cache.max_capacity = capacity;
        }
        let resolver = IntermodalResolver::new(section.config.clone(), routers, &cache)?;
        Ok(Arc::new(resolver))
    }

    /// Build a router for this query over `network`.
    pub fn router(&self, network: Arc<NetworkIndex>) -> Result<TransitRouter, PlanError> {
        TransitRouter::new(network, &self.router, self.resolver()?)
    }
}
