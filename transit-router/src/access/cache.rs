//! Cross-query cache of routed access legs.
//!
//! The same stop/facility pairs recur across many queries, so legs of modes
//! routed on a street network are computed once and shared. Entries are
//! always stored in the stop-to-facility orientation; access requests use
//! the mirrored characteristics.

use moka::sync::Cache as MokaCache;

use crate::domain::{FacilityId, Mode, StopId};

use super::intermodal::RouteCharacteristics;

/// Cache key: (access mode, stop, facility).
type LegKey = (Mode, StopId, FacilityId);

/// Configuration for the access leg cache.
#[derive(Debug, Clone)]
pub struct AccessCacheConfig {
    /// Maximum number of cached stop/facility pairs.
    pub max_capacity: u64,
}

impl Default for AccessCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 100_000,
        }
    }
}

/// Concurrent cache of access leg characteristics.
///
/// `None` entries record pairs the leg router could not connect, so failed
/// lookups are not repeated either.
#[derive(Debug, Clone)]
pub struct AccessRouteCache {
    legs: MokaCache<LegKey, Option<RouteCharacteristics>>,
}

impl AccessRouteCache {
    pub fn new(config: &AccessCacheConfig) -> Self {
        Self {
            legs: MokaCache::builder()
                .max_capacity(config.max_capacity)
                .build(),
        }
    }

    /// Look up the stop-to-facility leg, computing it with `route` on a miss.
    ///
    /// Concurrent misses for the same key run `route` once; the other
    /// callers wait for its result.
    pub fn get_or_route(
        &self,
        mode: &Mode,
        stop: &StopId,
        facility: &FacilityId,
        route: impl FnOnce() -> Option<RouteCharacteristics>,
    ) -> Option<RouteCharacteristics> {
        let key = (mode.clone(), stop.clone(), facility.clone());
        self.legs.get_with(key, route)
    }

    pub fn get(
        &self,
        mode: &Mode,
        stop: &StopId,
        facility: &FacilityId,
    ) -> Option<Option<RouteCharacteristics>> {
        self.legs
            .get(&(mode.clone(), stop.clone(), facility.clone()))
    }

    /// Approximate entry count (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.legs.run_pending_tasks();
        self.legs.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.legs.invalidate_all();
    }
}

impl Default for AccessRouteCache {
    fn default() -> Self {
        Self::new(&AccessCacheConfig::default())
    }
}
