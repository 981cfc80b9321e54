//! Reuse of search engines across concurrent queries.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;

use crate::network::NetworkIndex;

use super::engine::RaptorEngine;
use super::transfer_cost::TransferCostPolicy;

/// Hands out [`RaptorEngine`]s to concurrent queries.
///
/// Engines are created on demand and returned to the pool after use, so the
/// pool grows to the peak number of simultaneous queries and their scratch
/// allocations are reused afterwards.
#[derive(Debug)]
pub struct EnginePool {
    network: Arc<NetworkIndex>,
    policy: Arc<dyn TransferCostPolicy>,
    idle: Mutex<Vec<RaptorEngine>>,
}

impl EnginePool {
    /// Create an empty pool; engines are built on first use.
    pub fn new(network: Arc<NetworkIndex>, policy: Arc<dyn TransferCostPolicy>) -> Self {
        Self {
            network,
            policy,
            idle: Mutex::new(Vec::new()),
        }
    }

    /// The network shared by every engine of the pool.
    pub fn network(&self) -> &Arc<NetworkIndex> {
        &self.network
    }

    /// Run `f` with exclusive use of an engine.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut RaptorEngine) -> R) -> R {
        let pooled = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        let mut engine = pooled.unwrap_or_else(|| {
            trace!("creating search engine");
            RaptorEngine::new(Arc::clone(&self.network), Arc::clone(&self.policy))
        });

        let result = f(&mut engine);

        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(engine);
        result
    }

    /// Engines currently waiting for a query.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
