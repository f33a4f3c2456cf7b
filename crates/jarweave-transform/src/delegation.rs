//! Delegation list construction and caching
//!
//! The delegation list is the ordered subset of registered transformers
//! allowed to run against delegated class data. It is built lazily and
//! cached until a transform exclusion is added or a phase boundary is
//! crossed. Rebuilds happen under the cache lock, so a concurrent
//! invalidation can never observe a half-built list.

use crate::exclusion::ExclusionRegistry;
use crate::transformer::{Transformer, TransformerRegistry};
use parking_lot::Mutex;
use std::sync::Arc;

/// Cached delegation list state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegationState {
    /// No list cached, the next access rebuilds
    Unbuilt,
    /// A current list is cached
    Built,
}

struct Snapshot {
    generation: u64,
    transformers: Arc<[Arc<dyn Transformer>]>,
}

/// Lazily rebuilt delegation list
#[derive(Default)]
pub struct DelegationList {
    cache: Mutex<Option<Snapshot>>,
}

impl DelegationList {
    /// Create an unbuilt list
    pub fn new() -> Self {
        Self::default()
    }

    /// Current list, rebuilding it first if it is unbuilt or stale
    pub fn get(
        &self,
        registry: &TransformerRegistry,
        exclusions: &ExclusionRegistry,
    ) -> Arc<[Arc<dyn Transformer>]> {
        let mut cache = self.cache.lock();
        let generation = exclusions.transform_generation();
        if let Some(snapshot) = cache.as_ref() {
            if snapshot.generation == generation {
                return Arc::clone(&snapshot.transformers);
            }
        }

        let transformers: Arc<[Arc<dyn Transformer>]> =
            build_delegation_list(&registry.snapshot(), exclusions).into();
        *cache = Some(Snapshot {
            generation,
            transformers: Arc::clone(&transformers),
        });
        transformers
    }

    /// Drop the cached list
    pub fn invalidate(&self) {
        *self.cache.lock() = None;
    }

    /// Whether a current list is cached
    pub fn state(&self, exclusions: &ExclusionRegistry) -> DelegationState {
        match self.cache.lock().as_ref() {
            Some(snapshot) if snapshot.generation == exclusions.transform_generation() => {
                DelegationState::Built
            }
            _ => DelegationState::Unbuilt,
        }
    }
}

/// Filter `transformers` down to the ones eligible for delegation
///
/// Registration order is preserved. A transformer is left out when its
/// name starts with a transform exclusion prefix or when it opts out of
/// delegation itself.
pub fn build_delegation_list(
    transformers: &[Arc<dyn Transformer>],
    exclusions: &ExclusionRegistry,
) -> Vec<Arc<dyn Transformer>> {
    tracing::debug!("Rebuilding transformer delegation list:");
    let mut list = Vec::with_capacity(transformers.len());
    for transformer in transformers {
        let name = transformer.name();
        if exclusions.is_transform_excluded(name, None) || transformer.is_delegation_excluded() {
            tracing::debug!("  Excluding: {}", name);
            continue;
        }
        tracing::debug!("  Adding:    {}", name);
        list.push(Arc::clone(transformer));
    }
    tracing::debug!("Transformer delegation list created with {} entries", list.len());
    list
}
