//! Transformer service
//!
//! [`TransformerService`] is the surface a transforming class loader talks
//! to. It owns the transformer registry, the exclusion sets, the cached
//! delegation list and the class sources, and it runs delegated
//! transformers over class bytes with re-entrance detection.

use crate::archive::{self, RewriteReport};
use crate::chain::{self, TransformChain};
use crate::config::{ConfigError, PipelineConfig};
use crate::delegation::{DelegationList, DelegationState};
use crate::error::PipelineError;
use crate::exclusion::{ClassTracker, ExclusionKind, ExclusionRegistry};
use crate::guard::ReEntranceGuard;
use crate::source::ClassSource;
use crate::transformer::{TransformContext, Transformer, TransformerRegistry};
use jarweave_classfile::{ClassCodec, ClassName, ClassNode, StructuralCodec, WriterOptions};
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::Arc;

/// Pipeline instance backing one class loader
pub struct TransformerService {
    config: PipelineConfig,
    codec: Arc<dyn ClassCodec>,
    registry: TransformerRegistry,
    exclusions: Arc<ExclusionRegistry>,
    delegation: DelegationList,
    sources: RwLock<Vec<Arc<dyn ClassSource>>>,
    demoted: Mutex<Vec<String>>,
}

impl TransformerService {
    /// Create a service from a configuration
    ///
    /// The configured exclusion prefixes are registered up front.
    pub fn new(config: PipelineConfig) -> Self {
        let codec = StructuralCodec::new(WriterOptions {
            compute_maxs: config.compute_maxs,
        });
        let exclusions = ExclusionRegistry::new();
        for prefix in &config.load_exclusions {
            exclusions.exclude_from_load(prefix);
        }
        for prefix in &config.transform_exclusions {
            exclusions.exclude_from_transform(prefix);
        }

        Self {
            config,
            codec: Arc::new(codec),
            registry: TransformerRegistry::new(),
            exclusions: Arc::new(exclusions),
            delegation: DelegationList::new(),
            sources: RwLock::new(Vec::new()),
            demoted: Mutex::new(Vec::new()),
        }
    }

    /// Create a service from a validated configuration
    pub fn from_config(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Use a different class codec
    pub fn with_codec(mut self, codec: Arc<dyn ClassCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Exclusion sets and class bookkeeping
    pub fn exclusions(&self) -> &Arc<ExclusionRegistry> {
        &self.exclusions
    }

    // ===== Registration =====

    /// Register a transformer after every previously registered one
    ///
    /// The cached delegation list is not invalidated; call
    /// [`Self::begin_phase`] to pick up transformers registered after the
    /// list was first built.
    pub fn register_transformer(&self, transformer: Arc<dyn Transformer>) {
        if transformer.name_remapper().is_some() {
            tracing::debug!(
                "Transformer '{}' provides a name remapper",
                transformer.name()
            );
        }
        self.registry.register(transformer);
    }

    /// Every registered transformer, in registration order
    pub fn transformers(&self) -> Vec<Arc<dyn Transformer>> {
        self.registry.snapshot()
    }

    /// Add a class source; sources are consulted in the order added
    pub fn add_source(&self, source: Arc<dyn ClassSource>) {
        self.sources.write().push(source);
    }

    // ===== Delegation =====

    /// Transformers eligible to run against delegated class data
    pub fn delegated_transformers(&self) -> Arc<[Arc<dyn Transformer>]> {
        self.delegation.get(&self.registry, &self.exclusions)
    }

    /// Whether the delegation list is currently cached
    pub fn delegation_state(&self) -> DelegationState {
        self.delegation.state(&self.exclusions)
    }

    /// Register an exclusion prefix
    ///
    /// Transform exclusions invalidate the delegation list.
    pub fn register_exclusion(&self, kind: ExclusionKind, prefix: &str) {
        if self.exclusions.exclude(kind, prefix) && kind == ExclusionKind::Transform {
            self.delegation.invalidate();
        }
    }

    /// Exclude a transformer (by name prefix) from delegation
    pub fn add_transformer_exclusion(&self, name: &str) {
        self.exclusions.exclude_from_transform(name);
        self.delegation.invalidate();
    }

    /// Mark a phase boundary; the delegation list is rebuilt on next use
    pub fn begin_phase(&self) {
        tracing::debug!("Phase boundary, invalidating transformer delegation list");
        self.delegation.invalidate();
    }

    /// Chain of the currently delegated transformers
    pub fn delegated_chain(&self) -> TransformChain {
        TransformChain::new(self.delegated_transformers().to_vec())
            .with_codec(Arc::clone(&self.codec))
            .with_exclusions(Arc::clone(&self.exclusions))
    }

    /// Names of transformers demoted for re-entrance, in demotion order
    pub fn demoted_transformers(&self) -> Vec<String> {
        self.demoted.lock().clone()
    }

    fn demote(&self, name: &str) {
        self.add_transformer_exclusion(name);
        self.demoted.lock().push(name.to_string());
        tracing::info!(
            "A re-entrant transformer '{}' was detected and will no longer process meta class data",
            name
        );
    }

    // ===== Class data =====

    /// Comma-joined exclusion categories that apply to `name`
    pub fn class_restrictions(&self, name: &str) -> String {
        self.exclusions.class_restrictions(name)
    }

    /// Map a transformed name back to its raw name
    ///
    /// The last registered transformer offering a name remapper decides.
    /// Remappers always see the dotted form of `name`.
    pub fn unmap_class_name(&self, name: &str) -> ClassName {
        let name = ClassName::new(name);
        let transformers = self.registry.snapshot();
        match transformers.iter().rev().find_map(|t| t.name_remapper()) {
            Some(remapper) => ClassName::new(&remapper.unmap_class_name(name.dotted())),
            None => name,
        }
    }

    /// Bytes of the class `name`, optionally run through the delegated transformers
    pub fn class_bytes(&self, name: &str, run_transformers: bool) -> Result<Vec<u8>, PipelineError> {
        let guard = ReEntranceGuard::new(self.config.reentrance_depth);
        self.class_bytes_guarded(name, run_transformers, &guard)
    }

    /// Decoded form of the class `name`
    pub fn class_node(&self, name: &str, run_transformers: bool) -> Result<ClassNode, PipelineError> {
        let bytes = self.class_bytes(name, run_transformers)?;
        self.codec
            .decode(&bytes)
            .map_err(|source| PipelineError::Decode {
                class: ClassName::new(name).to_string(),
                source,
            })
    }

    /// Record that the loader defined a class
    pub fn mark_class_loaded(&self, name: &str) {
        self.exclusions.mark_class_loaded(name);
    }

    /// Whether the loader has defined a class
    pub fn is_class_loaded(&self, name: &str) -> bool {
        self.exclusions.is_class_loaded(name)
    }

    /// Prevent the loader from defining a class
    pub fn register_invalid_class(&self, name: &str) {
        self.exclusions.register_invalid_class(name);
    }

    /// Whether a class was registered as invalid
    pub fn is_class_invalid(&self, name: &str) -> bool {
        self.exclusions.is_class_invalid(name)
    }

    /// Rewrite an archive in place through the delegated transformers
    pub fn rewrite_archive(&self, path: &Path) -> Result<RewriteReport, PipelineError> {
        archive::rewrite_archive(path, &self.delegated_chain())
    }

    fn class_bytes_guarded(
        &self,
        name: &str,
        run_transformers: bool,
        guard: &ReEntranceGuard,
    ) -> Result<Vec<u8>, PipelineError> {
        let transformed_name = ClassName::new(name);
        let raw_name = self.unmap_class_name(name);
        let not_found = || PipelineError::NotFound(transformed_name.to_string());

        let bytes = self
            .find_class_bytes(&raw_name, &transformed_name)?
            .ok_or_else(not_found)?;
        if !run_transformers {
            return Ok(bytes);
        }
        self.apply_transformers(&raw_name, &transformed_name, bytes, guard)?
            .ok_or_else(not_found)
    }

    fn find_class_bytes(
        &self,
        name: &ClassName,
        transformed_name: &ClassName,
    ) -> Result<Option<Vec<u8>>, PipelineError> {
        let sources = self.sources.read().clone();
        for candidate in [name, transformed_name] {
            for source in &sources {
                if let Some(bytes) = source.find_class_bytes(candidate)? {
                    return Ok(Some(bytes));
                }
            }
            if name == transformed_name {
                break;
            }
        }
        Ok(None)
    }

    fn apply_transformers(
        &self,
        name: &ClassName,
        transformed_name: &ClassName,
        bytes: Vec<u8>,
        guard: &ReEntranceGuard,
    ) -> Result<Option<Vec<u8>>, PipelineError> {
        if self
            .exclusions
            .is_class_excluded(name.dotted(), Some(transformed_name.dotted()))
        {
            return Ok(Some(bytes));
        }

        let scope = guard.push();
        if scope.check() {
            return Ok(Some(bytes));
        }

        let pass = TransformPass {
            service: self,
            guard,
        };
        let mut current = bytes;
        for transformer in self.delegated_transformers().iter() {
            guard.clear();
            let ctx = TransformContext::with_pass(name, transformed_name, Some(&pass));
            let result =
                chain::run_transformer(self.codec.as_ref(), transformer.as_ref(), &current, &ctx);
            if guard.is_set() {
                self.demote(transformer.name());
                guard.clear();
            }
            match result? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }
}

impl std::fmt::Debug for TransformerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformerService")
            .field("config", &self.config)
            .field("transformers", &self.registry)
            .field("exclusions", &self.exclusions)
            .finish()
    }
}

/// One guarded pass through a service's transform path
pub(crate) struct TransformPass<'a> {
    service: &'a TransformerService,
    guard: &'a ReEntranceGuard,
}

impl TransformPass<'_> {
    /// Re-enter the service with this pass's guard
    pub(crate) fn class_bytes(&self, name: &str) -> Result<Vec<u8>, PipelineError> {
        self.service.class_bytes_guarded(name, true, self.guard)
    }
}
