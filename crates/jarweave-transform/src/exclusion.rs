//! Class loader and transformer exclusion bookkeeping
//!
//! Two independent prefix sets decide which classes the loader must leave
//! alone and which classes the transform chain must not touch. Prefixes and
//! names are normalized to dotted form before comparison, so `org/foo/` and
//! `org.foo.` are the same exclusion.
//!
//! The transform set doubles as the transformer exclusion list: a
//! transformer whose name starts with one of its prefixes is left out of the
//! delegation list. Every addition to the transform set bumps a generation
//! counter so cached delegation lists know they are stale.

use jarweave_classfile::name::normalize;
use jarweave_classfile::ClassName;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Which exclusion set a prefix belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusionKind {
    /// The class loader must not intercept or cache the class
    Load,
    /// The transform chain must not process the class
    Transform,
}

impl ExclusionKind {
    /// Diagnostic label used by [`ExclusionRegistry::class_restrictions`]
    pub fn restriction_label(self) -> &'static str {
        match self {
            ExclusionKind::Load => "PACKAGE_CLASSLOADER_EXCLUSION",
            ExclusionKind::Transform => "PACKAGE_TRANSFORMER_EXCLUSION",
        }
    }
}

impl fmt::Display for ExclusionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionKind::Load => f.write_str("load"),
            ExclusionKind::Transform => f.write_str("transform"),
        }
    }
}

/// Class bookkeeping a transforming class loader exposes to the pipeline
pub trait ClassTracker: Send + Sync {
    /// Whether the loader has already defined the class
    fn is_class_loaded(&self, name: &str) -> bool;

    /// Prevent the loader from ever defining the class
    fn register_invalid_class(&self, name: &str);

    /// Comma-joined list of restrictions that apply to the class
    fn class_restrictions(&self, name: &str) -> String;
}

/// Prefix sets plus loaded/invalid class bookkeeping
#[derive(Debug, Default)]
pub struct ExclusionRegistry {
    load: RwLock<Vec<String>>,
    transform: RwLock<Vec<String>>,
    transform_generation: AtomicU64,
    loaded: RwLock<HashSet<ClassName>>,
    invalid: RwLock<HashSet<ClassName>>,
}

impl ExclusionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, kind: ExclusionKind) -> &RwLock<Vec<String>> {
        match kind {
            ExclusionKind::Load => &self.load,
            ExclusionKind::Transform => &self.transform,
        }
    }

    /// Register an exclusion prefix
    ///
    /// Returns `false` if the prefix was already registered.
    pub fn exclude(&self, kind: ExclusionKind, prefix: &str) -> bool {
        let prefix = normalize(prefix);
        let mut set = self.set(kind).write();
        if set.contains(&prefix) {
            return false;
        }
        set.push(prefix);
        if kind == ExclusionKind::Transform {
            self.transform_generation.fetch_add(1, Ordering::AcqRel);
        }
        true
    }

    /// Exclude a prefix from class loader interception
    pub fn exclude_from_load(&self, prefix: &str) -> bool {
        self.exclude(ExclusionKind::Load, prefix)
    }

    /// Exclude a prefix from transformation
    pub fn exclude_from_transform(&self, prefix: &str) -> bool {
        self.exclude(ExclusionKind::Transform, prefix)
    }

    /// Registered prefixes of one kind, in registration order
    pub fn prefixes(&self, kind: ExclusionKind) -> Vec<String> {
        self.set(kind).read().clone()
    }

    /// Whether `name` or `transformed_name` starts with a prefix of `kind`
    pub fn is_excluded(
        &self,
        kind: ExclusionKind,
        name: &str,
        transformed_name: Option<&str>,
    ) -> bool {
        let name = normalize(name);
        let transformed_name = transformed_name.map(normalize);
        self.set(kind).read().iter().any(|prefix| {
            name.starts_with(prefix.as_str())
                || transformed_name
                    .as_deref()
                    .is_some_and(|transformed| transformed.starts_with(prefix.as_str()))
        })
    }

    /// Whether either name is excluded from class loader interception
    pub fn is_load_excluded(&self, name: &str, transformed_name: Option<&str>) -> bool {
        self.is_excluded(ExclusionKind::Load, name, transformed_name)
    }

    /// Whether either name is excluded from transformation
    pub fn is_transform_excluded(&self, name: &str, transformed_name: Option<&str>) -> bool {
        self.is_excluded(ExclusionKind::Transform, name, transformed_name)
    }

    /// Whether either name is in either exclusion set
    pub fn is_class_excluded(&self, name: &str, transformed_name: Option<&str>) -> bool {
        self.is_load_excluded(name, transformed_name)
            || self.is_transform_excluded(name, transformed_name)
    }

    /// Counter bumped on every new transform exclusion
    pub fn transform_generation(&self) -> u64 {
        self.transform_generation.load(Ordering::Acquire)
    }

    /// Record that the loader defined a class
    pub fn mark_class_loaded(&self, name: &str) {
        self.loaded.write().insert(ClassName::new(name));
    }

    /// Whether the class was registered as invalid
    pub fn is_class_invalid(&self, name: &str) -> bool {
        self.invalid.read().contains(&ClassName::new(name))
    }
}

impl ClassTracker for ExclusionRegistry {
    fn is_class_loaded(&self, name: &str) -> bool {
        self.loaded.read().contains(&ClassName::new(name))
    }

    fn register_invalid_class(&self, name: &str) {
        self.invalid.write().insert(ClassName::new(name));
    }

    fn class_restrictions(&self, name: &str) -> String {
        [ExclusionKind::Load, ExclusionKind::Transform]
            .into_iter()
            .filter(|kind| self.is_excluded(*kind, name, None))
            .map(ExclusionKind::restriction_label)
            .collect::<Vec<_>>()
            .join(",")
    }
}
