//! Transformer contract and registry
//!
//! A [`Transformer`] edits one decoded class at a time. Beyond the edit
//! itself a transformer exposes two optional capabilities: it may opt out of
//! delegation ([`Transformer::is_delegation_excluded`]) and it may offer a
//! [`NameRemapper`] that translates between raw and transformed class names.

use crate::error::{PipelineError, TransformError};
use crate::service::TransformPass;
use jarweave_classfile::{ClassName, ClassNode};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Outcome of a single transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep the class and hand it to the next transformer
    Keep,
    /// Omit the class from output; later transformers are not run
    Drop,
}

/// Translates class names between their raw and transformed identities
pub trait NameRemapper: Send + Sync {
    /// Map a transformed (runtime) name, in dotted form, back to the raw
    /// name stored on disk
    fn unmap_class_name(&self, name: &str) -> String;
}

/// A unit of class-level rewriting
pub trait Transformer: Send + Sync {
    /// Stable identity, matched against transform exclusion prefixes
    fn name(&self) -> &str;

    /// Whether this transformer must never run against delegated class data
    fn is_delegation_excluded(&self) -> bool {
        false
    }

    /// Edit the class in place
    fn transform(
        &self,
        class: &mut ClassNode,
        ctx: &TransformContext<'_>,
    ) -> Result<Verdict, TransformError>;

    /// Name remapping capability, if this transformer provides one
    fn name_remapper(&self) -> Option<&dyn NameRemapper> {
        None
    }
}

impl fmt::Debug for dyn Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("name", &self.name())
            .field("delegation_excluded", &self.is_delegation_excluded())
            .finish()
    }
}

/// What a transformer knows about the class it is editing
pub struct TransformContext<'a> {
    name: &'a ClassName,
    transformed_name: &'a ClassName,
    pass: Option<&'a TransformPass<'a>>,
}

impl<'a> TransformContext<'a> {
    /// Context for a class whose raw and transformed names coincide
    pub fn new(name: &'a ClassName) -> Self {
        Self {
            name,
            transformed_name: name,
            pass: None,
        }
    }

    pub(crate) fn with_pass(
        name: &'a ClassName,
        transformed_name: &'a ClassName,
        pass: Option<&'a TransformPass<'a>>,
    ) -> Self {
        Self {
            name,
            transformed_name,
            pass,
        }
    }

    /// Raw (on-disk) name of the class
    pub fn class_name(&self) -> &ClassName {
        self.name
    }

    /// Runtime name of the class after name remapping
    pub fn transformed_name(&self) -> &ClassName {
        self.transformed_name
    }

    /// Fetch another class's transformed bytes from inside a transform
    ///
    /// This re-enters the transform path of the owning service. A
    /// transformer that does so is detected and demoted once its current
    /// call returns. Outside a service pass there is nothing to load from
    /// and the lookup fails with [`PipelineError::NotFound`].
    pub fn load_class(&self, name: &str) -> Result<Vec<u8>, PipelineError> {
        match self.pass {
            Some(pass) => pass.class_bytes(name),
            None => Err(PipelineError::NotFound(ClassName::new(name).to_string())),
        }
    }
}

/// Every registered transformer, in registration order
#[derive(Default)]
pub struct TransformerRegistry {
    transformers: RwLock<Vec<Arc<dyn Transformer>>>,
}

impl TransformerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transformer
    pub fn register(&self, transformer: Arc<dyn Transformer>) {
        self.transformers.write().push(transformer);
    }

    /// Copy of the registered transformers
    pub fn snapshot(&self) -> Vec<Arc<dyn Transformer>> {
        self.transformers.read().clone()
    }

    /// Number of registered transformers
    pub fn len(&self) -> usize {
        self.transformers.read().len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.transformers.read().is_empty()
    }
}

impl fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.transformers.read().iter()).finish()
    }
}
