//! Ordered transform chains
//!
//! Every transformer in a chain sees a freshly decoded view of its
//! predecessor's encoded output, so derived data the writer recomputes
//! (method local-slot hints) is visible to the next step.

use crate::error::{PipelineError, TransformError};
use crate::exclusion::ExclusionRegistry;
use crate::transformer::{TransformContext, Transformer, Verdict};
use jarweave_classfile::{verify_class, ClassCodec, ClassFileError, ClassName, StructuralCodec};
use std::sync::Arc;

/// An ordered list of transformers applied to one class at a time
#[derive(Clone)]
pub struct TransformChain {
    transformers: Vec<Arc<dyn Transformer>>,
    codec: Arc<dyn ClassCodec>,
    exclusions: Option<Arc<ExclusionRegistry>>,
}

impl TransformChain {
    /// Chain running `transformers` in order with the default codec
    pub fn new(transformers: Vec<Arc<dyn Transformer>>) -> Self {
        Self {
            transformers,
            codec: Arc::new(StructuralCodec::default()),
            exclusions: None,
        }
    }

    /// Chain with no transformers; classes pass through untouched
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Chain of one transformer
    pub fn single(transformer: Arc<dyn Transformer>) -> Self {
        Self::new(vec![transformer])
    }

    /// Use a different codec
    pub fn with_codec(mut self, codec: Arc<dyn ClassCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Skip classes excluded from transformation
    pub fn with_exclusions(mut self, exclusions: Arc<ExclusionRegistry>) -> Self {
        self.exclusions = Some(exclusions);
        self
    }

    /// Transformers in application order
    pub fn transformers(&self) -> &[Arc<dyn Transformer>] {
        &self.transformers
    }

    /// Whether the chain has no transformers
    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// Run every transformer over `bytes`
    ///
    /// Returns `Ok(None)` when a transformer vetoes the class. The first
    /// veto ends the chain and discards all edits made so far.
    pub fn apply(&self, bytes: &[u8], class_name: &str) -> Result<Option<Vec<u8>>, PipelineError> {
        let name = ClassName::new(class_name);
        self.apply_in(bytes, &TransformContext::new(&name))
    }

    fn apply_in(
        &self,
        bytes: &[u8],
        ctx: &TransformContext<'_>,
    ) -> Result<Option<Vec<u8>>, PipelineError> {
        if self.transformers.is_empty() {
            return Ok(Some(bytes.to_vec()));
        }
        if let Some(exclusions) = &self.exclusions {
            let name = ctx.class_name().dotted();
            if exclusions.is_transform_excluded(name, Some(ctx.transformed_name().dotted())) {
                return Ok(Some(bytes.to_vec()));
            }
        }

        let mut current = bytes.to_vec();
        for transformer in &self.transformers {
            match run_transformer(self.codec.as_ref(), transformer.as_ref(), &current, ctx)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }
}

impl Default for TransformChain {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for TransformChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformChain")
            .field("transformers", &self.transformers)
            .field("exclusions", &self.exclusions.is_some())
            .finish()
    }
}

/// Decode, transform, verify and re-encode one class with one transformer
pub(crate) fn run_transformer(
    codec: &dyn ClassCodec,
    transformer: &dyn Transformer,
    bytes: &[u8],
    ctx: &TransformContext<'_>,
) -> Result<Option<Vec<u8>>, PipelineError> {
    let class_name = ctx.class_name().to_string();
    let undecodable = |source: ClassFileError| PipelineError::Decode {
        class: class_name.clone(),
        source,
    };
    let mut class = codec.decode(bytes).map_err(undecodable)?;
    // Invalid input is a decode failure of the class
    verify_class(&class).map_err(|e| undecodable(e.into()))?;

    let blame = |source: TransformError| PipelineError::Transform {
        transformer: transformer.name().to_string(),
        class: class_name.clone(),
        source,
    };

    if transformer.transform(&mut class, ctx).map_err(blame)? == Verdict::Drop {
        tracing::debug!(
            "Transformer '{}' dropped class '{}'",
            transformer.name(),
            class_name
        );
        return Ok(None);
    }

    verify_class(&class).map_err(|e| blame(e.into()))?;
    let encoded = codec.encode(&class).map_err(|e| blame(e.into()))?;
    Ok(Some(encoded))
}
