//! Codec seam between raw class bytes and [`ClassNode`]

use crate::node::{ClassFileError, ClassNode, WriterOptions};

/// Decodes raw class bytes into an editable form and re-encodes it
///
/// The rewriting pipeline only talks to this trait, so a different class
/// file implementation can be plugged in without touching it.
pub trait ClassCodec: Send + Sync {
    /// Decode raw class bytes
    fn decode(&self, bytes: &[u8]) -> Result<ClassNode, ClassFileError>;

    /// Encode an edited class
    fn encode(&self, class: &ClassNode) -> Result<Vec<u8>, ClassFileError>;
}

/// The default codec backed by [`ClassNode::decode`] and [`ClassNode::encode_with`]
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralCodec {
    options: WriterOptions,
}

impl StructuralCodec {
    /// Create a codec with the given writer options
    pub fn new(options: WriterOptions) -> Self {
        Self { options }
    }

    /// Writer options used on encode
    pub fn options(&self) -> WriterOptions {
        self.options
    }
}

impl ClassCodec for StructuralCodec {
    fn decode(&self, bytes: &[u8]) -> Result<ClassNode, ClassFileError> {
        ClassNode::decode(bytes)
    }

    fn encode(&self, class: &ClassNode) -> Result<Vec<u8>, ClassFileError> {
        class.encode_with(self.options)
    }
}
