//! Class file representation for jarweave
//!
//! This crate provides the editable structural form of a compiled class
//! ([`ClassNode`]), the binary reader/writer behind it, class-name
//! normalization and structural verification. The rewriting pipeline reaches
//! it through the [`ClassCodec`] trait.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod codec;
pub mod encoder;
pub mod name;
pub mod node;
pub mod verify;

pub use codec::{ClassCodec, StructuralCodec};
pub use encoder::{ByteReader, ByteWriter, DecodeError, EncodeError};
pub use name::{ClassName, CLASS_SUFFIX};
pub use node::{access, Attribute, ClassFileError, ClassNode, FieldNode, MethodNode, WriterOptions};
pub use verify::{verify_class, VerifyError};
