//! Jarweave class transform pipeline
//!
//! This crate runs ordered transformers over compiled classes:
//! - Transform chains that re-decode between steps ([`TransformChain`])
//! - Load and transform exclusion sets ([`ExclusionRegistry`])
//! - The cached, lazily rebuilt delegation list ([`DelegationList`])
//! - Re-entrance detection and transformer demotion ([`ReEntranceGuard`])
//! - Entry-by-entry archive rewriting ([`ArchiveRewriter`])
//! - The loader-facing service tying them together ([`TransformerService`])

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod archive;
pub mod chain;
pub mod config;
pub mod delegation;
pub mod error;
pub mod exclusion;
pub mod guard;
pub mod service;
pub mod source;
pub mod transformer;

pub use archive::{rewrite_archive, ArchiveRewriter, RewriteReport};
pub use chain::TransformChain;
pub use config::{ConfigError, PipelineConfig, BOOTSTRAP_LOAD_EXCLUSIONS};
pub use delegation::{build_delegation_list, DelegationList, DelegationState};
pub use error::{PipelineError, TransformError};
pub use exclusion::{ClassTracker, ExclusionKind, ExclusionRegistry};
pub use guard::{GuardScope, ReEntranceGuard};
pub use service::TransformerService;
pub use source::{ArchiveSource, ClassSource, DirectorySource, MemorySource};
pub use transformer::{NameRemapper, TransformContext, Transformer, TransformerRegistry, Verdict};
