//! Archive rewriting
//!
//! Rewrites a jar-like archive entry by entry. Class entries go through a
//! [`TransformChain`]; module and package descriptors and every non-class
//! entry are copied verbatim, compressed data included. Rewritten entries
//! keep their compression method, timestamp and permissions. The output is
//! assembled in memory and atomically replaces the file once every entry
//! has been processed.

use crate::chain::TransformChain;
use crate::error::PipelineError;
use jarweave_classfile::ClassName;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// What happened to the entries of a rewritten archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Class entries written from chain output
    pub transformed: Vec<String>,
    /// Class entries vetoed and left out
    pub dropped: Vec<String>,
    /// Entries copied without going through the chain
    pub copied: usize,
    /// Class entries that failed to decode and were copied unchanged
    pub undecodable: Vec<String>,
}

/// Rewrites archives through one transform chain
#[derive(Debug)]
pub struct ArchiveRewriter<'c> {
    chain: &'c TransformChain,
}

impl<'c> ArchiveRewriter<'c> {
    /// Rewriter using `chain`
    pub fn new(chain: &'c TransformChain) -> Self {
        Self { chain }
    }

    /// Rewrite the archive at `path` in place
    ///
    /// On error the file on disk is left untouched. The new contents go to
    /// a temporary file in the same directory that is then renamed over
    /// `path`, so readers never observe a partially written archive.
    pub fn rewrite_file(&self, path: &Path) -> Result<RewriteReport, PipelineError> {
        let data = std::fs::read(path)?;
        let (output, report) = self.rewrite_bytes(&data)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(&output)?;
        staged.as_file().sync_all()?;
        staged.persist(path).map_err(|e| e.error)?;
        tracing::debug!(
            "Rewrote {}: {} transformed, {} dropped, {} copied",
            path.display(),
            report.transformed.len(),
            report.dropped.len(),
            report.copied
        );
        Ok(report)
    }

    /// Rewrite an in-memory archive
    pub fn rewrite_bytes(&self, data: &[u8]) -> Result<(Vec<u8>, RewriteReport), PipelineError> {
        let mut archive = ZipArchive::new(Cursor::new(data))?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut report = RewriteReport::default();

        for index in 0..archive.len() {
            let (name, class_name) = {
                let entry = archive.by_index_raw(index)?;
                let name = entry.name().to_string();
                let class_name = if is_descriptor(&name) || entry.is_dir() {
                    None
                } else {
                    ClassName::from_resource_path(&name)
                };
                (name, class_name)
            };

            let Some(class_name) = class_name else {
                writer.raw_copy_file(archive.by_index_raw(index)?)?;
                report.copied += 1;
                continue;
            };

            let (bytes, options) = {
                let mut entry = archive.by_index(index)?;
                let mut bytes = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut bytes)?;

                let mut options =
                    SimpleFileOptions::default().compression_method(entry.compression());
                if let Some(modified) = entry.last_modified() {
                    options = options.last_modified_time(modified);
                }
                if let Some(mode) = entry.unix_mode() {
                    options = options.unix_permissions(mode);
                }
                (bytes, options)
            };

            match self.chain.apply(&bytes, class_name.dotted()) {
                Ok(Some(output)) => {
                    writer.start_file(name.as_str(), options)?;
                    writer.write_all(&output)?;
                    report.transformed.push(name);
                }
                Ok(None) => {
                    tracing::debug!("Dropping vetoed entry {}", name);
                    report.dropped.push(name);
                }
                Err(e) if e.is_decode_failure() => {
                    tracing::warn!("Copying undecodable entry {} unchanged: {}", name, e);
                    writer.raw_copy_file(archive.by_index_raw(index)?)?;
                    report.undecodable.push(name);
                }
                Err(e) => return Err(e),
            }
        }

        let output = writer.finish()?.into_inner();
        Ok((output, report))
    }
}

/// Rewrite the archive at `path` in place through `chain`
pub fn rewrite_archive(path: &Path, chain: &TransformChain) -> Result<RewriteReport, PipelineError> {
    ArchiveRewriter::new(chain).rewrite_file(path)
}

fn is_descriptor(name: &str) -> bool {
    name.contains("module-info") || name.contains("package-info")
}
