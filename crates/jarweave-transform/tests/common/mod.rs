//! Shared transformers and archive helpers for integration tests

#![allow(dead_code)]

use jarweave_classfile::{access, ClassNode, FieldNode, MethodNode};
use jarweave_transform::{TransformContext, TransformError, Transformer, Verdict};
use std::io::{Cursor, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Adds the private boolean field `field` once
pub struct Marker {
    pub name: &'static str,
    pub field: &'static str,
}

impl Marker {
    pub fn new(name: &'static str, field: &'static str) -> Self {
        Self { name, field }
    }
}

impl Transformer for Marker {
    fn name(&self) -> &str {
        self.name
    }

    fn transform(
        &self,
        class: &mut ClassNode,
        _ctx: &TransformContext<'_>,
    ) -> Result<Verdict, TransformError> {
        if class.field(self.field).is_none() {
            class.fields.push(FieldNode::new(access::PRIVATE, self.field, "Z"));
        }
        Ok(Verdict::Keep)
    }
}

/// Marker that can opt out of delegation
pub struct Flagged {
    pub name: &'static str,
    pub delegation_excluded: bool,
}

impl Transformer for Flagged {
    fn name(&self) -> &str {
        self.name
    }

    fn is_delegation_excluded(&self) -> bool {
        self.delegation_excluded
    }

    fn transform(
        &self,
        _class: &mut ClassNode,
        _ctx: &TransformContext<'_>,
    ) -> Result<Verdict, TransformError> {
        Ok(Verdict::Keep)
    }
}

/// Adds a `(JJ)V` instance method with unset local hints
pub struct AddWideMethod;

impl Transformer for AddWideMethod {
    fn name(&self) -> &str {
        "test.AddWideMethod"
    }

    fn transform(
        &self,
        class: &mut ClassNode,
        _ctx: &TransformContext<'_>,
    ) -> Result<Verdict, TransformError> {
        class.methods.push(MethodNode::new(access::PUBLIC, "wide", "(JJ)V"));
        Ok(Verdict::Keep)
    }
}

/// Records the local-slot hint it finds on `wide` as a field `locals<N>`
pub struct RecordLocals;

impl Transformer for RecordLocals {
    fn name(&self) -> &str {
        "test.RecordLocals"
    }

    fn transform(
        &self,
        class: &mut ClassNode,
        _ctx: &TransformContext<'_>,
    ) -> Result<Verdict, TransformError> {
        if let Some(locals) = class.method("wide", "(JJ)V").map(|m| m.max_locals) {
            class
                .fields
                .push(FieldNode::new(access::PRIVATE, format!("locals{locals}"), "I"));
        }
        Ok(Verdict::Keep)
    }
}

/// Vetoes every class whose simple name is listed
pub struct VetoNamed(pub &'static [&'static str]);

impl Transformer for VetoNamed {
    fn name(&self) -> &str {
        "test.VetoNamed"
    }

    fn transform(
        &self,
        _class: &mut ClassNode,
        ctx: &TransformContext<'_>,
    ) -> Result<Verdict, TransformError> {
        let simple_name = ctx.class_name().simple_name();
        if self.0.iter().any(|name| *name == simple_name) {
            Ok(Verdict::Drop)
        } else {
            Ok(Verdict::Keep)
        }
    }
}

/// Counts the classes it sees, per simple name
#[derive(Default)]
pub struct Counter {
    pub calls: AtomicUsize,
    pub seen: parking_lot::Mutex<Vec<String>>,
}

impl Counter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn saw(&self, simple_name: &str) -> bool {
        self.seen.lock().iter().any(|name| name == simple_name)
    }
}

impl Transformer for Counter {
    fn name(&self) -> &str {
        "test.Counter"
    }

    fn transform(
        &self,
        _class: &mut ClassNode,
        ctx: &TransformContext<'_>,
    ) -> Result<Verdict, TransformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .push(ctx.class_name().simple_name().to_string());
        Ok(Verdict::Keep)
    }
}

/// Fails on every class whose simple name is listed
pub struct FailNamed(pub &'static [&'static str]);

impl Transformer for FailNamed {
    fn name(&self) -> &str {
        "test.FailNamed"
    }

    fn transform(
        &self,
        _class: &mut ClassNode,
        ctx: &TransformContext<'_>,
    ) -> Result<Verdict, TransformError> {
        let simple_name = ctx.class_name().simple_name();
        if self.0.iter().any(|name| *name == simple_name) {
            return Err(TransformError::failed("refusing to transform"));
        }
        Ok(Verdict::Keep)
    }
}

/// Loads `dependency` through the context while transforming `trigger`
pub struct LoadsDependency {
    pub name: &'static str,
    pub trigger: &'static str,
    pub dependency: &'static str,
    pub loads: AtomicUsize,
}

impl LoadsDependency {
    pub fn new(name: &'static str, trigger: &'static str, dependency: &'static str) -> Self {
        Self {
            name,
            trigger,
            dependency,
            loads: AtomicUsize::new(0),
        }
    }
}

impl Transformer for LoadsDependency {
    fn name(&self) -> &str {
        self.name
    }

    fn transform(
        &self,
        class: &mut ClassNode,
        ctx: &TransformContext<'_>,
    ) -> Result<Verdict, TransformError> {
        if ctx.class_name().dotted() == self.trigger {
            let bytes = ctx.load_class(self.dependency)?;
            ClassNode::decode(&bytes).map_err(|e| TransformError::Other(Box::new(e)))?;
            self.loads.fetch_add(1, Ordering::SeqCst);
            class
                .fields
                .push(FieldNode::new(access::PRIVATE, "sawDependency", "Z"));
        }
        Ok(Verdict::Keep)
    }
}

/// Encoded bytes of an empty class
pub fn class_bytes(name: &str) -> Vec<u8> {
    ClassNode::new(name).encode().unwrap()
}

/// Build an in-memory archive
pub fn build_archive(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(*name, SimpleFileOptions::default())
                .unwrap();
            continue;
        }
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Entry names and contents of an archive, in archive order
pub fn read_archive(data: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes).unwrap();
            (entry.name().to_string(), bytes)
        })
        .collect()
}

/// Entry names of an archive, in archive order
pub fn entry_names(data: &[u8]) -> Vec<String> {
    read_archive(data).into_iter().map(|(name, _)| name).collect()
}
