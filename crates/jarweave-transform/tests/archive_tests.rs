//! Integration tests for archive rewriting

mod common;

use common::*;
use jarweave_classfile::ClassNode;
use jarweave_transform::{
    rewrite_archive, ArchiveRewriter, ArchiveSource, ClassSource, PipelineConfig, PipelineError,
    TransformChain, Transformer, TransformerService,
};
use jarweave_classfile::{access, FieldNode};
use std::io::{Cursor, Write};
use std::sync::Arc;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

fn resources() -> Vec<(&'static str, Vec<u8>)> {
    vec![
        ("META-INF/", Vec::new()),
        ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\r\n\r\n".to_vec()),
        ("assets/lang/en_us.json", br#"{"greeting": "hello"}"#.to_vec()),
        ("module-info.class", vec![0x00, 0x01, 0x02]),
        ("com/example/package-info.class", vec![0x03, 0x04]),
    ]
}

#[test]
fn test_non_class_archive_round_trips() {
    let input = build_archive(&resources());
    let chain = TransformChain::empty();

    let (output, report) = ArchiveRewriter::new(&chain).rewrite_bytes(&input).unwrap();

    assert_eq!(read_archive(&output), read_archive(&input));
    assert_eq!(report.copied, resources().len());
    assert!(report.transformed.is_empty());
    assert!(report.dropped.is_empty());
}

#[test]
fn test_descriptors_bypass_the_chain() {
    let input = build_archive(&resources());
    let counter = Arc::new(Counter::default());
    let chain = TransformChain::single(counter.clone());

    let (output, _) = ArchiveRewriter::new(&chain).rewrite_bytes(&input).unwrap();

    // Descriptor payloads are not valid classes; a decode attempt would have failed
    assert_eq!(counter.calls(), 0);
    assert_eq!(read_archive(&output), read_archive(&input));
}

#[test]
fn test_class_entries_are_transformed_in_order() {
    let input = build_archive(&[
        ("com/example/A.class", class_bytes("com.example.A")),
        ("readme.txt", b"docs".to_vec()),
        ("com/example/B.class", class_bytes("com.example.B")),
    ]);
    let chain = TransformChain::single(Arc::new(Marker::new("a.Mark", "marked")));

    let (output, report) = ArchiveRewriter::new(&chain).rewrite_bytes(&input).unwrap();

    assert_eq!(
        entry_names(&output),
        vec!["com/example/A.class", "readme.txt", "com/example/B.class"]
    );
    assert_eq!(report.transformed, vec!["com/example/A.class", "com/example/B.class"]);
    assert_eq!(report.copied, 1);
    for (name, bytes) in read_archive(&output) {
        if name.ends_with(".class") {
            assert!(ClassNode::decode(&bytes).unwrap().field("marked").is_some());
        }
    }
}

#[test]
fn test_vetoed_class_is_absent() {
    let input = build_archive(&[
        ("com/example/Keep.class", class_bytes("com.example.Keep")),
        ("com/example/Doomed.class", class_bytes("com.example.Doomed")),
        ("com/example/Tail.class", class_bytes("com.example.Tail")),
    ]);
    let counter = Arc::new(Counter::default());
    let transformers: Vec<Arc<dyn Transformer>> =
        vec![Arc::new(VetoNamed(&["Doomed"])), counter.clone()];
    let chain = TransformChain::new(transformers);

    let (output, report) = ArchiveRewriter::new(&chain).rewrite_bytes(&input).unwrap();

    assert_eq!(
        entry_names(&output),
        vec!["com/example/Keep.class", "com/example/Tail.class"]
    );
    assert_eq!(report.dropped, vec!["com/example/Doomed.class"]);
    assert_eq!(counter.calls(), 2);
    assert!(!counter.saw("Doomed"));
}

#[test]
fn test_undecodable_class_is_copied() {
    let garbage = vec![0xBA, 0xAD, 0xF0, 0x0D];
    let input = build_archive(&[
        ("com/example/Broken.class", garbage.clone()),
        ("com/example/Fine.class", class_bytes("com.example.Fine")),
    ]);
    let chain = TransformChain::single(Arc::new(Marker::new("a.Mark", "marked")));

    let (output, report) = ArchiveRewriter::new(&chain).rewrite_bytes(&input).unwrap();

    let entries = read_archive(&output);
    assert_eq!(entries[0], ("com/example/Broken.class".to_string(), garbage));
    assert_eq!(report.undecodable, vec!["com/example/Broken.class"]);
    assert_eq!(report.transformed, vec!["com/example/Fine.class"]);
}

#[test]
fn test_structurally_invalid_class_is_copied() {
    let mut broken = ClassNode::new("com.example.Twice");
    broken.fields.push(FieldNode::new(access::PRIVATE, "value", "I"));
    broken.fields.push(FieldNode::new(access::PRIVATE, "value", "I"));
    let broken = broken.encode().unwrap();
    let input = build_archive(&[
        ("com/example/Twice.class", broken.clone()),
        ("com/example/Fine.class", class_bytes("com.example.Fine")),
    ]);
    let counter = Arc::new(Counter::default());
    let chain = TransformChain::single(counter.clone());

    let (output, report) = ArchiveRewriter::new(&chain).rewrite_bytes(&input).unwrap();

    assert_eq!(read_archive(&output)[0], ("com/example/Twice.class".to_string(), broken));
    assert_eq!(report.undecodable, vec!["com/example/Twice.class"]);
    assert_eq!(report.transformed, vec!["com/example/Fine.class"]);
    assert!(!counter.saw("Twice"));
}

#[test]
fn test_rewritten_entries_keep_metadata() {
    let modified = DateTime::from_date_and_time(2020, 5, 6, 7, 8, 10).unwrap();
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(modified)
        .unix_permissions(0o600);
    writer.start_file("com/example/A.class", options).unwrap();
    writer.write_all(&class_bytes("com.example.A")).unwrap();
    let input = writer.finish().unwrap().into_inner();

    let chain = TransformChain::single(Arc::new(Marker::new("a.Mark", "marked")));
    let (output, report) = ArchiveRewriter::new(&chain).rewrite_bytes(&input).unwrap();
    assert_eq!(report.transformed, vec!["com/example/A.class"]);

    let mut archive = ZipArchive::new(Cursor::new(output)).unwrap();
    let entry = archive.by_index(0).unwrap();
    assert_eq!(entry.compression(), CompressionMethod::Deflated);
    assert_eq!(entry.unix_mode().map(|mode| mode & 0o777), Some(0o600));
    let time = entry.last_modified().unwrap();
    assert_eq!(
        (time.year(), time.month(), time.day(), time.hour(), time.minute(), time.second()),
        (2020, 5, 6, 7, 8, 10)
    );
}

#[test]
fn test_rewrite_leaves_no_staging_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mod.jar");
    std::fs::write(
        &path,
        build_archive(&[("com/example/A.class", class_bytes("com.example.A"))]),
    )
    .unwrap();

    let chain = TransformChain::single(Arc::new(Marker::new("a.Mark", "marked")));
    rewrite_archive(&path, &chain).unwrap();

    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("mod.jar")]);
    let entries = read_archive(&std::fs::read(&path).unwrap());
    assert!(ClassNode::decode(&entries[0].1).unwrap().field("marked").is_some());
}

#[test]
fn test_rewrite_file_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mod.jar");
    std::fs::write(
        &path,
        build_archive(&[
            ("com/example/A.class", class_bytes("com.example.A")),
            ("pack.mcmeta", b"{}".to_vec()),
        ]),
    )
    .unwrap();

    let chain = TransformChain::single(Arc::new(Marker::new("a.Mark", "marked")));
    let report = rewrite_archive(&path, &chain).unwrap();
    assert_eq!(report.transformed.len(), 1);

    let source = ArchiveSource::open(&path).unwrap();
    let bytes = source
        .find_class_bytes(&"com.example.A".into())
        .unwrap()
        .unwrap();
    assert!(ClassNode::decode(&bytes).unwrap().field("marked").is_some());
}

#[test]
fn test_transform_failure_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mod.jar");
    let original = build_archive(&[
        ("com/example/Good.class", class_bytes("com.example.Good")),
        ("com/example/Bad.class", class_bytes("com.example.Bad")),
    ]);
    std::fs::write(&path, &original).unwrap();

    let transformers: Vec<Arc<dyn Transformer>> = vec![
        Arc::new(Marker::new("a.Mark", "marked")),
        Arc::new(FailNamed(&["Bad"])),
    ];
    let chain = TransformChain::new(transformers);

    let err = rewrite_archive(&path, &chain).unwrap_err();
    assert!(matches!(err, PipelineError::Transform { ref class, .. } if class == "com.example.Bad"));
    assert_eq!(std::fs::read(&path).unwrap(), original);
}

#[test]
fn test_missing_archive_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = rewrite_archive(&dir.path().join("absent.jar"), &TransformChain::empty()).unwrap_err();
    assert!(matches!(err, PipelineError::Io(_)));
}

#[test]
fn test_service_rewrites_with_delegated_transformers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mod.jar");
    std::fs::write(
        &path,
        build_archive(&[
            ("com/example/Plain.class", class_bytes("com.example.Plain")),
            ("com/example/gen/Stub.class", class_bytes("com.example.gen.Stub")),
        ]),
    )
    .unwrap();

    let config = PipelineConfig {
        transform_exclusions: vec!["com.example.gen.".to_string()],
        ..PipelineConfig::default()
    };
    let service = TransformerService::new(config);
    service.register_transformer(Arc::new(Marker::new("a.Mark", "marked")));

    service.rewrite_archive(&path).unwrap();

    for (name, bytes) in read_archive(&std::fs::read(&path).unwrap()) {
        let marked = ClassNode::decode(&bytes).unwrap().field("marked").is_some();
        assert_eq!(marked, name == "com/example/Plain.class", "{name}");
    }
}
