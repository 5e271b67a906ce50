//! Integration tests for multi-file intake batches.

use std::path::Path;

use guardian_neuro_core::ImageMime;
use guardian_neuro_intake::{FsImageSource, IntakeError, MemoryImageSource, decode_batch};

#[test]
fn batch_decode_tests_keep_selection_order_and_collect_rejections() {
    let source = MemoryImageSource::new()
        .with_file("slice-1.jpg", vec![0xFF, 0xD8, 0x01])
        .with_file("notes.txt", b"not an image".to_vec())
        .with_file("slice-2.png", vec![0x89, 0x50, 0x02])
        .with_file("empty.png", Vec::new());

    let batch = decode_batch(
        &source,
        &["slice-1.jpg", "notes.txt", "slice-2.png", "empty.png", "missing.jpg"],
    );

    let names: Vec<&str> = batch.accepted.iter().map(|image| image.file_name.as_str()).collect();
    assert_eq!(names, vec!["slice-1.jpg", "slice-2.png"]);
    assert_eq!(batch.accepted[0].mime_type, ImageMime::Jpeg);
    assert_eq!(batch.accepted[1].mime_type, ImageMime::Png);

    assert_eq!(batch.rejected.len(), 3);
    assert!(matches!(batch.rejected[0].error, IntakeError::UnsupportedType { .. }));
    assert!(matches!(batch.rejected[1].error, IntakeError::EmptyFile(_)));
    assert!(matches!(batch.rejected[2].error, IntakeError::Read { .. }));
}

#[test]
fn batch_decode_tests_read_real_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("axial.png");
    std::fs::write(&path, [0x89, b'P', b'N', b'G']).expect("write fixture");

    let batch = decode_batch(&FsImageSource, &[path.as_path()]);
    assert!(batch.rejected.is_empty());
    assert_eq!(batch.accepted[0].file_name, "axial.png");
    assert_eq!(batch.accepted[0].base64_payload, "iVBORw==");
    assert!(batch.accepted[0].preview_uri.starts_with("data:image/png;base64,"));
}

#[test]
fn batch_decode_tests_reject_unsupported_type_before_reading() {
    let batch = decode_batch(&MemoryImageSource::new(), &[Path::new("scan.bmp")]);
    assert!(batch.is_empty());
    assert!(matches!(batch.rejected[0].error, IntakeError::UnsupportedType { .. }));
}
