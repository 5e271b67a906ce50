#![warn(missing_docs)]
//! # guardian-neuro-intake
//!
//! ## Purpose
//! Accepts scan image files into the case, converting them to base64 scan
//! images.
//!
//! ## Responsibilities
//! - Define a source-agnostic byte reader trait.
//! - Read real files from disk, or in-memory fixtures for tests.
//! - Accept only JPEG and PNG and report everything else as rejected.
//! - Decode a whole multi-file selection before anything is committed.
//!
//! ## Data flow
//! Shell passes file paths -> [`decode_batch`] reads each through an
//! [`ImageSource`] -> [`IntakeBatch`] with accepted [`ScanImage`] values and
//! rejections -> the view commits the accepted list in one step.
//!
//! ## Ownership and lifetimes
//! Scan images own their encoded payloads; source buffers are dropped as soon
//! as they are encoded.
//!
//! ## Error model
//! Per-file failures never abort the batch. They are collected as
//! [`RejectedFile`] entries carrying an [`IntakeError`].
//!
//! ## Security and privacy notes
//! Image bytes are never written anywhere by this crate and are not logged.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use guardian_neuro_core::{ImageMime, ScanImage};
use thiserror::Error;

/// Byte source for candidate image files.
pub trait ImageSource: Send + Sync {
    /// Reads the full contents of `path`.
    ///
    /// # Errors
    /// Returns [`IntakeError::Read`] when the bytes cannot be loaded.
    fn read(&self, path: &Path) -> Result<Vec<u8>, IntakeError>;
}

/// Filesystem-backed image source.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsImageSource;

impl ImageSource for FsImageSource {
    fn read(&self, path: &Path) -> Result<Vec<u8>, IntakeError> {
        std::fs::read(path).map_err(|error| IntakeError::Read {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })
    }
}

/// Deterministic in-memory source for tests.
#[derive(Debug, Default)]
pub struct MemoryImageSource {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryImageSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file and returns `self` for chaining.
    pub fn with_file(self, path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), bytes);
        }
        self
    }
}

impl ImageSource for MemoryImageSource {
    fn read(&self, path: &Path) -> Result<Vec<u8>, IntakeError> {
        let files = self.files.lock().map_err(|_| IntakeError::Read {
            path: path.to_path_buf(),
            reason: "memory source lock poisoned".to_string(),
        })?;
        files.get(path).cloned().ok_or_else(|| IntakeError::Read {
            path: path.to_path_buf(),
            reason: "no such file".to_string(),
        })
    }
}

/// One file that was not accepted.
#[derive(Debug)]
pub struct RejectedFile {
    /// Path as supplied by the caller.
    pub path: PathBuf,
    /// Rejection cause.
    pub error: IntakeError,
}

/// Outcome of decoding one multi-file selection.
#[derive(Debug, Default)]
pub struct IntakeBatch {
    /// Accepted images in selection order.
    pub accepted: Vec<ScanImage>,
    /// Files that were skipped.
    pub rejected: Vec<RejectedFile>,
}

impl IntakeBatch {
    /// Returns `true` when nothing was accepted.
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// Resolves the accepted image type for `path` from its extension.
///
/// # Errors
/// Returns [`IntakeError::UnsupportedType`] for anything other than JPEG or
/// PNG, including unknown extensions.
pub fn accepted_mime_for(path: &Path) -> Result<ImageMime, IntakeError> {
    let guessed = mime_guess::from_path(path).first_raw();
    guessed
        .and_then(ImageMime::from_mime_str)
        .ok_or_else(|| IntakeError::UnsupportedType {
            path: path.to_path_buf(),
            detected: guessed.unwrap_or("unknown").to_string(),
        })
}

/// Decodes one file into a scan image.
///
/// # Errors
/// Returns [`IntakeError`] when the type is not accepted, the file cannot be
/// read, or it is empty.
pub fn decode_file(source: &dyn ImageSource, path: &Path) -> Result<ScanImage, IntakeError> {
    let mime = accepted_mime_for(path)?;
    let bytes = source.read(path)?;
    if bytes.is_empty() {
        return Err(IntakeError::EmptyFile(path.to_path_buf()));
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(ScanImage::from_bytes(file_name, mime, &bytes))
}

/// Decodes a whole selection before returning.
///
/// Accepted images keep the order of `paths`. Callers commit the result in a
/// single step so no partially decoded state is ever visible.
pub fn decode_batch<P: AsRef<Path>>(source: &dyn ImageSource, paths: &[P]) -> IntakeBatch {
    let mut batch = IntakeBatch::default();
    for path in paths {
        let path = path.as_ref();
        match decode_file(source, path) {
            Ok(image) => batch.accepted.push(image),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "image rejected");
                batch.rejected.push(RejectedFile {
                    path: path.to_path_buf(),
                    error,
                });
            }
        }
    }

    tracing::debug!(
        accepted = batch.accepted.len(),
        rejected = batch.rejected.len(),
        "intake batch decoded"
    );
    batch
}

/// Intake layer error type.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// File type is not JPEG or PNG.
    #[error("unsupported file type for {path}: {detected} (only image/jpeg and image/png)")]
    UnsupportedType {
        /// Offending path.
        path: PathBuf,
        /// MIME guessed from the extension.
        detected: String,
    },
    /// File bytes could not be read.
    #[error("failed to read {path}: {reason}")]
    Read {
        /// Offending path.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },
    /// File contained no bytes.
    #[error("file is empty: {0}")]
    EmptyFile(PathBuf),
}
