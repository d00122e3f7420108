//! Prompt input handling
//!
//! Loads image attachments for the `chat` command and infers their media type
//! from the file extension.

use crate::llm::ImageData;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("File '{path}' not found")]
    NotFound { path: PathBuf },

    #[error("File '{path}' has unsupported image type (expected png, jpeg, gif or webp)")]
    UnsupportedImage { path: PathBuf },

    #[error("IO error reading '{path}': {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub fn media_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Read an image file into an attachment
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ImageData, InputError> {
    let path = path.as_ref().to_path_buf();

    let media_type = media_type_for(&path)
        .ok_or_else(|| InputError::UnsupportedImage { path: path.clone() })?;

    match fs::read(&path) {
        Ok(data) => {
            debug!("Loaded {} bytes of {} from {:?}", data.len(), media_type, path);
            Ok(ImageData::new(media_type, data))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(InputError::NotFound { path }),
        Err(e) => Err(InputError::IoError { path, source: e }),
    }
}
