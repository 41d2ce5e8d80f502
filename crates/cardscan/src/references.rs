//! Stored reference images, looked up by card identifier.

use std::path::{Path, PathBuf};

use image::RgbImage;

/// Source of the catalogue image for a card identifier.
///
/// A missing image is `Ok(None)`; `Err` is reserved for images that exist
/// but cannot be read.
pub trait ReferenceImages: Send + Sync {
    fn load(&self, id: &str) -> Result<Option<RgbImage>, image::ImageError>;
}

/// Reference images stored as `<root>/<id>.{png,jpg,jpeg}`.
#[derive(Clone, Debug)]
pub struct DirectoryImages {
    root: PathBuf,
}

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

impl DirectoryImages {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// First existing file for `id`, in extension order.
    pub fn path_for(&self, id: &str) -> Option<PathBuf> {
        // Identifiers are file stems; anything that could escape the root is
        // treated as unknown.
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            return None;
        }
        EXTENSIONS
            .iter()
            .map(|ext| self.root.join(format!("{id}.{ext}")))
            .find(|p| p.is_file())
    }
}

impl ReferenceImages for DirectoryImages {
    fn load(&self, id: &str) -> Result<Option<RgbImage>, image::ImageError> {
        match self.path_for(id) {
            Some(path) => Ok(Some(image::open(path)?.to_rgb8())),
            None => Ok(None),
        }
    }
}
