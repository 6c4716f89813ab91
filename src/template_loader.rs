use crate::error::{AkizoraError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Source of template text for includes and `parse_file`.
///
/// The engine only ever asks for a name and expects source text back; how
/// names map to storage is the host's business.
pub trait TemplateLoader: Send + Sync {
    fn load(&self, path: &str) -> Result<String>;
}

/// Loads templates from files under a root directory
pub struct FileSystemLoader {
    root: PathBuf,
}

impl FileSystemLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl TemplateLoader for FileSystemLoader {
    fn load(&self, path: &str) -> Result<String> {
        fs::read_to_string(self.root.join(path)).map_err(|_| AkizoraError::FileError {
            message: format!("failed accessing file at '{}'", path),
        })
    }
}
