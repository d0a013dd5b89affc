//! Local file handle
//!
//! A [`LocalFile`] names a file inside the watched directory and derives the
//! remote title from its final path component. It never holds file content:
//! bytes are read on demand by [`LocalFile::read_content`] and the handle is
//! closed before that call returns, on every path.
//!
//! Local reads are treated as fast and non-suspending, so they use blocking
//! `std::fs` I/O rather than going through the async runtime.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use super::errors::DomainError;
use super::newtypes::FileTitle;

/// A file in the local synced directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    path: PathBuf,
    title: FileTitle,
}

impl LocalFile {
    /// Creates a `LocalFile` for `path`
    ///
    /// The file does not need to exist: deletion events refer to paths that
    /// are already gone.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPath` if the path has no final component
    /// and `DomainError::InvalidFileName` if that component is not valid UTF-8
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let path = path.into();
        let name = path
            .file_name()
            .ok_or_else(|| DomainError::InvalidPath(path.display().to_string()))?;
        let name = name.to_str().ok_or_else(|| {
            DomainError::InvalidFileName(format!("not valid UTF-8: {}", path.display()))
        })?;
        let title = FileTitle::new(name)?;
        Ok(Self { path, title })
    }

    /// Path on the local filesystem
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Title used for the remote object (the file name)
    #[must_use]
    pub fn title(&self) -> &FileTitle {
        &self.title
    }

    /// Reads the whole file
    ///
    /// The file handle is scoped to this call.
    pub fn read_content(&self) -> io::Result<Vec<u8>> {
        let mut file = File::open(&self.path)?;
        let expected = usize::try_from(self.size()?).unwrap_or_default();
        let mut content = Vec::with_capacity(expected);
        file.read_to_end(&mut content)?;
        Ok(content)
    }

    /// Current size in bytes
    pub fn size(&self) -> io::Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }
}

impl TryFrom<&Path> for LocalFile {
    type Error = DomainError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}
