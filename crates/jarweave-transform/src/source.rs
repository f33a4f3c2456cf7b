//! Class byte sources
//!
//! The pipeline never resolves a classpath itself. It asks one or more
//! [`ClassSource`]s for raw class bytes and treats "no source has it" as
//! [`crate::PipelineError::NotFound`].

use jarweave_classfile::ClassName;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Provider of raw class bytes
pub trait ClassSource: Send + Sync {
    /// Raw bytes for `name`, or `None` if this source does not have it
    fn find_class_bytes(&self, name: &ClassName) -> io::Result<Option<Vec<u8>>>;
}

/// In-memory class source
#[derive(Debug, Default)]
pub struct MemorySource {
    classes: RwLock<HashMap<ClassName, Vec<u8>>>,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a class
    pub fn insert(&self, name: &str, bytes: Vec<u8>) {
        self.classes.write().insert(ClassName::new(name), bytes);
    }
}

impl ClassSource for MemorySource {
    fn find_class_bytes(&self, name: &ClassName) -> io::Result<Option<Vec<u8>>> {
        Ok(self.classes.read().get(name).cloned())
    }
}

/// Classpath directory laid out as `a/b/C.class`
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Source rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Classpath root
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ClassSource for DirectorySource {
    fn find_class_bytes(&self, name: &ClassName) -> io::Result<Option<Vec<u8>>> {
        match std::fs::read(self.root.join(name.resource_path())) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Classes stored in an archive on disk
pub struct ArchiveSource {
    path: PathBuf,
    archive: Mutex<zip::ZipArchive<File>>,
}

impl ArchiveSource {
    /// Open the archive at `path`
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        let archive = zip::ZipArchive::new(file)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(Self {
            path,
            archive: Mutex::new(archive),
        })
    }

    /// Path of the archive
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ClassSource for ArchiveSource {
    fn find_class_bytes(&self, name: &ClassName) -> io::Result<Option<Vec<u8>>> {
        let mut archive = self.archive.lock();
        let mut entry = match archive.by_name(&name.resource_path()) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(io::Error::new(io::ErrorKind::Other, e)),
        };
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        Ok(Some(bytes))
    }
}

impl std::fmt::Debug for ArchiveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveSource").field("path", &self.path).finish()
    }
}
