//! In-memory mock filesystem for testing collectors without real `/proc`.
//!
//! `MockFs` stores file contents behind a shared handle: clones see the
//! same files, so a test can hand a clone to a reader and then advance
//! counter values between ticks through its own handle.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::collector::traits::FileSystem;

/// In-memory filesystem for testing.
///
/// Cloning produces another handle onto the same file set. `add_file`
/// overwrites, which is how tests simulate counters advancing (or
/// resetting) between sampling ticks.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    files: Arc<RwLock<HashMap<PathBuf, String>>>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file with the given content.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files
            .write()
            .expect("mock fs lock poisoned")
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    /// Removes a file, simulating a source that vanished.
    pub fn remove_file(&self, path: impl AsRef<Path>) {
        self.files
            .write()
            .expect("mock fs lock poisoned")
            .remove(path.as_ref());
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .read()
            .expect("mock fs lock poisoned")
            .get(path)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("file not found: {path:?}"))
            })
    }
}
