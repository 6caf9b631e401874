//! Abstractions for filesystem access to enable testing and mocking.
//!
//! The `FileSystem` trait allows collectors to read the real `/proc`
//! counter sources on Linux or a mock implementation in tests and CI.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Abstraction for reading counter source files.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Reads the entire contents of a file into a caller-provided buffer.
    ///
    /// The buffer is cleared first; its allocation is reused across calls.
    fn read_into(&self, path: &Path, buf: &mut String) -> io::Result<()> {
        buf.clear();
        buf.push_str(&self.read_to_string(path)?);
        Ok(())
    }
}

/// Real filesystem implementation that delegates to `std::fs`.
///
/// Use this in production to read from the actual `/proc` filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read_into(&self, path: &Path, buf: &mut String) -> io::Result<()> {
        buf.clear();
        File::open(path)?.read_to_string(buf)?;
        Ok(())
    }
}
