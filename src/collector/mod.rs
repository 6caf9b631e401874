//! Counter collection from the Linux `/proc` filesystem.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  SystemMetrics (manager)             │
//! │   cpu / memory / disk / net / fd metric groups       │
//! │                        │                             │
//! │                 ┌──────▼──────┐                      │
//! │                 │  ProcReader │  path + parse        │
//! │                 └──────┬──────┘                      │
//! │                 ┌──────▼──────┐                      │
//! │                 │  FileSystem │  (trait)             │
//! │                 └──────┬──────┘                      │
//! └────────────────────────┼─────────────────────────────┘
//!                ┌─────────┴─────────┐
//!         ┌──────▼──────┐     ┌──────▼──────┐
//!         │   RealFs    │     │   MockFs    │
//!         │  (Linux)    │     │  (testing)  │
//!         └─────────────┘     └─────────────┘
//! ```
//!
//! The parsers in [`procfs::parser`] are pure functions over file contents;
//! [`procfs::ProcReader`] binds them to a proc root through the
//! [`FileSystem`] seam, so the same code runs against the live `/proc` or
//! an in-memory fixture.

pub mod mock;
pub mod procfs;
pub mod traits;

pub use mock::MockFs;
pub use procfs::{CollectError, ProcReader};
pub use traits::{FileSystem, RealFs};
