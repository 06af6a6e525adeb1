//! Church directory data for the Lampstand church finder.
//!
//! This crate owns the directory data model ([`DirectoryEntry`], [`Coordinate`],
//! [`Region`]) and the read-only dataset that ships with the application. The
//! dataset is bundled at compile time and parsed once on first use; a JSON file
//! named by `LAMPSTAND_DIRECTORY` replaces it when set.
//!
//! ```rust
//! use lampstand_directory::{Directory, DirectoryFilter, Region};
//!
//! let directory = Directory::load()?;
//! let filter = DirectoryFilter::new().region(Region::Nsw).verified_only(true);
//! for entry in directory.filtered(&filter) {
//!     println!("{} ({})", entry.name, entry.city);
//! }
//! # Ok::<(), lampstand_directory::DirectoryError>(())
//! ```
use once_cell::sync::Lazy;
use std::path::PathBuf;
use tracing::info;

mod coordinate;
mod directory;
mod entry;
mod filter;
mod region;
#[cfg(any(test, feature = "test_data"))]
pub mod test_data;

pub use coordinate::Coordinate;
pub use directory::Directory;
pub use entry::{DirectoryEntry, EntrySource};
pub use filter::DirectoryFilter;
pub use region::Region;

pub const DIRECTORY_PATH_ENV: &str = "LAMPSTAND_DIRECTORY";

/// Optional on-disk dataset that replaces the bundled one.
pub static DIRECTORY_OVERRIDE: Lazy<Option<PathBuf>> = Lazy::new(|| {
    std::env::var(DIRECTORY_PATH_ENV).ok().map(|dir| {
        let path = PathBuf::from(dir);
        info!(path = ?path, "Using directory dataset override");
        path
    })
});

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum DirectoryError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Serialization error: {0}")]
        Json(#[from] serde_json::Error),
        #[error("Directory entry has an empty id")]
        EmptyId,
        #[error("Duplicate directory entry id: {0}")]
        DuplicateId(String),
        #[error("Invalid postcode '{postcode}' for entry {id}")]
        InvalidPostcode { id: String, postcode: String },
        #[error("Coordinate out of range for entry {id}: ({latitude}, {longitude})")]
        InvalidCoordinate {
            id: String,
            latitude: f64,
            longitude: f64,
        },
        #[error("Unknown region code: {0}")]
        UnknownRegion(String),
    }

    pub type Result<T> = std::result::Result<T, DirectoryError>;
}

pub use error::{DirectoryError, Result};
