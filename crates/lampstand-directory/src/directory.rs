use std::{fs, path::Path, sync::Arc};

use ahash::AHashSet as HashSet;
use itertools::Itertools;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use tracing::{debug, info, instrument};

use crate::{DIRECTORY_OVERRIDE, DirectoryEntry, DirectoryError, DirectoryFilter, Region, Result};

const EMBEDDED_DIRECTORY: &str = include_str!("../data/churches.json");

static POSTCODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}$").expect("postcode pattern is valid"));

static EMBEDDED: OnceCell<Directory> = OnceCell::new();

/// The read-only church directory.
///
/// Cloning is cheap; entries are shared behind an [`Arc`].
#[derive(Debug, Clone)]
pub struct Directory {
    entries: Arc<[DirectoryEntry]>,
}

impl Directory {
    /// Build a directory from entries, validating ids, postcodes and coordinates.
    pub fn new(entries: Vec<DirectoryEntry>) -> Result<Self> {
        validate(&entries)?;
        Ok(Self {
            entries: entries.into(),
        })
    }

    /// Load the dataset override if `LAMPSTAND_DIRECTORY` is set, otherwise the
    /// bundled dataset.
    pub fn load() -> Result<Self> {
        Self::load_from(DIRECTORY_OVERRIDE.as_deref())
    }

    /// Load `path` when given, otherwise the bundled dataset.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::embedded(),
        }
    }

    /// The dataset bundled into the binary. Parsed once per process.
    pub fn embedded() -> Result<Self> {
        EMBEDDED
            .get_or_try_init(|| {
                let directory = Self::from_json_str(EMBEDDED_DIRECTORY)?;
                info!(entries = directory.len(), "Loaded embedded church directory");
                Ok(directory)
            })
            .cloned()
    }

    #[instrument(name = "Load directory file", skip_all, level = "info")]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: Vec<DirectoryEntry> = serde_json::from_str(json)?;
        debug!(entries = entries.len(), "Parsed directory JSON");
        Self::new(entries)
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DirectoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&DirectoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Entries matching `filter`, in dataset order.
    pub fn filtered<'a>(
        &'a self,
        filter: &'a DirectoryFilter,
    ) -> impl Iterator<Item = &'a DirectoryEntry> + 'a {
        self.entries.iter().filter(move |entry| filter.matches(entry))
    }

    pub fn in_region(&self, region: Region) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.iter().filter(move |entry| entry.region == region)
    }

    /// Entries that need geocoding before they can be ranked.
    pub fn missing_coordinates(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.iter().filter(|entry| !entry.has_coordinate())
    }

    /// Distinct denominations, sorted, for filter menus.
    pub fn denominations(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.denomination.as_str())
            .unique()
            .sorted_unstable()
            .collect()
    }
}

impl<'a> IntoIterator for &'a Directory {
    type Item = &'a DirectoryEntry;
    type IntoIter = std::slice::Iter<'a, DirectoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn validate(entries: &[DirectoryEntry]) -> Result<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if entry.id.trim().is_empty() {
            return Err(DirectoryError::EmptyId);
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(DirectoryError::DuplicateId(entry.id.clone()));
        }
        if !POSTCODE.is_match(entry.postcode.trim()) {
            return Err(DirectoryError::InvalidPostcode {
                id: entry.id.clone(),
                postcode: entry.postcode.clone(),
            });
        }
        if let Some(coord) = entry.coordinate.filter(|coord| !coord.is_valid()) {
            return Err(DirectoryError::InvalidCoordinate {
                id: entry.id.clone(),
                latitude: coord.latitude,
                longitude: coord.longitude,
            });
        }
    }
    Ok(())
}
