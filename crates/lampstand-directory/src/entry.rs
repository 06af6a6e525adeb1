use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Coordinate, Region};

/// How a listing made its way into the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    /// Entered by ministry staff.
    #[default]
    Manual,
    /// Bulk imported from a denominational register.
    Import,
    /// Submitted through the public "add your church" form.
    Submission,
    /// Supplied by a partner network.
    Partner,
}

/// One church listing in the directory.
///
/// Entries are read-only at runtime. Coordinates resolved by geocoding are held
/// in the session cache rather than written back here, and distances live on
/// the ranked search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub id: String,
    pub name: String,
    pub street: String,
    pub city: String,
    pub region: Region,
    pub postcode: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    pub pastor: String,
    pub denomination: String,
    #[serde(default)]
    pub service_times: Vec<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
    /// Bundled coordinate, when the dataset already carries one.
    #[serde(default)]
    pub coordinate: Option<Coordinate>,
    /// Vetted by ministry leadership.
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub source: EntrySource,
}

impl DirectoryEntry {
    /// Full postal address used as the geocoding cache key.
    pub fn formatted_address(&self) -> String {
        format!(
            "{}, {} {} {}",
            self.street.trim(),
            self.city.trim(),
            self.region.code(),
            self.postcode.trim()
        )
    }

    pub const fn has_coordinate(&self) -> bool {
        self.coordinate.is_some()
    }

    /// Case-insensitive substring match over name, city, postcode and denomination.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [
            self.name.as_str(),
            self.city.as_str(),
            self.postcode.as_str(),
            self.denomination.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

impl fmt::Display for DirectoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.name, self.id, self.formatted_address())
    }
}
