use crate::{DirectoryEntry, Region};

/// Attribute filter applied to the directory before any proximity ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryFilter {
    pub query: Option<String>,
    pub region: Option<Region>,
    pub verified_only: bool,
}

impl DirectoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Free-text query over name, city, postcode and denomination.
    #[must_use]
    pub fn query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = if query.trim().is_empty() {
            None
        } else {
            Some(query)
        };
        self
    }

    #[must_use]
    pub const fn region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    #[must_use]
    pub const fn verified_only(mut self, verified_only: bool) -> Self {
        self.verified_only = verified_only;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_none() && self.region.is_none() && !self.verified_only
    }

    pub fn matches(&self, entry: &DirectoryEntry) -> bool {
        if self.verified_only && !entry.verified {
            return false;
        }
        if self.region.is_some_and(|region| region != entry.region) {
            return false;
        }
        self.query
            .as_deref()
            .is_none_or(|query| entry.matches_query(query))
    }
}
