use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::AHashMap as HashMap;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use lampstand_directory::{Coordinate, DirectoryEntry};
use tracing::{debug, info, instrument, warn};

use super::{GeocodeCache, Geocoder};

/// Coordinates available for ranking, keyed by entry id.
///
/// Bundled coordinates on the entry always win over geocoded ones.
#[derive(Debug, Clone, Default)]
pub struct ResolvedCoordinates {
    by_id: HashMap<String, Coordinate>,
}

impl ResolvedCoordinates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, coordinate: Coordinate) {
        self.by_id.insert(id.into(), coordinate);
    }

    pub fn coordinate_for(&self, entry: &DirectoryEntry) -> Option<Coordinate> {
        entry
            .coordinate
            .or_else(|| self.by_id.get(&entry.id).copied())
    }

    /// Number of entries with a known coordinate.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// A [`Geocoder`] fronted by the session cache.
#[derive(Debug)]
pub struct CachingGeocoder<G> {
    inner: G,
    cache: GeocodeCache,
    lookups: AtomicUsize,
}

impl<G: Geocoder> CachingGeocoder<G> {
    pub fn new(inner: G) -> Self {
        Self::with_cache(inner, GeocodeCache::new())
    }

    pub fn with_cache(inner: G, cache: GeocodeCache) -> Self {
        Self {
            inner,
            cache,
            lookups: AtomicUsize::new(0),
        }
    }

    pub const fn cache(&self) -> &GeocodeCache {
        &self.cache
    }

    pub const fn inner(&self) -> &G {
        &self.inner
    }

    /// How many lookups were delegated to the backing service.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Resolve one address, consulting the cache first.
    ///
    /// Lookup errors are logged and reported as `None`; nothing is retried.
    /// Only successful lookups are cached.
    #[instrument(name = "Resolve address", skip(self), level = "debug")]
    pub async fn resolve(&self, address: &str) -> Option<Coordinate> {
        if let Some(coordinate) = self.cache.get(address) {
            debug!("Geocode cache hit");
            return Some(coordinate);
        }

        self.lookups.fetch_add(1, Ordering::Relaxed);
        match self.inner.geocode(address).await {
            Ok(Some(coordinate)) => {
                self.cache.insert(address, coordinate);
                Some(coordinate)
            }
            Ok(None) => {
                debug!("Geocoder returned no match");
                None
            }
            Err(error) => {
                warn!(%error, "Geocoding lookup failed; entry excluded from ranking");
                None
            }
        }
    }

    /// Resolve every entry without a bundled coordinate.
    ///
    /// Distinct addresses are looked up concurrently with at most `max_in_flight`
    /// requests outstanding (`0` issues them all at once). Entries whose lookup
    /// fails are simply absent from the result.
    #[instrument(name = "Resolve missing coordinates", skip_all, level = "info")]
    pub async fn resolve_missing<'a, I>(
        &self,
        entries: I,
        max_in_flight: usize,
    ) -> ResolvedCoordinates
    where
        I: IntoIterator<Item = &'a DirectoryEntry>,
    {
        let t_resolve = std::time::Instant::now();
        let mut resolved = ResolvedCoordinates::new();
        let mut pending: Vec<(&'a DirectoryEntry, String)> = Vec::new();

        for entry in entries {
            match entry.coordinate {
                Some(coordinate) => resolved.insert(entry.id.as_str(), coordinate),
                None => pending.push((entry, entry.formatted_address())),
            }
        }

        let addresses: Vec<&str> = pending
            .iter()
            .map(|(_, address)| address.as_str())
            .unique()
            .collect();
        let limit = if max_in_flight == 0 {
            addresses.len().max(1)
        } else {
            max_in_flight
        };

        let found: HashMap<&str, Coordinate> = stream::iter(addresses.iter().copied())
            .map(|address| async move { (address, self.resolve(address).await) })
            .buffer_unordered(limit)
            .filter_map(|(address, coordinate)| async move { coordinate.map(|c| (address, c)) })
            .collect()
            .await;

        for (entry, address) in &pending {
            if let Some(coordinate) = found.get(address.as_str()) {
                resolved.insert(entry.id.as_str(), *coordinate);
            }
        }

        info!(
            addresses = addresses.len(),
            resolved = found.len(),
            elapsed_seconds = ?t_resolve.elapsed(),
            "Geocoding pass complete"
        );
        resolved
    }
}
