//! Per-session application state.

use lampstand_directory::Directory;
use tracing::{info, instrument};

use crate::{
    config::FinderConfig,
    core::ChurchFinder,
    geocode::{CachingGeocoder, Geocoder},
    locate::Locator,
    membership::MembershipStore,
    retry::RetryPolicy,
};

/// Owns everything one user session needs: configuration, the church finder
/// with its geocoding cache and position source, and the membership store.
///
/// Create one when the session starts and pass it to whatever handles user
/// actions; dropping it (or calling [`AppContext::end_session`]) releases the
/// session's caches.
#[derive(Debug)]
pub struct AppContext<G, L> {
    config: FinderConfig,
    finder: ChurchFinder<G, L>,
    membership: MembershipStore,
}

impl<G: Geocoder, L: Locator> AppContext<G, L> {
    pub fn new(
        config: FinderConfig,
        directory: Directory,
        geocoder: G,
        locator: L,
        retry: RetryPolicy,
    ) -> Self {
        let finder = ChurchFinder::new(directory, CachingGeocoder::new(geocoder), locator, &config);
        Self {
            config,
            finder,
            membership: MembershipStore::new(retry),
        }
    }

    pub const fn config(&self) -> &FinderConfig {
        &self.config
    }

    pub const fn finder(&self) -> &ChurchFinder<G, L> {
        &self.finder
    }

    pub const fn finder_mut(&mut self) -> &mut ChurchFinder<G, L> {
        &mut self.finder
    }

    pub const fn membership(&self) -> &MembershipStore {
        &self.membership
    }

    pub const fn membership_mut(&mut self) -> &mut MembershipStore {
        &mut self.membership
    }

    /// Tear the session down.
    #[instrument(name = "End session", skip_all, level = "info")]
    pub fn end_session(self) {
        let geocoder = self.finder.geocoder();
        info!(
            cached_addresses = geocoder.cache().len(),
            lookups = geocoder.lookups(),
            tier = %self.membership.current_tier(),
            "Session ended"
        );
    }
}

#[cfg(feature = "nominatim")]
impl<L: Locator> AppContext<crate::geocode::NominatimGeocoder, L> {
    /// Session backed by the configured Nominatim endpoint and the bundled
    /// (or `LAMPSTAND_DIRECTORY`) dataset.
    pub fn from_config(config: FinderConfig, locator: L) -> crate::error::Result<Self> {
        let directory = Directory::load()?;
        let geocoder = crate::geocode::NominatimGeocoder::new(&config.geocoder)?;
        Ok(Self::new(
            config,
            directory,
            geocoder,
            locator,
            RetryPolicy::default(),
        ))
    }
}
