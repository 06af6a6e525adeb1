//! Lampstand - find a church near you
//!
//! Lampstand ranks a bundled church directory by distance from the user. It
//! asks the device for a position, geocodes any listing that ships without
//! coordinates, and returns the churches within a chosen radius, nearest first.
//! When nothing is close enough it lists the churches in the user's state or
//! territory instead, and when the position is unavailable it shows the whole
//! directory.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lampstand::{AppContext, Coordinate, FinderConfig, FixedLocator, SearchRadius};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! lampstand::init_logging(tracing::Level::INFO)?;
//!
//! let config = FinderConfig::from_env()?;
//! let locator = FixedLocator(Coordinate::new(-33.87, 151.21));
//! let mut ctx = AppContext::from_config(config, locator)?;
//!
//! let finder = ctx.finder_mut();
//! finder.search().await;
//! finder.set_radius(SearchRadius::Km100);
//! if let Some(notice) = finder.notice() {
//!     println!("{notice}");
//! }
//! for ranked in finder.view().ranked() {
//!     println!("{:>6.1} km  {}", ranked.distance_km.unwrap_or_default(), ranked.entry.name);
//! }
//! # Ok::<(), lampstand::error::LampstandError>(())
//! # }).unwrap();
//! ```
//!
//! # Features
//!
//! - **Proximity search**: haversine distances, 25/50/100/250 km radii, stable ordering
//! - **Region fallback**: nearest listings in the user's state when the radius is empty
//! - **Geocoding**: concurrent, de-duplicated lookups behind a session cache
//! - **Membership**: plan loading with retry and optimistic upgrades
//!
//! The `nominatim` feature (on by default) provides an HTTP geocoder for any
//! Nominatim-compatible service.
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod config;
mod context;
mod core;
pub mod error;
pub mod geo;
mod geocode;
mod locate;
pub mod membership;
mod rank;
pub mod retry;
pub mod snapshot;

pub use config::{FinderConfig, FinderConfigBuilder, GeocoderConfig};
pub use context::AppContext;
pub use core::{ChurchFinder, DirectoryView, Notice, SearchPhase};

#[cfg(feature = "nominatim")]
pub use geocode::NominatimGeocoder;
pub use geocode::{CachingGeocoder, GeocodeCache, GeocodeError, Geocoder, ResolvedCoordinates};
pub use lampstand_directory as directory;
pub use lampstand_directory::{
    Coordinate, Directory, DirectoryEntry, DirectoryError, DirectoryFilter, EntrySource, Region,
};
pub use locate::{
    FixedLocator, Geolocation, GeolocationError, Locator, Position, PositionOptions,
    UnavailableLocator,
};
pub use rank::{ProximityRanker, RankedEntry, Ranking, SearchRadius};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for Lampstand.
///
/// `RUST_LOG` takes precedence over `level` when set. Safe to call more than
/// once; only the first call installs the subscriber.
///
/// ```rust
/// use lampstand::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), lampstand::error::LampstandError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::LampstandError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("hyper_util=warn".parse()?)
            .add_directive("reqwest=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use lampstand_directory::test_data::SYDNEY;

    use super::*;

    fn setup_test_env() {
        let _ = init_logging(tracing::Level::WARN);
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        setup_test_env();
        assert!(init_logging(tracing::Level::DEBUG).is_ok());
    }

    #[test]
    fn test_embedded_directory_loads() {
        setup_test_env();

        let directory = Directory::embedded().unwrap();
        assert!(!directory.is_empty(), "Should ship with directory data");
        assert!(
            directory.iter().any(|entry| entry.coordinate.is_none()),
            "Some listings rely on geocoding"
        );
    }

    #[tokio::test]
    async fn test_search_embedded_directory() {
        setup_test_env();

        let config = FinderConfig::builder().radius(SearchRadius::Km250).build();
        let geocoder = geocode::testing::MockGeocoder::default();
        let mut finder = ChurchFinder::new(
            Directory::embedded().unwrap(),
            CachingGeocoder::new(geocoder),
            FixedLocator(SYDNEY),
            &config,
        );

        let view = finder.search().await;
        let ranked = view.ranked();
        assert!(!ranked.is_empty(), "Sydney should have churches within 250 km");
        assert!(
            ranked
                .windows(2)
                .all(|pair| pair[0].distance_km <= pair[1].distance_km)
        );
        assert!(ranked.iter().all(|r| r.distance_km.is_some_and(|d| d <= 250.0)));
    }
}
