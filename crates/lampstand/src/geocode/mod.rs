//! Address to coordinate resolution.
//!
//! A [`Geocoder`] performs a single lookup against some backing service. The
//! [`CachingGeocoder`] wraps one with the session cache and is what the rest of
//! the crate talks to: it never fails, turning lookup errors into "no result" so a
//! single bad address cannot sink a whole search.

use std::{future::Future, sync::Arc};

use lampstand_directory::Coordinate;

mod cache;
#[cfg(feature = "nominatim")]
mod nominatim;
mod resolve;

pub use cache::GeocodeCache;
pub use error::GeocodeError;
use error::Result;
#[cfg(feature = "nominatim")]
pub use nominatim::NominatimGeocoder;
pub use resolve::{CachingGeocoder, ResolvedCoordinates};

/// A backing geocoding service.
pub trait Geocoder: Send + Sync {
    /// Look up `address`. `Ok(None)` means the service had no match.
    fn geocode(&self, address: &str) -> impl Future<Output = Result<Option<Coordinate>>> + Send;
}

impl<G: Geocoder> Geocoder for Arc<G> {
    fn geocode(&self, address: &str) -> impl Future<Output = Result<Option<Coordinate>>> + Send {
        (**self).geocode(address)
    }
}

impl<G: Geocoder> Geocoder for &G {
    fn geocode(&self, address: &str) -> impl Future<Output = Result<Option<Coordinate>>> + Send {
        (**self).geocode(address)
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum GeocodeError {
        #[cfg(feature = "nominatim")]
        #[error("HTTP error: {0}")]
        Http(#[from] reqwest::Error),
        #[error("Geocoder responded with status {0}")]
        Status(u16),
        #[error("Failed to parse geocoder response: {0}")]
        Parse(#[from] serde_json::Error),
        #[error("Invalid coordinate in geocoder response: lat={lat}, lon={lon}")]
        InvalidCoordinate { lat: String, lon: String },
    }
    pub type Result<T> = std::result::Result<T, GeocodeError>;
}
