use lampstand_directory::Coordinate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{GeocodeError, Geocoder, Result};
use crate::config::GeocoderConfig;

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Geocoder backed by a Nominatim-compatible `/search` endpoint.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    search_url: String,
    country_code: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &GeocoderConfig) -> Self {
        Self {
            client,
            search_url: format!("{}/search", config.base_url.trim_end_matches('/')),
            country_code: config.country_code.to_lowercase(),
        }
    }
}

impl Geocoder for NominatimGeocoder {
    #[instrument(name = "Nominatim search", skip(self), level = "debug")]
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>> {
        let response = self
            .client
            .get(&self.search_url)
            .query(&[
                ("q", address),
                ("format", "json"),
                ("limit", "1"),
                ("countrycodes", self.country_code.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_search_response(&body)
    }
}

/// Parse a `/search?format=json` body: an array whose first element carries
/// `lat`/`lon` as strings. An empty array means no match.
pub(crate) fn parse_search_response(body: &str) -> Result<Option<Coordinate>> {
    let hits: Vec<SearchHit> = serde_json::from_str(body)?;
    let Some(hit) = hits.into_iter().next() else {
        return Ok(None);
    };

    let invalid = || GeocodeError::InvalidCoordinate {
        lat: hit.lat.clone(),
        lon: hit.lon.clone(),
    };
    let latitude: f64 = hit.lat.trim().parse().map_err(|_| invalid())?;
    let longitude: f64 = hit.lon.trim().parse().map_err(|_| invalid())?;
    let coordinate = Coordinate::new(latitude, longitude);
    if !coordinate.is_valid() {
        return Err(invalid());
    }

    debug!(display_name = ?hit.display_name, %coordinate, "Geocoder match");
    Ok(Some(coordinate))
}
