use std::time::Duration;

use tracing::debug;

use crate::{
    error::LampstandError,
    locate::PositionOptions,
    rank::{ProximityRanker, SearchRadius},
};

pub const GEOCODER_URL_ENV: &str = "LAMPSTAND_GEOCODER_URL";
pub const COUNTRY_ENV: &str = "LAMPSTAND_COUNTRY";
pub const USER_AGENT_ENV: &str = "LAMPSTAND_USER_AGENT";
pub const RADIUS_ENV: &str = "LAMPSTAND_RADIUS_KM";

/// Connection settings for the geocoding service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocoderConfig {
    pub base_url: String,
    /// ISO 3166-1 alpha-2 code lookups are restricted to.
    pub country_code: String,
    pub user_agent: String,
    pub request_timeout: Duration,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            country_code: "au".to_string(),
            user_agent: concat!("lampstand/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout: Duration::from_secs(8),
        }
    }
}

/// Configuration for the church finder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinderConfig {
    /// Radius used until the user picks another.
    pub default_radius: SearchRadius,
    pub position: PositionOptions,
    pub geocoder: GeocoderConfig,
    /// Maximum concurrent geocoding requests; `0` means one per address.
    pub max_in_flight: usize,
    /// List the user's region when nothing is within the radius.
    pub region_fallback: bool,
    /// Directory size at which distances are computed in parallel.
    pub parallel_threshold: usize,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            default_radius: SearchRadius::Km50,
            position: PositionOptions::default(),
            geocoder: GeocoderConfig::default(),
            max_in_flight: 0,
            region_fallback: true,
            parallel_threshold: 2048,
        }
    }
}

impl FinderConfig {
    pub fn builder() -> FinderConfigBuilder {
        FinderConfigBuilder::new()
    }

    pub const fn ranker(&self) -> ProximityRanker {
        ProximityRanker {
            parallel_threshold: self.parallel_threshold,
            region_fallback: self.region_fallback,
        }
    }

    /// Defaults overridden by `LAMPSTAND_*` environment variables.
    pub fn from_env() -> Result<Self, LampstandError> {
        let mut builder = FinderConfigBuilder::new();
        if let Ok(url) = std::env::var(GEOCODER_URL_ENV) {
            builder = builder.geocoder_url(url)?;
        }
        if let Ok(country) = std::env::var(COUNTRY_ENV) {
            builder = builder.country_code(&country)?;
        }
        if let Ok(agent) = std::env::var(USER_AGENT_ENV) {
            builder = builder.user_agent(agent);
        }
        if let Ok(radius) = std::env::var(RADIUS_ENV) {
            let km: u32 = radius.trim().parse().map_err(|_| {
                LampstandError::ConfigError(format!(
                    "{RADIUS_ENV} must be a whole number, got {radius:?}"
                ))
            })?;
            builder = builder.radius_km(km)?;
        }
        let config = builder.build();
        debug!(?config, "Loaded finder configuration from environment");
        Ok(config)
    }
}

/// Builder for [`FinderConfig`] with presets for common deployments.
#[derive(Debug, Clone, Default)]
pub struct FinderConfigBuilder {
    config: FinderConfig,
}

impl FinderConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: FinderConfig::default(),
        }
    }

    /// Dense city listings: a tight radius and a short wait for a fix.
    pub fn metro() -> Self {
        let mut builder = Self::new();
        builder.config.default_radius = SearchRadius::Km25;
        builder.config.position.timeout = Duration::from_secs(6);
        builder
    }

    /// Sparse country listings: the widest radius and throttled geocoding.
    pub fn regional() -> Self {
        let mut builder = Self::new();
        builder.config.default_radius = SearchRadius::Km250;
        builder.config.max_in_flight = 4;
        builder.config.position.high_accuracy = false;
        builder
    }

    pub const fn radius(mut self, radius: SearchRadius) -> Self {
        self.config.default_radius = radius;
        self
    }

    pub fn radius_km(mut self, km: u32) -> Result<Self, LampstandError> {
        self.config.default_radius = SearchRadius::try_from(km)?;
        Ok(self)
    }

    pub fn geolocation_timeout(mut self, timeout: Duration) -> Result<Self, LampstandError> {
        if timeout.is_zero() {
            return Err(LampstandError::ConfigError(
                "Geolocation timeout must be greater than zero".to_string(),
            ));
        }
        self.config.position.timeout = timeout;
        Ok(self)
    }

    pub const fn maximum_age(mut self, maximum_age: Duration) -> Self {
        self.config.position.maximum_age = maximum_age;
        self
    }

    pub const fn high_accuracy(mut self, enabled: bool) -> Self {
        self.config.position.high_accuracy = enabled;
        self
    }

    pub fn geocoder_url(mut self, url: impl Into<String>) -> Result<Self, LampstandError> {
        let url = url.into();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(LampstandError::ConfigError(format!(
                "Geocoder URL must be http(s), got {url:?}"
            )));
        }
        self.config.geocoder.base_url = url;
        Ok(self)
    }

    pub fn country_code(mut self, code: &str) -> Result<Self, LampstandError> {
        let code = code.trim();
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(LampstandError::ConfigError(format!(
                "Country code must be two letters, got {code:?}"
            )));
        }
        self.config.geocoder.country_code = code.to_ascii_lowercase();
        Ok(self)
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.geocoder.user_agent = agent.into();
        self
    }

    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.geocoder.request_timeout = timeout;
        self
    }

    pub const fn max_in_flight(mut self, max: usize) -> Self {
        self.config.max_in_flight = max;
        self
    }

    pub const fn region_fallback(mut self, enabled: bool) -> Self {
        self.config.region_fallback = enabled;
        self
    }

    pub const fn parallel_threshold(mut self, threshold: usize) -> Self {
        self.config.parallel_threshold = threshold;
        self
    }

    pub fn build(self) -> FinderConfig {
        self.config
    }
}
