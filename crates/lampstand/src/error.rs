use thiserror::Error;

#[derive(Error, Debug)]
pub enum LampstandError {
    #[error("Directory error: {0}")]
    Directory(#[from] lampstand_directory::DirectoryError),
    #[error("Geocoding error: {0}")]
    Geocode(#[from] crate::geocode::GeocodeError),
    #[error("Geolocation error: {0}")]
    Geolocation(#[from] crate::locate::GeolocationError),
    #[error("Membership error: {0}")]
    Membership(#[from] crate::membership::MembershipError),
    #[error("Unsupported search radius {0} km (expected 25, 50, 100 or 250)")]
    InvalidRadius(u32),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),
}

pub type Result<T> = std::result::Result<T, LampstandError>;
