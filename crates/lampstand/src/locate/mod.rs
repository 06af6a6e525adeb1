//! Device position for "near me" searches.
//!
//! A [`Locator`] produces one position fix. [`Geolocation`] adds the request
//! policy on top: a timeout on each fix and reuse of a recent fix up to a maximum
//! age before asking the device again.

use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use lampstand_directory::Coordinate;
use tracing::{debug, instrument, warn};

pub use error::GeolocationError;

/// How a position is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    /// Give up on a fix after this long.
    pub timeout: Duration,
    /// A previous fix younger than this is reused.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(5 * 60),
        }
    }
}

/// A position fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub coordinate: Coordinate,
    pub timestamp: DateTime<Utc>,
    /// Reported accuracy radius in metres, when known.
    pub accuracy_m: Option<f64>,
}

impl Position {
    pub fn now(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            timestamp: Utc::now(),
            accuracy_m: None,
        }
    }

    pub fn age(&self) -> Duration {
        (Utc::now() - self.timestamp).to_std().unwrap_or_default()
    }
}

/// Source of position fixes.
pub trait Locator: Send + Sync {
    fn locate(
        &self,
        high_accuracy: bool,
    ) -> impl Future<Output = Result<Position, GeolocationError>> + Send;
}

impl<L: Locator> Locator for Arc<L> {
    fn locate(
        &self,
        high_accuracy: bool,
    ) -> impl Future<Output = Result<Position, GeolocationError>> + Send {
        (**self).locate(high_accuracy)
    }
}

/// Always reports the same coordinate, e.g. one typed in by the user.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocator(pub Coordinate);

impl Locator for FixedLocator {
    async fn locate(&self, _high_accuracy: bool) -> Result<Position, GeolocationError> {
        Ok(Position::now(self.0))
    }
}

/// A device without location support, or one where permission was refused.
#[derive(Debug, Clone, Copy)]
pub struct UnavailableLocator(pub GeolocationError);

impl Default for UnavailableLocator {
    fn default() -> Self {
        Self(GeolocationError::PositionUnavailable)
    }
}

impl Locator for UnavailableLocator {
    async fn locate(&self, _high_accuracy: bool) -> Result<Position, GeolocationError> {
        Err(self.0)
    }
}

/// Applies [`PositionOptions`] to a [`Locator`].
#[derive(Debug)]
pub struct Geolocation<L> {
    locator: L,
    options: PositionOptions,
    last_fix: Mutex<Option<Position>>,
}

impl<L: Locator> Geolocation<L> {
    pub fn new(locator: L, options: PositionOptions) -> Self {
        Self {
            locator,
            options,
            last_fix: Mutex::new(None),
        }
    }

    pub const fn options(&self) -> &PositionOptions {
        &self.options
    }

    pub const fn locator(&self) -> &L {
        &self.locator
    }

    /// Current position, reusing the last fix while it is younger than `maximum_age`.
    #[instrument(name = "Locate user", skip(self), level = "info")]
    pub async fn current_position(&self) -> Result<Position, GeolocationError> {
        if let Some(fix) = self.recent_fix() {
            debug!(age = ?fix.age(), "Reusing recent position fix");
            return Ok(fix);
        }

        let fix = tokio::time::timeout(
            self.options.timeout,
            self.locator.locate(self.options.high_accuracy),
        )
        .await
        .unwrap_or(Err(GeolocationError::Timeout))
        .inspect_err(|error| warn!(%error, "Position request failed"))?;

        *self.last_fix.lock().unwrap_or_else(PoisonError::into_inner) = Some(fix);
        Ok(fix)
    }

    /// Drop the remembered fix so the next request asks the device again.
    pub fn forget(&self) {
        *self.last_fix.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn recent_fix(&self) -> Option<Position> {
        let last_fix = *self.last_fix.lock().unwrap_or_else(PoisonError::into_inner);
        last_fix.filter(|fix| fix.age() <= self.options.maximum_age)
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
    pub enum GeolocationError {
        #[error("Location permission was denied")]
        PermissionDenied,
        #[error("Location is unavailable on this device")]
        PositionUnavailable,
        #[error("Timed out waiting for a location fix")]
        Timeout,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const SYDNEY: Coordinate = Coordinate::new(-33.87, 151.21);

    /// Returns fixes stamped `stale_by` in the past and counts requests.
    struct CountingLocator {
        calls: AtomicUsize,
        stale_by: chrono::Duration,
        delay: Duration,
    }

    impl CountingLocator {
        fn new(stale_by: chrono::Duration, delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                stale_by,
                delay,
            }
        }
    }

    impl Locator for CountingLocator {
        async fn locate(&self, _high_accuracy: bool) -> Result<Position, GeolocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(Position {
                coordinate: SYDNEY,
                timestamp: Utc::now() - self.stale_by,
                accuracy_m: Some(25.0),
            })
        }
    }

    #[test]
    fn test_default_options() {
        let options = PositionOptions::default();
        assert!(options.high_accuracy);
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.maximum_age, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_fixed_locator() {
        let geolocation = Geolocation::new(FixedLocator(SYDNEY), PositionOptions::default());
        let position = geolocation.current_position().await.unwrap();
        assert_eq!(position.coordinate, SYDNEY);
    }

    #[tokio::test]
    async fn test_unavailable_locator_reports_error() {
        let geolocation = Geolocation::new(
            UnavailableLocator(GeolocationError::PermissionDenied),
            PositionOptions::default(),
        );
        assert_eq!(
            geolocation.current_position().await,
            Err(GeolocationError::PermissionDenied)
        );
    }

    #[tokio::test]
    async fn test_recent_fix_is_reused() {
        let locator = Arc::new(CountingLocator::new(chrono::Duration::zero(), Duration::ZERO));
        let geolocation = Geolocation::new(Arc::clone(&locator), PositionOptions::default());

        geolocation.current_position().await.unwrap();
        geolocation.current_position().await.unwrap();
        assert_eq!(locator.calls.load(Ordering::SeqCst), 1);

        geolocation.forget();
        geolocation.current_position().await.unwrap();
        assert_eq!(locator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_fix_is_refreshed() {
        let locator = Arc::new(CountingLocator::new(
            chrono::Duration::minutes(10),
            Duration::ZERO,
        ));
        let geolocation = Geolocation::new(Arc::clone(&locator), PositionOptions::default());

        geolocation.current_position().await.unwrap();
        geolocation.current_position().await.unwrap();
        assert_eq!(locator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fix_times_out() {
        let locator = CountingLocator::new(chrono::Duration::zero(), Duration::from_secs(30));
        let geolocation = Geolocation::new(locator, PositionOptions::default());

        assert_eq!(
            geolocation.current_position().await,
            Err(GeolocationError::Timeout)
        );
        assert!(geolocation.recent_fix().is_none());
    }
}
