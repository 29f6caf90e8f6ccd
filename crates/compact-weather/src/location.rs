//! Location resolution: GPS fix with a manual ZIP/city fallback.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;

use crate::types::{Location, LocationError};

/// Default bound on waiting for a fix
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
/// Default age a previously obtained fix may have and still be reused
pub const DEFAULT_MAXIMUM_AGE: Duration = Duration::from_secs(60);

/// Options passed along with a position request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeolocationOptions {
    pub timeout: Duration,
    pub maximum_age: Duration,
}

impl Default for GeolocationOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            maximum_age: DEFAULT_MAXIMUM_AGE,
        }
    }
}

/// Platform geolocation capability.
pub trait Geolocator: Send + Sync {
    /// Obtain the current position. Implementations may serve a fix no
    /// older than `options.maximum_age`; the resolver enforces the timeout.
    fn current_position(
        &self,
        options: &GeolocationOptions,
    ) -> impl Future<Output = Result<Location, LocationError>> + Send;
}

/// Always reports the same configured coordinates.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocator {
    latitude: f64,
    longitude: f64,
}

impl FixedGeolocator {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl Geolocator for FixedGeolocator {
    async fn current_position(
        &self,
        _options: &GeolocationOptions,
    ) -> Result<Location, LocationError> {
        Ok(Location::new(self.latitude, self.longitude))
    }
}

/// Host without a positioning capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableGeolocator;

impl Geolocator for UnavailableGeolocator {
    async fn current_position(
        &self,
        _options: &GeolocationOptions,
    ) -> Result<Location, LocationError> {
        Err(LocationError::ServiceUnavailable)
    }
}

/// Serves the last successful fix while it is younger than the requested
/// maximum age, otherwise asks the inner geolocator.
#[derive(Debug)]
pub struct CachedGeolocator<G> {
    inner: G,
    last_fix: Mutex<Option<Location>>,
}

impl<G: Geolocator> CachedGeolocator<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            last_fix: Mutex::new(None),
        }
    }

    /// Last fix obtained from the inner geolocator, if any
    pub fn last_fix(&self) -> Option<Location> {
        *self.last_fix.lock()
    }
}

impl<G: Geolocator> Geolocator for CachedGeolocator<G> {
    async fn current_position(
        &self,
        options: &GeolocationOptions,
    ) -> Result<Location, LocationError> {
        let cached = *self.last_fix.lock();
        if let Some(fix) = cached {
            if fix.age(Utc::now()) <= options.maximum_age {
                tracing::debug!("Reusing cached location fix from {}", fix.fixed_at);
                return Ok(fix);
            }
        }

        let fix = self.inner.current_position(options).await?;
        *self.last_fix.lock() = Some(fix);
        Ok(fix)
    }
}

/// Location string passed verbatim as the provider's `q` parameter
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Coordinates { latitude: f64, longitude: f64 },
    Manual(String),
}

impl LocationQuery {
    pub fn as_query_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coordinates { latitude, longitude } => write!(f, "{},{}", latitude, longitude),
            Self::Manual(text) => f.write_str(text),
        }
    }
}

impl From<&Location> for LocationQuery {
    fn from(loc: &Location) -> Self {
        Self::Coordinates {
            latitude: loc.latitude,
            longitude: loc.longitude,
        }
    }
}

/// Which location sources a resolution cycle may use, taken from the
/// settings snapshot.
#[derive(Debug, Clone, Copy)]
pub struct LocationPlan<'a> {
    pub use_gps: bool,
    pub manual: &'a str,
}

impl<'a> LocationPlan<'a> {
    pub fn new(use_gps: bool, manual: &'a str) -> Self {
        Self { use_gps, manual }
    }

    fn manual_query(&self) -> Option<LocationQuery> {
        if self.manual.is_empty() {
            None
        } else {
            Some(LocationQuery::Manual(self.manual.to_string()))
        }
    }
}

/// Why no location could be resolved. Both cases end the cycle quietly.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("GPS failed ({0}) and no fallback location is available")]
    NoFallback(LocationError),
    #[error("No location method configured")]
    NotConfigured,
}

/// Pick the query for one weather cycle.
///
/// With GPS enabled the geolocator is asked for a fix, bounded by
/// `options.timeout`; on any failure the manual text is used when present.
/// With GPS disabled only the manual text is considered.
pub async fn resolve_location<G: Geolocator>(
    geolocator: &G,
    plan: LocationPlan<'_>,
    options: &GeolocationOptions,
) -> Result<LocationQuery, ResolveError> {
    if !plan.use_gps {
        return plan.manual_query().ok_or(ResolveError::NotConfigured);
    }

    let outcome = match tokio::time::timeout(options.timeout, geolocator.current_position(options))
        .await
    {
        Ok(result) => result,
        Err(_) => Err(LocationError::Timeout),
    };

    match outcome {
        Ok(fix) => {
            let query = LocationQuery::from(&fix);
            tracing::info!("Got location: {}", query);
            Ok(query)
        }
        Err(e) => {
            tracing::warn!("Location error: {}", e);
            match plan.manual_query() {
                Some(query) => {
                    tracing::info!("Falling back to manual location: {}", query);
                    Ok(query)
                }
                None => Err(ResolveError::NoFallback(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingGeolocator(LocationError);

    impl Geolocator for FailingGeolocator {
        async fn current_position(
            &self,
            _options: &GeolocationOptions,
        ) -> Result<Location, LocationError> {
            Err(self.0.clone())
        }
    }

    struct StalledGeolocator;

    impl Geolocator for StalledGeolocator {
        async fn current_position(
            &self,
            _options: &GeolocationOptions,
        ) -> Result<Location, LocationError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Location::new(0.0, 0.0))
        }
    }

    #[derive(Default)]
    struct CountingGeolocator {
        calls: AtomicUsize,
    }

    impl Geolocator for CountingGeolocator {
        async fn current_position(
            &self,
            _options: &GeolocationOptions,
        ) -> Result<Location, LocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Location::new(51.5, -0.12))
        }
    }

    #[test]
    fn test_coordinate_query_format() {
        let q = LocationQuery::Coordinates {
            latitude: 37.7749,
            longitude: -122.4194,
        };
        assert_eq!(q.as_query_string(), "37.7749,-122.4194");
        assert_eq!(LocationQuery::Manual("London".into()).to_string(), "London");
    }

    #[tokio::test]
    async fn test_gps_success_yields_coordinates() {
        let geo = FixedGeolocator::new(37.7749, -122.4194);
        let query = resolve_location(&geo, LocationPlan::new(true, "90210"), &Default::default())
            .await
            .unwrap();
        assert_eq!(query.to_string(), "37.7749,-122.4194");
    }

    #[tokio::test]
    async fn test_gps_failure_falls_back_to_manual() {
        let geo = FailingGeolocator(LocationError::PermissionDenied);
        let query = resolve_location(&geo, LocationPlan::new(true, "90210"), &Default::default())
            .await
            .unwrap();
        assert_eq!(query, LocationQuery::Manual("90210".to_string()));
    }

    #[tokio::test]
    async fn test_gps_failure_without_fallback_aborts() {
        let geo = UnavailableGeolocator;
        let err = resolve_location(&geo, LocationPlan::new(true, ""), &Default::default())
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::NoFallback(LocationError::ServiceUnavailable));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gps_timeout_falls_back() {
        let options = GeolocationOptions {
            timeout: Duration::from_secs(15),
            maximum_age: Duration::from_secs(60),
        };
        let query = resolve_location(&StalledGeolocator, LocationPlan::new(true, "London"), &options)
            .await
            .unwrap();
        assert_eq!(query.to_string(), "London");

        let err = resolve_location(&StalledGeolocator, LocationPlan::new(true, ""), &options)
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::NoFallback(LocationError::Timeout));
    }

    #[tokio::test]
    async fn test_gps_disabled_uses_manual_without_locating() {
        let geo = CountingGeolocator::default();
        let query = resolve_location(&geo, LocationPlan::new(false, "London"), &Default::default())
            .await
            .unwrap();
        assert_eq!(query.to_string(), "London");
        assert_eq!(geo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_gps_disabled_and_no_manual_is_not_configured() {
        let geo = CountingGeolocator::default();
        let err = resolve_location(&geo, LocationPlan::new(false, ""), &Default::default())
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::NotConfigured);
    }

    #[tokio::test]
    async fn test_cached_fix_is_reused_within_maximum_age() {
        let geo = CachedGeolocator::new(CountingGeolocator::default());
        let options = GeolocationOptions::default();

        let first = geo.current_position(&options).await.unwrap();
        let second = geo.current_position(&options).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(geo.inner.calls.load(Ordering::SeqCst), 1);
        assert!(geo.last_fix().is_some());
    }

    #[tokio::test]
    async fn test_cached_fix_is_refreshed_when_stale() {
        let geo = CachedGeolocator::new(CountingGeolocator::default());
        *geo.last_fix.lock() = Some(Location {
            fixed_at: Utc::now() - chrono::Duration::seconds(120),
            ..Location::new(0.0, 0.0)
        });

        let fix = geo.current_position(&GeolocationOptions::default()).await.unwrap();
        assert_eq!(fix.latitude, 51.5);
        assert_eq!(geo.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_is_not_poisoned_by_failures() {
        let geo = CachedGeolocator::new(UnavailableGeolocator);
        assert!(geo.current_position(&GeolocationOptions::default()).await.is_err());
        assert!(geo.last_fix().is_none());
    }
}
