// Geocoding and routing ports.
//
// Both are async because every real provider is an HTTP API. The resolver
// never sees provider details: a provider either returns coordinates or an
// error, and the resolver turns errors into the unknown-distance sentinel.

use anyhow::Result;
use async_trait::async_trait;

use super::location::Coordinates;

/// Resolves free-text locations to coordinates.
#[async_trait]
pub trait GeocodingService: Send + Sync {
    async fn resolve(&self, location: &str) -> Result<Coordinates>;
}

/// Actual travel distance between two places, in kilometers.
/// Auxiliary metric only; not part of the feature vector.
#[async_trait]
pub trait RouteDistanceService: Send + Sync {
    async fn route_distance(&self, from: &str, to: &str) -> Result<f64>;
}

/// Geocoder used when no provider is configured. Every lookup fails, so every
/// distance that needs a lookup degrades to the unknown sentinel.
pub struct NoopGeocoder;

#[async_trait]
impl GeocodingService for NoopGeocoder {
    async fn resolve(&self, location: &str) -> Result<Coordinates> {
        anyhow::bail!("No geocoding provider configured (cannot resolve {location:?})")
    }
}
