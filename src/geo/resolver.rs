// Best-of-two location distance between two profiles.
//
// The second profile's location (current, or home when current is blank) is
// the probe. It is compared against the first profile's current and home
// locations, and the smaller of the two distances wins. Identical text on
// both sides short-circuits to 0.0 without a geocoder call. A leg whose
// locations can't be resolved is undefined; when both legs are undefined the
// best distance is UNKNOWN_DISTANCE, never 0.0.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::location::{Coordinates, LocationQuery};
use super::traits::GeocodingService;
use crate::profile::UserProfile;
use crate::services::ServiceGuard;

/// Sentinel for "distance not computable".
pub const UNKNOWN_DISTANCE: f64 = -1.0;

/// Both legs of a distance comparison plus what couldn't be resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceReport {
    /// Probe vs. the first profile's current location
    pub current_distance: Option<f64>,
    /// Probe vs. the first profile's home location
    pub home_distance: Option<f64>,
    /// Location texts that could not be turned into coordinates, with the reason
    pub unresolved: Vec<(String, String)>,
}

impl DistanceReport {
    /// Smallest defined leg, or UNKNOWN_DISTANCE when neither is defined.
    pub fn best_distance(&self) -> f64 {
        match (self.current_distance, self.home_distance) {
            (Some(c), Some(h)) => c.min(h),
            (Some(c), None) => c,
            (None, Some(h)) => h,
            (None, None) => UNKNOWN_DISTANCE,
        }
    }
}

/// Resolves profile locations through a geocoder and picks the best distance.
pub struct GeoDistanceResolver {
    geocoder: Arc<dyn GeocodingService>,
    guard: ServiceGuard,
}

impl GeoDistanceResolver {
    pub fn new(geocoder: Arc<dyn GeocodingService>, guard: ServiceGuard) -> Self {
        Self { geocoder, guard }
    }

    /// Compare `second`'s location against `first`'s current and home locations.
    pub async fn best_distance(&self, first: &UserProfile, second: &UserProfile) -> DistanceReport {
        let probe = if second.current_location.trim().is_empty() {
            second.home_location.as_str()
        } else {
            second.current_location.as_str()
        };

        let mut resolved: HashMap<String, Option<Coordinates>> = HashMap::new();
        let mut report = DistanceReport::default();

        report.current_distance = self
            .leg(probe, &first.current_location, &mut resolved, &mut report.unresolved)
            .await;
        report.home_distance = self
            .leg(probe, &first.home_location, &mut resolved, &mut report.unresolved)
            .await;

        debug!(
            probe,
            current = ?report.current_distance,
            home = ?report.home_distance,
            best = report.best_distance(),
            "Resolved location distance"
        );

        report
    }

    async fn leg(
        &self,
        probe: &str,
        candidate: &str,
        resolved: &mut HashMap<String, Option<Coordinates>>,
        unresolved: &mut Vec<(String, String)>,
    ) -> Option<f64> {
        let (probe_t, candidate_t) = (probe.trim(), candidate.trim());
        if !probe_t.is_empty() && probe_t.to_lowercase() == candidate_t.to_lowercase() {
            return Some(0.0);
        }

        let a = self.lookup(probe_t, resolved, unresolved).await?;
        let b = self.lookup(candidate_t, resolved, unresolved).await?;
        Some(a.euclidean_distance(&b))
    }

    /// Resolve one location text, at most once per comparison.
    async fn lookup(
        &self,
        text: &str,
        resolved: &mut HashMap<String, Option<Coordinates>>,
        unresolved: &mut Vec<(String, String)>,
    ) -> Option<Coordinates> {
        if let Some(cached) = resolved.get(text) {
            return *cached;
        }

        let coords = match LocationQuery::parse(text) {
            LocationQuery::Empty => {
                unresolved.push((text.to_string(), "location is empty".to_string()));
                None
            }
            LocationQuery::Coordinates(c) => Some(c),
            LocationQuery::Text(query) => {
                let geocoder = &self.geocoder;
                match self
                    .guard
                    .call("geocoder", "resolve", || geocoder.resolve(&query))
                    .await
                {
                    Ok(c) => Some(c),
                    Err(e) => {
                        warn!(location = %query, error = %e, "Location unresolved");
                        unresolved.push((query.clone(), format!("{e:#}")));
                        None
                    }
                }
            }
        };

        resolved.insert(text.to_string(), coords);
        coords
    }
}
