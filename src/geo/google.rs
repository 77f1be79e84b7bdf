// Google Maps Platform adapter: Geocoding API and Distance Matrix API.
//
// Responses are parsed into typed structs. A non-"OK" status at either the
// top level or the element level is an error, which the resolver turns into
// the unknown-distance sentinel.
//
// API docs: https://developers.google.com/maps/documentation/geocoding
//           https://developers.google.com/maps/documentation/distance-matrix

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::location::Coordinates;
use super::traits::{GeocodingService, RouteDistanceService};

/// Default base URL for the Maps web services.
pub const DEFAULT_MAPS_API_URL: &str = "https://maps.googleapis.com/maps/api";

/// HTTP client for the Geocoding and Distance Matrix endpoints.
pub struct GoogleMapsClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GoogleMapsClient {
    pub fn new(base_url: &str, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent("crossmatch/0.1 (profile-disambiguation)")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{}/json", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("Maps {endpoint} request failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Maps {endpoint} returned {status}: {body}");
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse Maps {endpoint} response"))
    }
}

#[async_trait]
impl GeocodingService for GoogleMapsClient {
    async fn resolve(&self, location: &str) -> Result<Coordinates> {
        let response: GeocodeResponse = self
            .get_json("geocode", &[("address", location)])
            .await?;
        let coords = response.into_coordinates(location)?;
        debug!(location, lat = coords.lat, long = coords.long, "Geocoded location");
        Ok(coords)
    }
}

#[async_trait]
impl RouteDistanceService for GoogleMapsClient {
    async fn route_distance(&self, from: &str, to: &str) -> Result<f64> {
        let response: DistanceMatrixResponse = self
            .get_json(
                "distancematrix",
                &[
                    ("origins", from),
                    ("destinations", to),
                    ("mode", "driving"),
                    ("language", "en-EN"),
                ],
            )
            .await?;
        let km = response.into_kilometers(from, to)?;
        debug!(from, to, km, "Route distance");
        Ok(km)
    }
}

// --- Geocoding API response types ---

#[derive(Debug, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeResult {
    pub geometry: Geometry,
}

#[derive(Debug, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl GeocodeResponse {
    /// First result's coordinates, or an error carrying the API status.
    pub fn into_coordinates(self, location: &str) -> Result<Coordinates> {
        if self.status != "OK" {
            anyhow::bail!("Geocoding {location:?} returned status {}", self.status);
        }
        self.results
            .into_iter()
            .next()
            .map(|r| Coordinates::new(r.geometry.location.lat, r.geometry.location.lng))
            .ok_or_else(|| anyhow::anyhow!("Geocoding {location:?} returned no results"))
    }
}

// --- Distance Matrix API response types ---

#[derive(Debug, Deserialize)]
pub struct DistanceMatrixResponse {
    pub status: String,
    #[serde(default)]
    pub rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
pub struct MatrixRow {
    pub elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
pub struct MatrixElement {
    pub status: String,
    pub distance: Option<TextValue>,
    pub duration: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
pub struct TextValue {
    pub text: String,
    /// Meters for distance, seconds for duration
    pub value: f64,
}

impl DistanceMatrixResponse {
    /// Distance of the single origin/destination element, in kilometers.
    pub fn into_kilometers(self, from: &str, to: &str) -> Result<f64> {
        if self.status != "OK" {
            anyhow::bail!("Distance matrix returned status {}", self.status);
        }
        let element = self
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.elements.into_iter().next())
            .ok_or_else(|| anyhow::anyhow!("Distance matrix returned no elements"))?;

        if element.status != "OK" {
            anyhow::bail!(
                "No route between {from:?} and {to:?} (status {})",
                element.status
            );
        }

        if let Some(duration) = &element.duration {
            debug!(from, to, duration = %duration.text, "Estimated driving duration");
        }

        element
            .distance
            .map(|d| d.value / 1000.0)
            .ok_or_else(|| anyhow::anyhow!("Distance matrix element has no distance"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geocode_ok() {
        let json = r#"{
            "status": "OK",
            "results": [{"geometry": {"location": {"lat": 39.0997, "lng": -94.5786}}}]
        }"#;
        let resp: GeocodeResponse = serde_json::from_str(json).unwrap();
        let coords = resp.into_coordinates("Kansas City").unwrap();
        assert!((coords.lat - 39.0997).abs() < 1e-9);
        assert!((coords.long + 94.5786).abs() < 1e-9);
    }

    #[test]
    fn test_geocode_zero_results() {
        let resp: GeocodeResponse =
            serde_json::from_str(r#"{"status": "ZERO_RESULTS", "results": []}"#).unwrap();
        assert!(resp.into_coordinates("Atlantis").is_err());
    }

    #[test]
    fn test_distance_matrix_meters_to_km() {
        let json = r#"{
            "status": "OK",
            "rows": [{"elements": [{
                "status": "OK",
                "distance": {"text": "351 km", "value": 351234},
                "duration": {"text": "4 hours", "value": 14400}
            }]}]
        }"#;
        let resp: DistanceMatrixResponse = serde_json::from_str(json).unwrap();
        let km = resp.into_kilometers("Kuala Lumpur", "Singapore").unwrap();
        assert!((km - 351.234).abs() < 1e-9);
    }

    #[test]
    fn test_distance_matrix_not_found() {
        let json = r#"{"status": "OK", "rows": [{"elements": [{"status": "NOT_FOUND"}]}]}"#;
        let resp: DistanceMatrixResponse = serde_json::from_str(json).unwrap();
        assert!(resp.into_kilometers("Jaffna", "Nowhere").is_err());
    }
}
