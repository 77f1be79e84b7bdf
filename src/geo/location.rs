// Coordinates and location-text normalization.
//
// Profile locations are whatever the user typed. Before anything is sent to
// a geocoder the text is cleaned up: mobile-client geotag prefixes are
// stripped, "A & B" keeps the first place, and literal "lat,long" pairs are
// parsed directly so they never hit the network.

use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Geotag prefixes written by old mobile clients ("iPhone: 40.7,-73.9").
const CLIENT_PREFIXES: [&str; 2] = ["iphone:", "üt:"];

/// A point in latitude/longitude degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub long: f64,
}

impl Coordinates {
    pub fn new(lat: f64, long: f64) -> Self {
        Self { lat, long }
    }

    /// Straight-line distance in coordinate-degree space.
    ///
    /// Not a great-circle distance. The classifier was trained on this cheap
    /// approximation, so the feature must use the same one.
    pub fn euclidean_distance(&self, other: &Coordinates) -> f64 {
        ((self.long - other.long).powi(2) + (self.lat - other.lat).powi(2)).sqrt()
    }
}

/// What a location string turned out to be after normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    /// Nothing to resolve
    Empty,
    /// The text was already a coordinate pair
    Coordinates(Coordinates),
    /// Free text for the geocoder
    Text(String),
}

impl LocationQuery {
    pub fn parse(raw: &str) -> Self {
        let mut text = raw.trim();

        let lower = text.to_lowercase();
        for prefix in CLIENT_PREFIXES {
            if lower.starts_with(prefix) {
                // Prefixes are ASCII apart from "ü"; slice by the lowercase
                // prefix's char count to stay on a boundary.
                let skip = prefix.chars().count();
                let offset = text
                    .char_indices()
                    .nth(skip)
                    .map(|(i, _)| i)
                    .unwrap_or(text.len());
                text = text[offset..].trim();
                break;
            }
        }

        if let Some((first, _)) = text.split_once('&') {
            text = first.trim();
        }

        if text.is_empty() {
            return LocationQuery::Empty;
        }

        match parse_coordinates(text) {
            Some(coords) => LocationQuery::Coordinates(coords),
            None => LocationQuery::Text(text.to_string()),
        }
    }
}

fn coordinate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([+-]?\d{1,3}(?:\.\d+)?)\s*[,+\s]\s*([+-]?\d{1,3}(?:\.\d+)?)$")
            .expect("coordinate pattern is valid")
    })
}

/// Parse "lat,long", "lat long" or the URL-style "+lat+-long".
fn parse_coordinates(text: &str) -> Option<Coordinates> {
    let caps = coordinate_pattern().captures(text)?;
    let lat: f64 = caps.get(1)?.as_str().parse().ok()?;
    let long: f64 = caps.get(2)?.as_str().parse().ok()?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&long) {
        return None;
    }
    Some(Coordinates::new(lat, long))
}
