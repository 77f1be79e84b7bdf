// Location resolution and distance: free-text locations to a best distance.
//
// Geocoding and route distance are external services behind traits; the
// resolver owns only the text normalization, the short-circuits and the
// sentinel policy.

pub mod google;
pub mod location;
pub mod resolver;
pub mod traits;

pub use location::{Coordinates, LocationQuery};
pub use resolver::{DistanceReport, GeoDistanceResolver, UNKNOWN_DISTANCE};
pub use traits::{GeocodingService, NoopGeocoder, RouteDistanceService};
