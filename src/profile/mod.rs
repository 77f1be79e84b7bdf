// Profile data: what one network tells us about one account.
//
// Acquiring this data (crawling, API calls) happens elsewhere; the core only
// consumes already-fetched profiles through the ProfileSource port.

pub mod models;
pub mod source;

pub use models::{ProfileBundle, ProfileRef, UserPost, UserProfile};
pub use source::{JsonProfileSource, ProfileSource};
