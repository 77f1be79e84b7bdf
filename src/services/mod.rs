// External service plumbing shared by the geocoding and topic-model ports.

pub mod guard;

pub use guard::ServiceGuard;
