// Crossmatch: cross-network identity resolution for social profiles
//
// This is the library root. Each module corresponds to a stage of the
// pair-evaluation pipeline or one of the external-service ports it uses.

pub mod classifier;
pub mod config;
pub mod geo;
pub mod output;
pub mod pipeline;
pub mod profile;
pub mod report;
pub mod scoring;
pub mod services;
pub mod status;
pub mod topics;
