// Scoring: the pure per-signal scorers and the feature vector they feed.

pub mod features;
pub mod friends;
pub mod name;
