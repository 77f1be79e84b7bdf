// Data models: the profile and post records a comparison works on.
//
// These are immutable for the scope of one comparison. They derive serde so
// profile dumps can be read from disk without a separate DTO layer.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Static attributes of one account on one network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    /// Unique within the source network only
    pub user_id: String,
    pub display_name: String,
    pub gender: String,
    pub date_of_birth: String,
    /// Free text, as typed by the user
    pub current_location: String,
    /// Free text, as typed by the user
    pub home_location: String,
    pub languages: Vec<String>,
    pub education: BTreeSet<String>,
    pub employer: BTreeSet<String>,
    /// Friend display names in source order. Not stable ids.
    pub friends: Vec<String>,
}

/// A single post. `post_date` is optional because several networks omit it
/// for shared or pinned items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPost {
    pub user_id: String,
    pub post_id: String,
    pub post_text: String,
    pub post_date: Option<DateTime<Utc>>,
    pub place_of_post: String,
}

/// Everything known about one side of a comparison: which network it came
/// from, the profile, and its posts (newest first, as the source gave them).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileBundle {
    pub source_name: String,
    pub profile: UserProfile,
    pub posts: Vec<UserPost>,
}

impl ProfileBundle {
    pub fn new(source_name: impl Into<String>, profile: UserProfile, posts: Vec<UserPost>) -> Self {
        Self {
            source_name: source_name.into(),
            profile,
            posts,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.profile.user_id
    }
}

/// `network:user_id`, the way profiles are named on the command line and in
/// batch manifests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProfileRef {
    pub network: String,
    pub user_id: String,
}

impl FromStr for ProfileRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (network, user_id) = s
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("Expected network:user_id, got {s:?}"))?;
        let (network, user_id) = (network.trim(), user_id.trim());
        if network.is_empty() || user_id.is_empty() {
            anyhow::bail!("Expected network:user_id, got {s:?}");
        }
        Ok(Self {
            network: network.to_lowercase(),
            user_id: user_id.to_string(),
        })
    }
}

impl TryFrom<String> for ProfileRef {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProfileRef> for String {
    fn from(value: ProfileRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ProfileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.network, self.user_id)
    }
}
