// ProfileSource port and the file-backed implementation used by the CLI.
//
// Live crawling is an external concern. The CLI reads profile dumps that a
// crawler wrote to `{root}/{network}/{user_id}.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::models::{ProfileBundle, ProfileRef, UserPost, UserProfile};

/// Where profiles and posts come from.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, network: &str, user_id: &str) -> Result<UserProfile>;

    /// Posts in source order (assumed newest first).
    async fn fetch_posts(&self, network: &str, user_id: &str) -> Result<Vec<UserPost>>;

    /// Fetch both halves of a bundle.
    async fn fetch_bundle(&self, profile_ref: &ProfileRef) -> Result<ProfileBundle> {
        let profile = self
            .fetch_profile(&profile_ref.network, &profile_ref.user_id)
            .await?;
        let posts = self
            .fetch_posts(&profile_ref.network, &profile_ref.user_id)
            .await?;
        Ok(ProfileBundle::new(&profile_ref.network, profile, posts))
    }
}

/// On-disk dump format: one file per account.
#[derive(Debug, Deserialize)]
struct ProfileDump {
    profile: UserProfile,
    #[serde(default)]
    posts: Vec<UserPost>,
}

/// Reads JSON profile dumps from a directory tree.
pub struct JsonProfileSource {
    root: PathBuf,
}

impl JsonProfileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `{root}/{network}/{user_id}.json`
    pub fn dump_path(&self, network: &str, user_id: &str) -> PathBuf {
        self.root.join(network).join(format!("{user_id}.json"))
    }

    fn read_dump(&self, network: &str, user_id: &str) -> Result<ProfileDump> {
        let path = self.dump_path(network, user_id);
        read_dump_file(&path)
    }
}

fn read_dump_file(path: &Path) -> Result<ProfileDump> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile dump {}", path.display()))?;
    let dump: ProfileDump = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse profile dump {}", path.display()))?;

    debug!(
        path = %path.display(),
        posts = dump.posts.len(),
        friends = dump.profile.friends.len(),
        "Loaded profile dump"
    );
    Ok(dump)
}

#[async_trait]
impl ProfileSource for JsonProfileSource {
    async fn fetch_profile(&self, network: &str, user_id: &str) -> Result<UserProfile> {
        let mut profile = self.read_dump(network, user_id)?.profile;
        if profile.user_id.is_empty() {
            profile.user_id = user_id.to_string();
        }
        Ok(profile)
    }

    async fn fetch_posts(&self, network: &str, user_id: &str) -> Result<Vec<UserPost>> {
        let mut posts = self.read_dump(network, user_id)?.posts;
        fill_post_owner(&mut posts, user_id);
        Ok(posts)
    }

    async fn fetch_bundle(&self, profile_ref: &ProfileRef) -> Result<ProfileBundle> {
        // One read instead of two
        let dump = self.read_dump(&profile_ref.network, &profile_ref.user_id)?;
        let mut profile = dump.profile;
        if profile.user_id.is_empty() {
            profile.user_id = profile_ref.user_id.clone();
        }
        let mut posts = dump.posts;
        fill_post_owner(&mut posts, &profile.user_id);
        Ok(ProfileBundle::new(&profile_ref.network, profile, posts))
    }
}

/// Posts in a dump may omit user_id; they all belong to the dumped account.
fn fill_post_owner(posts: &mut [UserPost], user_id: &str) {
    for post in posts.iter_mut().filter(|p| p.user_id.is_empty()) {
        post.user_id = user_id.to_string();
    }
}
