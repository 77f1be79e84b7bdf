use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::geo::google::DEFAULT_MAPS_API_URL;
use crate::services::ServiceGuard;
use crate::topics::SegmentParams;

/// File name of the pretrained match model.
pub const DEFAULT_MODEL_NAME: &str = "svm_last_linear_80_dist.train";

/// Upper bounds for the segment settings; a century of history at most.
const MAX_SEGMENTS: usize = 1_000;
const MAX_SEGMENT_DAYS: i64 = 36_500;

/// Central configuration loaded from environment variables.
///
/// Built once at startup (after dotenvy has read `.env`) and passed down;
/// no component reads the environment itself.
#[derive(Debug, Clone)]
pub struct Config {
    /// Google Maps key. Empty means every location stays unresolved.
    pub maps_api_key: String,
    pub maps_api_url: String,
    /// Root for segment artifacts and the model
    pub data_dir: PathBuf,
    /// Root of the `{network}/{user_id}.json` profile dumps
    pub profile_dir: PathBuf,
    pub model_path: PathBuf,
    pub db_path: String,
    pub segments: usize,
    pub segment_days: i64,
    /// K, the number of top keywords compared per segment
    pub top_keywords: usize,
    pub service_timeout: Duration,
    pub service_retries: u32,
    /// Also write segment text to disk
    pub persist_segments: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default. Numbers that don't parse are an error
    /// rather than silently falling back.
    pub fn load() -> Result<Self> {
        let data_dir = env::var("CROSSMATCH_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());

        let model_path = env::var("CROSSMATCH_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("svm").join("model").join(DEFAULT_MODEL_NAME));

        let config = Self {
            maps_api_key: env::var("GOOGLE_MAPS_API_KEY").unwrap_or_default(),
            maps_api_url: env::var("GOOGLE_MAPS_API_URL")
                .unwrap_or_else(|_| DEFAULT_MAPS_API_URL.to_string()),
            profile_dir: env::var("CROSSMATCH_PROFILE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./profiles")),
            model_path,
            db_path: env::var("CROSSMATCH_DB_PATH").unwrap_or_else(|_| "./crossmatch.db".to_string()),
            segments: parse_var("CROSSMATCH_SEGMENTS", 10)?,
            segment_days: parse_var("CROSSMATCH_SEGMENT_DAYS", 37)?,
            top_keywords: parse_var("CROSSMATCH_TOP_KEYWORDS", 50)?,
            service_timeout: Duration::from_secs(parse_var("CROSSMATCH_SERVICE_TIMEOUT_SECS", 10)?),
            service_retries: parse_var("CROSSMATCH_SERVICE_RETRIES", 1)?,
            persist_segments: env::var("CROSSMATCH_PERSIST_SEGMENTS")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            data_dir,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject segment and keyword settings the topic pipeline can't use.
    pub fn validate(&self) -> Result<()> {
        if self.segments == 0 || self.segments > MAX_SEGMENTS {
            anyhow::bail!(
                "CROSSMATCH_SEGMENTS must be between 1 and {MAX_SEGMENTS}, got {}",
                self.segments
            );
        }
        if self.segment_days <= 0 || self.segment_days > MAX_SEGMENT_DAYS {
            anyhow::bail!(
                "CROSSMATCH_SEGMENT_DAYS must be between 1 and {MAX_SEGMENT_DAYS}, got {}",
                self.segment_days
            );
        }
        if self.top_keywords == 0 {
            anyhow::bail!("CROSSMATCH_TOP_KEYWORDS must be at least 1");
        }
        Ok(())
    }

    pub fn segment_params(&self) -> SegmentParams {
        SegmentParams {
            segments: self.segments,
            segment_days: self.segment_days,
        }
    }

    pub fn service_guard(&self) -> ServiceGuard {
        ServiceGuard::new(self.service_timeout, self.service_retries)
    }

    /// Where segment text goes when persistence is on.
    pub fn segment_dir(&self) -> PathBuf {
        self.data_dir.join("topic_models")
    }

    pub fn has_geocoder(&self) -> bool {
        !self.maps_api_key.is_empty()
    }

    /// Check that the match model exists.
    /// Call this before anything that needs a verdict.
    pub fn require_model(&self) -> Result<()> {
        if !self.model_path.exists() {
            anyhow::bail!(
                "Match model not found at {}\n\
                 Set CROSSMATCH_MODEL_PATH or place {DEFAULT_MODEL_NAME} under {}.",
                self.model_path.display(),
                self.data_dir.join("svm").join("model").display()
            );
        }
        Ok(())
    }

    /// Check that a Google Maps key is configured.
    /// Only the `route` command needs it; distances degrade without it.
    pub fn require_maps(&self) -> Result<()> {
        if self.maps_api_key.is_empty() {
            anyhow::bail!(
                "GOOGLE_MAPS_API_KEY not set. Add it to your .env file.\n\
                 Without it every location is treated as unresolvable."
            );
        }
        Ok(())
    }
}

/// Platform data directory, e.g. ~/.local/share/crossmatch on Linux.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crossmatch")
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a number, got {raw:?}")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_data_dir_ends_with_crate_name() {
        assert!(default_data_dir().ends_with("crossmatch"));
    }

    #[test]
    fn test_parse_var_default_when_unset() {
        let v: usize = parse_var("CROSSMATCH_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(v, 7);
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        env::set_var("CROSSMATCH_TEST_GARBAGE_VARIABLE", "ten");
        let v: Result<usize> = parse_var("CROSSMATCH_TEST_GARBAGE_VARIABLE", 10);
        assert!(v.is_err());
        env::remove_var("CROSSMATCH_TEST_GARBAGE_VARIABLE");
    }

    fn sample() -> Config {
        Config {
            maps_api_key: String::new(),
            maps_api_url: DEFAULT_MAPS_API_URL.to_string(),
            data_dir: PathBuf::from("/tmp/cm"),
            profile_dir: PathBuf::from("./profiles"),
            model_path: PathBuf::from("/nonexistent/model.train"),
            db_path: ":memory:".to_string(),
            segments: 4,
            segment_days: 30,
            top_keywords: 20,
            service_timeout: Duration::from_secs(3),
            service_retries: 2,
            persist_segments: false,
        }
    }

    #[test]
    fn test_derived_params() {
        let config = sample();
        assert!(config.validate().is_ok());
        assert_eq!(config.segment_params(), SegmentParams { segments: 4, segment_days: 30 });
        assert_eq!(config.service_guard().retries, 2);
        assert_eq!(config.segment_dir(), PathBuf::from("/tmp/cm/topic_models"));
        assert!(!config.has_geocoder());
        assert!(config.require_model().is_err());
        assert!(config.require_maps().is_err());
    }

    #[test]
    fn test_rejects_unusable_segment_days() {
        for days in [0, -5, 36_501, i64::MAX] {
            let config = Config { segment_days: days, ..sample() };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("CROSSMATCH_SEGMENT_DAYS"), "{days}: {err}");
        }
    }

    #[test]
    fn test_rejects_zero_segments() {
        let config = Config { segments: 0, ..sample() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_keywords() {
        let config = Config { top_keywords: 0, ..sample() };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CROSSMATCH_TOP_KEYWORDS"));
    }
}
