// Row schemas for the two report sheets written per pair.
//
//   Profile_{src1}_{src2}
//     {src1}_id, {src1}_name, {src1}_current_location, {src1}_home_location,
//     {src2}_id, ... (same four for the second side)
//
//   svm_prediction_output_{src1}_{src2}
//     {src1} id, {src2} id, Probability of '1', Probability of '0',
//     Prediction, then the four feature values, the topic status and notes.
//
// A pair without a verdict (classifier unavailable) still gets a prediction
// row, with the three verdict cells null.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::classifier::Prediction;
use crate::profile::ProfileBundle;
use crate::scoring::features::FeatureVector;

/// One scalar cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportValue {
    Text(String),
    Int(i64),
    Real(f64),
    Null,
}

impl ReportValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ReportValue::Real(v) => Some(*v),
            ReportValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ReportValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ReportValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportValue::Text(s) => write!(f, "{s}"),
            ReportValue::Int(v) => write!(f, "{v}"),
            ReportValue::Real(v) => write!(f, "{v:.4}"),
            ReportValue::Null => write!(f, "-"),
        }
    }
}

impl From<&str> for ReportValue {
    fn from(value: &str) -> Self {
        ReportValue::Text(value.to_string())
    }
}

impl From<String> for ReportValue {
    fn from(value: String) -> Self {
        ReportValue::Text(value)
    }
}

impl From<f64> for ReportValue {
    fn from(value: f64) -> Self {
        ReportValue::Real(value)
    }
}

impl From<i64> for ReportValue {
    fn from(value: i64) -> Self {
        ReportValue::Int(value)
    }
}

impl<T: Into<ReportValue>> From<Option<T>> for ReportValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ReportValue::Null)
    }
}

pub const PREDICTION_SHEET_PREFIX: &str = "svm_prediction_output_";
pub const PROBABILITY_1: &str = "Probability of '1'";
pub const PROBABILITY_0: &str = "Probability of '0'";
pub const PREDICTION: &str = "Prediction";
pub const TOPIC_SIMILARITY: &str = "Topic similarity";
pub const NAME_SIMILARITY: &str = "Name similarity";
pub const FRIEND_SIMILARITY: &str = "Friend similarity";
pub const BEST_DISTANCE: &str = "Best distance";
pub const TOPIC_STATUS: &str = "Topic status";
pub const NOTES: &str = "Notes";

pub fn profile_sheet(src1: &str, src2: &str) -> String {
    format!("Profile_{src1}_{src2}")
}

pub fn profile_columns(src1: &str, src2: &str) -> Vec<String> {
    [src1, src2]
        .iter()
        .flat_map(|src| {
            [
                format!("{src}_id"),
                format!("{src}_name"),
                format!("{src}_current_location"),
                format!("{src}_home_location"),
            ]
        })
        .collect()
}

pub fn profile_row(first: &ProfileBundle, second: &ProfileBundle) -> Vec<ReportValue> {
    [first, second]
        .iter()
        .flat_map(|b| {
            [
                ReportValue::from(b.profile.user_id.as_str()),
                ReportValue::from(b.profile.display_name.as_str()),
                ReportValue::from(b.profile.current_location.as_str()),
                ReportValue::from(b.profile.home_location.as_str()),
            ]
        })
        .collect()
}

pub fn prediction_sheet(src1: &str, src2: &str) -> String {
    format!("{PREDICTION_SHEET_PREFIX}{src1}_{src2}")
}

pub fn prediction_columns(src1: &str, src2: &str) -> Vec<String> {
    vec![
        format!("{src1} id"),
        format!("{src2} id"),
        PROBABILITY_1.to_string(),
        PROBABILITY_0.to_string(),
        PREDICTION.to_string(),
        TOPIC_SIMILARITY.to_string(),
        NAME_SIMILARITY.to_string(),
        FRIEND_SIMILARITY.to_string(),
        BEST_DISTANCE.to_string(),
        TOPIC_STATUS.to_string(),
        NOTES.to_string(),
    ]
}

pub fn prediction_row(
    first_id: &str,
    second_id: &str,
    prediction: Option<&Prediction>,
    features: &FeatureVector,
    topic_status: &str,
    notes: &str,
) -> Vec<ReportValue> {
    vec![
        first_id.into(),
        second_id.into(),
        prediction.map(|p| p.prob1).into(),
        prediction.map(|p| p.prob0).into(),
        prediction.map(|p| p.label as i64).into(),
        features.topic_similarity.into(),
        features.name_similarity.into(),
        features.friend_similarity.into(),
        features.best_distance.into(),
        topic_status.into(),
        notes.into(),
    ]
}
