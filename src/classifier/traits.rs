// Classifier port and the match classifier built on it.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use super::error::ClassifierError;
use super::svm::SvmModel;
use crate::scoring::features::FeatureVector;

/// Number of slots the classifier reads: the feature vector minus its label.
pub const INPUT_LEN: usize = 5;

/// Verdict for one pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    /// 1 = same person, 0 = different people
    pub label: u8,
    pub prob0: f64,
    pub prob1: f64,
}

impl Prediction {
    pub fn is_match(&self) -> bool {
        self.label == 1
    }
}

/// A pretrained binary classifier over the positional feature input
/// `[bias, topic, name, friend, distance]`.
pub trait Classifier: Send + Sync {
    fn predict(&self, input: &[f64; INPUT_LEN]) -> Result<Prediction, ClassifierError>;
}

impl Classifier for SvmModel {
    fn predict(&self, input: &[f64; INPUT_LEN]) -> Result<Prediction, ClassifierError> {
        let probs = self.probabilities(input)?;
        let labels = self.labels();

        let mut prob0 = None;
        let mut prob1 = None;
        for (label, p) in labels.iter().zip(probs) {
            match *label {
                0 => prob0 = Some(p),
                1 => prob1 = Some(p),
                _ => {}
            }
        }

        let (Some(prob0), Some(prob1)) = (prob0, prob1) else {
            return Err(ClassifierError::parse(
                0,
                format!("model labels {labels:?} are not 0 and 1"),
            ));
        };

        Ok(Prediction {
            label: if prob1 > prob0 { 1 } else { 0 },
            prob0,
            prob1,
        })
    }
}

/// A loaded classifier plus the name of the artifact it came from.
#[derive(Clone)]
pub struct MatchClassifier {
    model: Arc<dyn Classifier>,
    model_name: String,
}

impl MatchClassifier {
    pub fn new(model: Arc<dyn Classifier>, model_name: impl Into<String>) -> Self {
        Self {
            model,
            model_name: model_name.into(),
        }
    }

    /// Load a libsvm model artifact from disk.
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let model = SvmModel::load(path)?;
        if model.dimension() > INPUT_LEN {
            return Err(ClassifierError::Dimension {
                expected: model.dimension(),
                got: INPUT_LEN,
            });
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(Arc::new(model), name))
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Classify a pair from its feature vector. The label slot is dropped.
    pub fn classify(&self, features: &FeatureVector) -> Result<Prediction, ClassifierError> {
        self.model.predict(&features.classifier_input())
    }
}
