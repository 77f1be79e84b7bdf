// Match classification: a pretrained binary classifier over the feature
// vector.
//
// The model is an external artifact trained elsewhere; only its prediction
// contract lives here. The Classifier trait is the port, SvmModel evaluates
// libsvm text-format models natively, and MatchClassifier ties a loaded
// model to the feature vector layout.

pub mod error;
pub mod svm;
pub mod traits;

pub use error::ClassifierError;
pub use svm::{Kernel, SvmModel};
pub use traits::{Classifier, MatchClassifier, Prediction};
