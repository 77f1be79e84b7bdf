// Unit tests for the libsvm-backed match classifier.

use std::path::PathBuf;

use crossmatch::classifier::{Classifier, ClassifierError, MatchClassifier, SvmModel};
use crossmatch::scoring::features::FeatureVector;

/// Linear model that only looks at the name slot (index 3):
/// dec = 2 * name - 1, P(label 1) = 1 / (1 + exp(-2 * dec))
const NAME_ONLY: &str = "\
svm_type c_svc
kernel_type linear
nr_class 2
total_sv 1
rho 1
label 1 0
probA -2
probB 0
nr_sv 1 0
SV
2 3:1
";

fn write_model(name: &str, text: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("crossmatch-classifier-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn classifier_reads_name_slot_positionally() {
    let path = write_model("name_only.train", NAME_ONLY);
    let classifier = MatchClassifier::load(&path).unwrap();
    assert_eq!(classifier.model_name(), "name_only.train");

    let same = classifier
        .classify(&FeatureVector::new(-1.0, 1.0, 0.0, -1.0))
        .unwrap();
    assert_eq!(same.label, 1);
    let expected = 1.0 / (1.0 + (-2.0f64).exp());
    assert!((same.prob1 - expected).abs() < 1e-12);
    assert!((same.prob0 + same.prob1 - 1.0).abs() < 1e-12);

    // Same vector with name and friend swapped flips the verdict
    let swapped = classifier
        .classify(&FeatureVector::new(-1.0, 0.0, 1.0, -1.0))
        .unwrap();
    assert_eq!(swapped.label, 0);
    assert!(swapped.prob0 > swapped.prob1);
}

#[test]
fn label_slot_is_not_sent_to_the_model() {
    let model: SvmModel = NAME_ONLY.parse().unwrap();
    let v = FeatureVector::new(0.5, 0.75, 0.25, 3.0);
    let direct = model.predict(&v.classifier_input()).unwrap();
    let via_wrapper = MatchClassifier::new(std::sync::Arc::new(model), "m").classify(&v).unwrap();
    assert_eq!(direct, via_wrapper);
}

#[test]
fn missing_model_is_load_error() {
    let err = MatchClassifier::load(&PathBuf::from("/nonexistent/svm_last_linear_80_dist.train"))
        .err()
        .unwrap();
    assert!(matches!(err, ClassifierError::Load { .. }));
    assert!(err.to_string().contains("svm_last_linear_80_dist.train"));
}

#[test]
fn corrupt_model_is_parse_error() {
    let path = write_model("corrupt.train", "svm_type c_svc\nkernel_type linear\nthis is not a model\n");
    let err = MatchClassifier::load(&path).err().unwrap();
    assert!(matches!(err, ClassifierError::Parse { line: 3, .. }));
}

#[test]
fn model_wider_than_feature_vector_is_rejected() {
    let path = write_model("wide.train", &NAME_ONLY.replace("2 3:1", "2 6:1"));
    let err = MatchClassifier::load(&path).err().unwrap();
    assert!(matches!(err, ClassifierError::Dimension { expected: 6, got: 5 }));
}

#[test]
fn multiclass_models_are_rejected() {
    let text = NAME_ONLY.replace("nr_class 2", "nr_class 3");
    assert!(matches!(
        text.parse::<SvmModel>(),
        Err(ClassifierError::Parse { .. })
    ));
}

#[test]
fn polynomial_kernel_is_evaluated() {
    let text = NAME_ONLY.replace(
        "kernel_type linear",
        "kernel_type polynomial\ndegree 2\ngamma 1\ncoef0 1",
    );
    let model: SvmModel = text.parse().unwrap();
    // (1 * name + 1)^2 with name = 1 -> 4; dec = 2 * 4 - 1 = 7
    let dec = model.decision_value(&[0.0, 0.0, 1.0, 0.0, 0.0]).unwrap();
    assert!((dec - 7.0).abs() < 1e-12);
}
