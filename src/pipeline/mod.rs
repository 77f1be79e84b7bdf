// Pair evaluation: single pairs and concurrent batches.

pub mod batch;
pub mod evaluator;

pub use evaluator::{ClassifierState, PairEvaluator, PairNote, PairOutcome};
