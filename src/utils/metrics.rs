//! Metrics Module for Detector Evaluation
//!
//! Binary confusion matrix over [`Label`] with accuracy, precision, recall
//! and F1. `Generated` is treated as the positive class.

use serde::{Deserialize, Serialize};

use crate::dataset::Label;

/// Confusion matrix for the real/generated task
///
/// Rows are the actual label, columns the predicted label, both indexed by
/// [`Label::index`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub matrix: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    /// Create an empty matrix
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a matrix from paired predictions and ground truth
    pub fn from_predictions(predictions: &[Label], ground_truth: &[Label]) -> Self {
        let mut cm = Self::new();
        cm.extend(predictions, ground_truth);
        cm
    }

    /// Add a single prediction
    pub fn add(&mut self, actual: Label, predicted: Label) {
        self.matrix[actual.index()][predicted.index()] += 1;
    }

    /// Add a batch of predictions
    pub fn extend(&mut self, predictions: &[Label], ground_truth: &[Label]) {
        for (&predicted, &actual) in predictions.iter().zip(ground_truth.iter()) {
            self.add(actual, predicted);
        }
    }

    /// Count at (actual, predicted)
    pub fn get(&self, actual: Label, predicted: Label) -> usize {
        self.matrix[actual.index()][predicted.index()]
    }

    pub fn true_positives(&self) -> usize {
        self.get(Label::Generated, Label::Generated)
    }

    pub fn false_positives(&self) -> usize {
        self.get(Label::Real, Label::Generated)
    }

    pub fn false_negatives(&self) -> usize {
        self.get(Label::Generated, Label::Real)
    }

    pub fn true_negatives(&self) -> usize {
        self.get(Label::Real, Label::Real)
    }

    /// Total number of predictions recorded
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Number of correct predictions (diagonal sum)
    pub fn correct(&self) -> usize {
        self.true_positives() + self.true_negatives()
    }

    /// Overall accuracy in [0, 1]
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// Precision = TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives(), self.true_positives() + self.false_positives())
    }

    /// Recall = TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives(), self.true_positives() + self.false_negatives())
    }

    /// F1 = 2 * (precision * recall) / (precision + recall)
    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r > 0.0 {
            2.0 * p * r / (p + r)
        } else {
            0.0
        }
    }

    /// Render the matrix as a small text table
    pub fn display(&self) -> String {
        let mut output = String::new();
        output.push_str("                 predicted real   predicted generated\n");
        output.push_str(&format!(
            "actual real      {:>14}   {:>19}\n",
            self.true_negatives(),
            self.false_positives()
        ));
        output.push_str(&format!(
            "actual generated {:>14}   {:>19}\n",
            self.false_negatives(),
            self.true_positives()
        ));
        output
    }
}

impl std::fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator > 0 {
        numerator as f64 / denominator as f64
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use Label::{Generated, Real};

    #[test]
    fn test_confusion_matrix_counts() {
        let predictions = [Real, Generated, Generated, Real, Generated];
        let truth = [Real, Generated, Real, Generated, Generated];

        let cm = ConfusionMatrix::from_predictions(&predictions, &truth);

        assert_eq!(cm.total(), 5);
        assert_eq!(cm.true_positives(), 2);
        assert_eq!(cm.true_negatives(), 1);
        assert_eq!(cm.false_positives(), 1);
        assert_eq!(cm.false_negatives(), 1);
        assert_eq!(cm.correct(), 3);
        assert!((cm.accuracy() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_precision_recall_f1() {
        let predictions = [Generated, Generated, Generated, Real];
        let truth = [Generated, Generated, Real, Generated];

        let cm = ConfusionMatrix::from_predictions(&predictions, &truth);

        assert!((cm.precision() - 2.0 / 3.0).abs() < 1e-9);
        assert!((cm.recall() - 2.0 / 3.0).abs() < 1e-9);
        assert!((cm.f1() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_matrix_is_zero() {
        let cm = ConfusionMatrix::new();
        assert_eq!(cm.accuracy(), 0.0);
        assert_eq!(cm.precision(), 0.0);
        assert_eq!(cm.f1(), 0.0);
    }
}
