//! Evaluation of predicted labels against the true labels.

use core::fmt;

use crate::pipeline::Label;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl ClassMetrics {
    fn new(true_positive: usize, false_positive: usize, false_negative: usize) -> Self {
        let precision = ratio(true_positive, true_positive + false_positive);
        let recall = ratio(true_positive, true_positive + false_negative);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
            support: true_positive + false_negative,
        }
    }
}

/// Confusion counts with fake as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConfusionMatrix {
    pub true_fake: usize,
    pub false_fake: usize,
    pub true_real: usize,
    pub false_real: usize,
}

impl ConfusionMatrix {
    fn record(&mut self, actual: Label, predicted: Label) {
        match (actual, predicted) {
            (Label::Fake, Label::Fake) => self.true_fake += 1,
            (Label::Real, Label::Fake) => self.false_fake += 1,
            (Label::Real, Label::Real) => self.true_real += 1,
            (Label::Fake, Label::Real) => self.false_real += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.true_fake + self.false_fake + self.true_real + self.false_real
    }
}

/// Accuracy, per-class and macro-averaged scores for a set of predictions.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub fake: ClassMetrics,
    pub real: ClassMetrics,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    pub confusion: ConfusionMatrix,
}

impl ClassificationReport {
    /// Build the report from paired true and predicted labels.
    ///
    /// Scores with an empty denominator are reported as 0.
    #[must_use]
    pub fn from_labels(actual: &[Label], predicted: &[Label]) -> Self {
        let mut confusion = ConfusionMatrix::default();
        for (&a, &p) in actual.iter().zip(predicted) {
            confusion.record(a, p);
        }

        let fake = ClassMetrics::new(confusion.true_fake, confusion.false_fake, confusion.false_real);
        let real = ClassMetrics::new(confusion.true_real, confusion.false_real, confusion.false_fake);
        Self {
            accuracy: ratio(confusion.true_fake + confusion.true_real, confusion.total()),
            macro_precision: (fake.precision + real.precision) / 2.0,
            macro_recall: (fake.recall + real.recall) / 2.0,
            macro_f1: (fake.f1 + real.f1) / 2.0,
            fake,
            real,
            confusion,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for (name, m) in [("fake", &self.fake), ("real", &self.real)] {
            writeln!(
                f,
                "{name:>12} {:>10.4} {:>10.4} {:>10.4} {:>10}",
                m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10.4} {:>10}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.confusion.total()
        )?;
        writeln!(
            f,
            "{:>12} {:>10.4} {:>10.4} {:>10.4} {:>10}",
            "macro avg",
            self.macro_precision,
            self.macro_recall,
            self.macro_f1,
            self.confusion.total()
        )?;
        writeln!(f)?;
        writeln!(f, "confusion matrix (rows: actual, columns: predicted fake/real)")?;
        writeln!(
            f,
            "{:>12} {:>10} {:>10}",
            "fake", self.confusion.true_fake, self.confusion.false_real
        )?;
        write!(
            f,
            "{:>12} {:>10} {:>10}",
            "real", self.confusion.false_fake, self.confusion.true_real
        )
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Label::{Fake, Real};

    #[test]
    fn test_report_arithmetic() {
        let actual = [Fake, Fake, Fake, Real, Real];
        let predicted = [Fake, Fake, Real, Real, Fake];
        let report = ClassificationReport::from_labels(&actual, &predicted);

        assert_eq!(report.confusion, ConfusionMatrix {
            true_fake: 2,
            false_fake: 1,
            true_real: 1,
            false_real: 1,
        });
        assert!((report.accuracy - 0.6).abs() < 1e-12);
        assert!((report.fake.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((report.fake.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((report.real.precision - 0.5).abs() < 1e-12);
        assert!((report.real.recall - 0.5).abs() < 1e-12);
        assert_eq!(report.fake.support, 3);
        assert_eq!(report.real.support, 2);
        assert!((report.macro_f1 - (2.0 / 3.0 + 0.5) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_perfect_predictions() {
        let labels = [Fake, Real, Real];
        let report = ClassificationReport::from_labels(&labels, &labels);
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.macro_f1, 1.0);
    }

    #[test]
    fn test_missing_class_scores_zero() {
        let report = ClassificationReport::from_labels(&[Real, Real], &[Real, Real]);
        assert_eq!(report.fake.precision, 0.0);
        assert_eq!(report.fake.f1, 0.0);
        assert_eq!(report.fake.support, 0);
        assert_eq!(report.real.f1, 1.0);
    }

    #[test]
    fn test_display_lists_both_classes() {
        let report = ClassificationReport::from_labels(&[Fake, Real], &[Fake, Fake]);
        let text = report.to_string();
        assert!(text.contains("fake"));
        assert!(text.contains("real"));
        assert!(text.contains("macro avg"));
    }
}
