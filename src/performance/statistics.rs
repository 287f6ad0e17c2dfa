use crate::zip_iters;

#[derive(Debug, Default, Clone, Copy)]
pub struct ConfusionMatrix {
    pub true_p: f32,
    pub true_n: f32,
    pub false_p: f32,
    pub false_n: f32,
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &[i16], y_pred: &[i16]) -> ConfusionMatrix {
        let mut confusion = ConfusionMatrix::default();
        for (t, p) in zip_iters!(y_true, y_pred) {
            confusion.true_p += (*t == 1 && *p == 1) as usize as f32;
            confusion.true_n += (*t == 0 && *p == 0) as usize as f32;
            confusion.false_p += (*t == 0 && *p == 1) as usize as f32;
            confusion.false_n += (*t == 1 && *p == 0) as usize as f32;
        }
        confusion
    }

    pub fn total(&self) -> f32 {
        self.true_p + self.true_n + self.false_p + self.false_n
    }
}

/// All metrics return 0 on a degenerate denominator rather than NaN.

#[inline]
pub(crate) fn accuracy(confusion: &ConfusionMatrix) -> f32 {
    ratio(confusion.true_p + confusion.true_n, confusion.total())
}

/// TP / (TP + FP)
#[inline]
pub(crate) fn precision_positive(confusion: &ConfusionMatrix) -> f32 {
    ratio(confusion.true_p, confusion.true_p + confusion.false_p)
}

/// TP / (TP + FN)
#[inline]
pub(crate) fn recall_positive(confusion: &ConfusionMatrix) -> f32 {
    ratio(confusion.true_p, confusion.true_p + confusion.false_n)
}

#[inline]
pub(crate) fn f1_score(confusion: &ConfusionMatrix) -> f32 {
    let precision = precision_positive(confusion);
    let recall = recall_positive(confusion);
    ratio(2.0 * precision * recall, precision + recall)
}

/// TP / (TP + FN), the per-group rate equalized odds compares.
#[inline]
pub(crate) fn true_positive_rate(confusion: &ConfusionMatrix) -> f32 {
    recall_positive(confusion)
}

/// FP / (FP + TN)
#[inline]
pub(crate) fn false_positive_rate(confusion: &ConfusionMatrix) -> f32 {
    ratio(confusion.false_p, confusion.false_p + confusion.true_n)
}

#[inline]
fn ratio(numerator: f32, denominator: f32) -> f32 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
