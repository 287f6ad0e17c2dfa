use crate::errors::ModelError;
use crate::model::Predictor;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub(crate) mod statistics;

pub use statistics::ConfusionMatrix;

/// Analysis report mapping each metric to its value on the evaluated slice.
pub type PerformanceReport = HashMap<PerformanceMetric, f32>;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PerformanceMetric {
    Accuracy,
    Precision,
    Recall,
    F1Score,
}

pub const FULL_PERFORMANCE_METRICS: [PerformanceMetric; 4] = [
    PerformanceMetric::Accuracy,
    PerformanceMetric::Precision,
    PerformanceMetric::Recall,
    PerformanceMetric::F1Score,
];

impl std::fmt::Display for PerformanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Accuracy => write!(f, "Accuracy"),
            Self::Precision => write!(f, "Precision"),
            Self::Recall => write!(f, "Recall"),
            Self::F1Score => write!(f, "F1Score"),
        }
    }
}

impl TryFrom<&str> for PerformanceMetric {
    type Error = String;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Accuracy" => Ok(Self::Accuracy),
            "Precision" => Ok(Self::Precision),
            "Recall" => Ok(Self::Recall),
            "F1Score" => Ok(Self::F1Score),
            _ => Err("Invalid metric name passed".into()),
        }
    }
}

/// Hard predictions on the evaluation slice plus the four scalar metrics,
/// all computed against the positive class.
pub fn evaluate(
    model: &dyn Predictor,
    features: &Array2<f32>,
    labels: &[i16],
) -> Result<(PerformanceReport, Vec<i16>), ModelError> {
    if features.nrows() != labels.len() {
        return Err(ModelError::RowCountMismatch);
    }
    let predicted = model.predict(features);
    let report = performance_report(labels, &predicted)?;
    Ok((report, predicted))
}

pub fn performance_report(y_true: &[i16], y_pred: &[i16]) -> Result<PerformanceReport, ModelError> {
    if y_true.len() != y_pred.len() {
        return Err(ModelError::RowCountMismatch);
    }
    if y_true.is_empty() {
        return Err(ModelError::EmptyPartition);
    }

    let confusion = ConfusionMatrix::from_labels(y_true, y_pred);
    let mut report = PerformanceReport::with_capacity(FULL_PERFORMANCE_METRICS.len());
    for metric in FULL_PERFORMANCE_METRICS {
        let value = match metric {
            PerformanceMetric::Accuracy => statistics::accuracy(&confusion),
            PerformanceMetric::Precision => statistics::precision_positive(&confusion),
            PerformanceMetric::Recall => statistics::recall_positive(&confusion),
            PerformanceMetric::F1Score => statistics::f1_score(&confusion),
        };
        report.insert(metric, value);
    }
    Ok(report)
}
