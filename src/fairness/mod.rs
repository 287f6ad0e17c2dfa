use crate::errors::FairnessError;
use crate::performance::ConfusionMatrix;
use crate::zip_iters;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub(crate) mod statistics;

/// Analysis report mapping each fairness metric to its value on the
/// evaluated slice. DisparateImpact is a ratio (ideal 1); the others are
/// differences (ideal 0).
pub type FairnessReport = HashMap<FairnessMetric, f32>;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FairnessMetric {
    DemographicParityDifference,
    DisparateImpact,
    EqualizedOddsDifference,
}

pub const FULL_FAIRNESS_METRICS: [FairnessMetric; 3] = [
    FairnessMetric::DemographicParityDifference,
    FairnessMetric::DisparateImpact,
    FairnessMetric::EqualizedOddsDifference,
];

impl std::fmt::Display for FairnessMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::DemographicParityDifference => write!(f, "DemographicParityDifference"),
            Self::DisparateImpact => write!(f, "DisparateImpact"),
            Self::EqualizedOddsDifference => write!(f, "EqualizedOddsDifference"),
        }
    }
}

impl TryFrom<&str> for FairnessMetric {
    type Error = String;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "DemographicParityDifference" => Ok(Self::DemographicParityDifference),
            "DisparateImpact" => Ok(Self::DisparateImpact),
            "EqualizedOddsDifference" => Ok(Self::EqualizedOddsDifference),
            _ => Err("Invalid metric name passed".into()),
        }
    }
}

/// Predicted and true outcomes of one sensitive group.
pub struct GroupOutcomes {
    pub value: String,
    pub confusion: ConfusionMatrix,
    pub positive_pred: f32,
    pub size: f32,
}

impl GroupOutcomes {
    pub fn positive_rate(&self) -> f32 {
        if self.size == 0.0 {
            0.0
        } else {
            self.positive_pred / self.size
        }
    }
}

/// Splits the slice into per-group outcome tallies, one per distinct value
/// of the sensitive attribute.
pub fn segment_groups<S: AsRef<str>>(
    y_true: &[i16],
    y_pred: &[i16],
    sensitive: &[S],
) -> Result<Vec<GroupOutcomes>, FairnessError> {
    if y_true.len() != y_pred.len() || y_true.len() != sensitive.len() {
        return Err(FairnessError::LengthMismatch);
    }

    let mut by_value: AHashMap<&str, (Vec<i16>, Vec<i16>)> = AHashMap::new();
    for (s, (t, p)) in zip_iters!(sensitive, y_true, y_pred) {
        let entry = by_value.entry(s.as_ref()).or_default();
        entry.0.push(*t);
        entry.1.push(*p);
    }

    if by_value.len() < 2 {
        return Err(FairnessError::SingleGroup);
    }

    let mut groups: Vec<GroupOutcomes> = by_value
        .into_iter()
        .map(|(value, (trues, preds))| GroupOutcomes {
            value: value.to_string(),
            confusion: ConfusionMatrix::from_labels(&trues, &preds),
            positive_pred: preds.iter().map(|&p| f32::from(p)).sum(),
            size: preds.len() as f32,
        })
        .collect();
    groups.sort_by(|a, b| a.value.cmp(&b.value));
    Ok(groups)
}

/// Group fairness of a prediction slice against one sensitive attribute.
/// Requires at least two distinct groups; the metrics are undefined
/// otherwise.
pub fn compute_fairness<S: AsRef<str>>(
    y_true: &[i16],
    y_pred: &[i16],
    sensitive: &[S],
) -> Result<FairnessReport, FairnessError> {
    let groups = segment_groups(y_true, y_pred, sensitive)?;

    let mut report = FairnessReport::with_capacity(FULL_FAIRNESS_METRICS.len());
    for metric in FULL_FAIRNESS_METRICS {
        let value = match metric {
            FairnessMetric::DemographicParityDifference => {
                statistics::demographic_parity_difference(&groups)
            }
            FairnessMetric::DisparateImpact => statistics::disparate_impact(&groups),
            FairnessMetric::EqualizedOddsDifference => {
                statistics::equalized_odds_difference(&groups)
            }
        };
        report.insert(metric, value);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn equal_rates_mean_zero_difference_and_unit_impact() {
        let y_true = vec![1, 0, 1, 0, 1, 0, 1, 0];
        let y_pred = vec![1, 0, 1, 0, 1, 0, 1, 0];
        let sensitive = attr(&["a", "a", "a", "a", "b", "b", "b", "b"]);
        let report = compute_fairness(&y_true, &y_pred, &sensitive).unwrap();

        assert!(report[&FairnessMetric::DemographicParityDifference].abs() < 1e-6);
        assert!((report[&FairnessMetric::DisparateImpact] - 1.0).abs() < 1e-6);
        assert!(report[&FairnessMetric::EqualizedOddsDifference].abs() < 1e-6);
    }

    #[test]
    fn skewed_selection_is_measured() {
        // group a selected at 1.0, group b at 0.25
        let y_true = vec![1, 1, 1, 1, 1, 1, 1, 1];
        let y_pred = vec![1, 1, 1, 1, 1, 0, 0, 0];
        let sensitive = attr(&["a", "a", "a", "a", "b", "b", "b", "b"]);
        let report = compute_fairness(&y_true, &y_pred, &sensitive).unwrap();

        assert!((report[&FairnessMetric::DemographicParityDifference] - 0.75).abs() < 1e-6);
        assert!((report[&FairnessMetric::DisparateImpact] - 0.25).abs() < 1e-6);
        // everyone is a positive, so the TPR gap equals the selection gap
        assert!((report[&FairnessMetric::EqualizedOddsDifference] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn no_positive_predictions_anywhere_gives_zero_impact() {
        let y_true = vec![1, 0, 1, 0];
        let y_pred = vec![0, 0, 0, 0];
        let sensitive = attr(&["a", "a", "b", "b"]);
        let report = compute_fairness(&y_true, &y_pred, &sensitive).unwrap();
        assert_eq!(report[&FairnessMetric::DisparateImpact], 0.0);
        assert_eq!(report[&FairnessMetric::DemographicParityDifference], 0.0);
    }

    #[test]
    fn single_group_is_an_error() {
        let err = compute_fairness(&[1, 0], &[1, 0], &attr(&["a", "a"])).unwrap_err();
        assert!(matches!(err, FairnessError::SingleGroup));
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let err = compute_fairness(&[1, 0], &[1], &attr(&["a", "b"])).unwrap_err();
        assert!(matches!(err, FairnessError::LengthMismatch));
    }

    #[test]
    fn three_groups_use_extreme_rates() {
        // rates: a = 1.0, b = 0.5, c = 0.0
        let y_true = vec![1, 1, 1, 1, 1, 1];
        let y_pred = vec![1, 1, 1, 0, 0, 0];
        let sensitive = attr(&["a", "a", "b", "b", "c", "c"]);
        let report = compute_fairness(&y_true, &y_pred, &sensitive).unwrap();
        assert!((report[&FairnessMetric::DemographicParityDifference] - 1.0).abs() < 1e-6);
        assert_eq!(report[&FairnessMetric::DisparateImpact], 0.0);
    }

    #[test]
    fn equalized_odds_takes_the_worse_of_both_rates() {
        // TPRs equal (1.0); FPR: a = 1.0, b = 0.0
        let y_true = vec![1, 0, 1, 0];
        let y_pred = vec![1, 1, 1, 0];
        let sensitive = attr(&["a", "a", "b", "b"]);
        let report = compute_fairness(&y_true, &y_pred, &sensitive).unwrap();
        assert!((report[&FairnessMetric::EqualizedOddsDifference] - 1.0).abs() < 1e-6);
    }
}
