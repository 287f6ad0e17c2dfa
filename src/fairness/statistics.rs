use super::GroupOutcomes;
use crate::performance::statistics::{false_positive_rate, true_positive_rate};

/// Largest minus smallest positive-prediction rate across groups. 0 when
/// every group is selected at the same rate.
pub(crate) fn demographic_parity_difference(groups: &[GroupOutcomes]) -> f32 {
    spread(groups.iter().map(GroupOutcomes::positive_rate))
}

/// Smallest over largest positive-prediction rate. Ideal is 1; values above
/// 1 cannot occur by construction, and a silent 0/0 slice reports 0.
pub(crate) fn disparate_impact(groups: &[GroupOutcomes]) -> f32 {
    let mut min_rate = f32::INFINITY;
    let mut max_rate = f32::NEG_INFINITY;
    for group in groups {
        let rate = group.positive_rate();
        min_rate = min_rate.min(rate);
        max_rate = max_rate.max(rate);
    }
    if max_rate == 0.0 {
        return 0.0;
    }
    min_rate / max_rate
}

/// Worst-case error-rate gap across groups, over both the true-positive
/// rate and the false-positive rate.
pub(crate) fn equalized_odds_difference(groups: &[GroupOutcomes]) -> f32 {
    let tpr_gap = spread(groups.iter().map(|g| true_positive_rate(&g.confusion)));
    let fpr_gap = spread(groups.iter().map(|g| false_positive_rate(&g.confusion)));
    tpr_gap.max(fpr_gap)
}

fn spread<I: Iterator<Item = f32>>(rates: I) -> f32 {
    let mut min_rate = f32::INFINITY;
    let mut max_rate = f32::NEG_INFINITY;
    for rate in rates {
        min_rate = min_rate.min(rate);
        max_rate = max_rate.max(rate);
    }
    max_rate - min_rate
}
