use crate::config::{LearnerConfig, ReductionConfig};
use crate::errors::{MitigationError, ModelError};
use crate::model::{FittedLogistic, LogisticRegression, Predictor};
use ahash::AHashMap;
use ndarray::Array2;

/// Exponentiated gradient reduction under a demographic parity constraint.
/// Each round turns the current multipliers into a cost vector over the
/// training examples, reduces that to a weighted relabeled classification
/// problem, refits the logistic base learner, and nudges the multipliers
/// toward the groups the variant still over- or under-selects. The step
/// size halves whenever the gap direction reverses.
pub struct ExponentiatedGradient {
    learner: LogisticRegression,
    config: ReductionConfig,
}

/// Ensemble kept from the reduction: the fitted variants whose parity
/// violation came within tolerance of the best one found. Prediction is a
/// deterministic majority vote over the members, so a fixed seed upstream
/// yields the same labels on every run.
#[derive(Debug)]
pub struct MitigatedModel {
    variants: Vec<FittedLogistic>,
    /// Smallest parity violation any fitted variant achieved.
    pub best_gap: f32,
    pub converged: bool,
}

impl ExponentiatedGradient {
    pub fn new(learner: LearnerConfig, config: ReductionConfig) -> ExponentiatedGradient {
        ExponentiatedGradient {
            learner: LogisticRegression::new(learner),
            config,
        }
    }

    pub fn fit<S: AsRef<str>>(
        &self,
        features: &Array2<f32>,
        labels: &[i16],
        sensitive: &[S],
    ) -> Result<MitigatedModel, MitigationError> {
        let n = features.nrows();
        if n == 0 {
            return Err(ModelError::EmptyPartition.into());
        }
        if labels.len() != n || sensitive.len() != n {
            return Err(ModelError::RowCountMismatch.into());
        }

        let (group_of, group_sizes) = index_groups(sensitive);
        let n_groups = group_sizes.len();
        if n_groups < 2 {
            return Err(MitigationError::SingleGroup);
        }

        let n_f = n as f32;
        // log-multipliers for the (group, direction) constraint pairs
        let mut theta_pos = vec![0.0_f32; n_groups];
        let mut theta_neg = vec![0.0_f32; n_groups];
        let mut fitted: Vec<(FittedLogistic, f32)> = Vec::new();
        let mut best_gap = f32::INFINITY;
        let mut converged = false;
        let mut step = self.config.eta;
        let mut prev_gaps: Option<Vec<f32>> = None;

        for round in 0..self.config.max_iter {
            let (lambda_pos, lambda_neg) = multipliers(&theta_pos, &theta_neg, self.config.bound);

            // cost of predicting positive on each example: the error term
            // plus the parity lever of the example's group
            let costs: Vec<f32> = (0..n)
                .map(|i| {
                    let g = group_of[i];
                    let error_term = (if labels[i] == 1 { -1.0 } else { 1.0 }) / n_f;
                    let lever = 1.0 / group_sizes[g] - 1.0 / n_f;
                    error_term + (lambda_pos[g] - lambda_neg[g]) * lever
                })
                .collect();

            // a negative cost favors the positive label; the magnitude is
            // how much the example matters to the weighted problem
            let relabeled: Vec<i16> = costs.iter().map(|&c| i16::from(c < 0.0)).collect();
            let weights: Vec<f32> = costs.iter().map(|c| c.abs()).collect();

            let variant = self
                .learner
                .fit_weighted(features, &relabeled, Some(&weights))?;
            let predictions = variant.predict(features);
            let gaps = parity_gaps(&predictions, &group_of, &group_sizes);
            let violation = gaps.iter().fold(0.0_f32, |worst, g| worst.max(g.abs()));

            tracing::debug!(round, violation, step, "fitted reduction variant");
            fitted.push((variant, violation));
            best_gap = best_gap.min(violation);
            if violation <= self.config.tolerance {
                converged = true;
                break;
            }

            if let Some(prev) = &prev_gaps {
                let direction: f32 = prev.iter().zip(&gaps).map(|(p, g)| p * g).sum();
                if direction < 0.0 {
                    step *= 0.5;
                }
            }
            for g in 0..n_groups {
                theta_pos[g] += step * gaps[g];
                theta_neg[g] -= step * gaps[g];
            }
            prev_gaps = Some(gaps);
        }

        if !converged {
            tracing::warn!(
                best_gap,
                "reduction hit the iteration cap before meeting the parity tolerance"
            );
        }

        // keep the variants that honor the constraint as well as the best
        // one found; early unconstrained iterates must not outvote them
        let keep = best_gap + self.config.tolerance;
        let variants = fitted
            .into_iter()
            .filter(|(_, violation)| *violation <= keep)
            .map(|(variant, _)| variant)
            .collect();

        Ok(MitigatedModel {
            variants,
            best_gap,
            converged,
        })
    }
}

impl MitigatedModel {
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

impl Predictor for MitigatedModel {
    fn predict(&self, features: &Array2<f32>) -> Vec<i16> {
        let n = features.nrows();
        if self.variants.is_empty() {
            return vec![0; n];
        }

        let mut votes = vec![0.0_f32; n];
        for variant in &self.variants {
            for (vote, label) in votes.iter_mut().zip(variant.predict(features)) {
                *vote += f32::from(label);
            }
        }
        let quorum = self.variants.len() as f32 / 2.0;
        votes.into_iter().map(|v| i16::from(v >= quorum)).collect()
    }
}

/// Maps each row to a dense group index; group identities are ordered
/// lexicographically so the indexing is deterministic.
fn index_groups<S: AsRef<str>>(sensitive: &[S]) -> (Vec<usize>, Vec<f32>) {
    let mut distinct: Vec<&str> = sensitive.iter().map(AsRef::as_ref).collect();
    distinct.sort_unstable();
    distinct.dedup();

    let index: AHashMap<&str, usize> = distinct
        .iter()
        .enumerate()
        .map(|(i, &value)| (value, i))
        .collect();

    let group_of: Vec<usize> = sensitive.iter().map(|s| index[s.as_ref()]).collect();
    let mut group_sizes = vec![0.0_f32; distinct.len()];
    for &g in &group_of {
        group_sizes[g] += 1.0;
    }
    (group_of, group_sizes)
}

/// Signed demographic parity gap per group: selection rate of the group
/// minus the overall selection rate.
fn parity_gaps(predictions: &[i16], group_of: &[usize], group_sizes: &[f32]) -> Vec<f32> {
    let overall: f32 =
        predictions.iter().map(|&p| f32::from(p)).sum::<f32>() / predictions.len() as f32;

    let mut positives = vec![0.0_f32; group_sizes.len()];
    for (&p, &g) in predictions.iter().zip(group_of) {
        positives[g] += f32::from(p);
    }
    positives
        .iter()
        .zip(group_sizes)
        .map(|(&pos, &size)| pos / size - overall)
        .collect()
}

/// Multiplier pairs from their log-parameters, capped at an L1 norm of
/// `bound`. Exponentials are shifted by the largest parameter so long runs
/// of one-sided updates cannot overflow.
fn multipliers(theta_pos: &[f32], theta_neg: &[f32], bound: f32) -> (Vec<f32>, Vec<f32>) {
    let shift = theta_pos
        .iter()
        .chain(theta_neg)
        .fold(0.0_f32, |m, &t| m.max(t));
    let z = (-shift).exp()
        + theta_pos
            .iter()
            .chain(theta_neg)
            .map(|&t| (t - shift).exp())
            .sum::<f32>();

    let project = |theta: &[f32]| -> Vec<f32> {
        theta.iter().map(|&t| bound * (t - shift).exp() / z).collect()
    };
    (project(theta_pos), project(theta_neg))
}
