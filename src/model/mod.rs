use crate::config::LearnerConfig;
use crate::errors::ModelError;
use ndarray::{Array1, Array2, Axis};

/// The one capability the report assembly needs from any model, base or
/// mitigated: hard 0/1 labels for a batch of encoded rows.
pub trait Predictor {
    fn predict(&self, features: &Array2<f32>) -> Vec<i16>;
}

/// L2-regularized logistic regression trained by full-batch gradient
/// descent. Features are standardized internally with statistics from the
/// fitting partition; callers keep passing raw encoded matrices.
pub struct LogisticRegression {
    config: LearnerConfig,
}

/// A fitted model. `converged` is false when the fit stopped at the
/// iteration budget; the model is still usable.
#[derive(Debug)]
pub struct FittedLogistic {
    weights: Array1<f32>,
    intercept: f32,
    means: Array1<f32>,
    scales: Array1<f32>,
    pub converged: bool,
    pub iterations: usize,
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

impl LogisticRegression {
    pub fn new(config: LearnerConfig) -> LogisticRegression {
        LogisticRegression { config }
    }

    pub fn fit(&self, features: &Array2<f32>, labels: &[i16]) -> Result<FittedLogistic, ModelError> {
        self.fit_weighted(features, labels, None)
    }

    /// Weighted fit used directly by the mitigation reduction. Weights are
    /// rescaled to mean 1 so the learning rate keeps its meaning.
    pub fn fit_weighted(
        &self,
        features: &Array2<f32>,
        labels: &[i16],
        sample_weights: Option<&[f32]>,
    ) -> Result<FittedLogistic, ModelError> {
        let n = features.nrows();
        if n == 0 {
            return Err(ModelError::EmptyPartition);
        }
        if labels.len() != n {
            return Err(ModelError::RowCountMismatch);
        }
        if sample_weights.map_or(false, |w| w.len() != n) {
            return Err(ModelError::WeightLengthMismatch);
        }

        let (means, scales) = standardization(features);
        let x = (features - &means) / &scales;
        let y: Array1<f32> = labels.iter().map(|&l| f32::from(l)).collect::<Vec<_>>().into();
        let w = normalized_weights(sample_weights, n);

        let n_f = n as f32;
        let mut weights = Array1::<f32>::zeros(features.ncols());
        let mut intercept = 0.0_f32;
        let mut converged = false;
        let mut iterations = 0;

        for _ in 0..self.config.max_iter {
            iterations += 1;
            let probs = (x.dot(&weights) + intercept).mapv(sigmoid);
            let residual = (&probs - &y) * &w;

            let mut grad_w = x.t().dot(&residual) / n_f;
            grad_w.scaled_add(self.config.l2, &weights);
            let grad_b = residual.sum() / n_f;

            let grad_norm = grad_w
                .iter()
                .fold(grad_b.abs(), |norm, g| norm.max(g.abs()));
            if grad_norm < self.config.tolerance {
                converged = true;
                break;
            }

            weights.scaled_add(-self.config.learning_rate, &grad_w);
            intercept -= self.config.learning_rate * grad_b;
        }

        if !converged {
            tracing::warn!(
                iterations,
                "logistic regression hit the iteration budget before convergence"
            );
        }

        Ok(FittedLogistic {
            weights,
            intercept,
            means,
            scales,
            converged,
            iterations,
        })
    }
}

impl FittedLogistic {
    /// Positive-class probability per row.
    pub fn predict_proba(&self, features: &Array2<f32>) -> Array1<f32> {
        let x = (features - &self.means) / &self.scales;
        (x.dot(&self.weights) + self.intercept).mapv(sigmoid)
    }
}

impl Predictor for FittedLogistic {
    fn predict(&self, features: &Array2<f32>) -> Vec<i16> {
        self.predict_proba(features)
            .iter()
            .map(|&p| i16::from(p >= 0.5))
            .collect()
    }
}

fn standardization(features: &Array2<f32>) -> (Array1<f32>, Array1<f32>) {
    let means = features
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(features.ncols()));
    let mut scales = Array1::<f32>::zeros(features.ncols());
    for (j, column) in features.axis_iter(Axis(1)).enumerate() {
        let mean = means[j];
        let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / column.len() as f32;
        let std = var.sqrt();
        // constant columns carry no signal; a unit scale keeps them inert
        scales[j] = if std > f32::EPSILON { std } else { 1.0 };
    }
    (means, scales)
}

fn normalized_weights(sample_weights: Option<&[f32]>, n: usize) -> Array1<f32> {
    match sample_weights {
        None => Array1::ones(n),
        Some(raw) => {
            let total: f32 = raw.iter().sum();
            if total <= 0.0 {
                return Array1::ones(n);
            }
            let scale = n as f32 / total;
            raw.iter().map(|&w| w * scale).collect::<Vec<_>>().into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn learner() -> LogisticRegression {
        LogisticRegression::new(LearnerConfig::default())
    }

    #[test]
    fn fits_linearly_separable_data() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [10.0], [11.0], [12.0], [13.0]];
        let y = vec![0, 0, 0, 0, 1, 1, 1, 1];
        let model = learner().fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x), y);

        let unseen = array![[1.5], [12.5]];
        assert_eq!(model.predict(&unseen), vec![0, 1]);
    }

    #[test]
    fn empty_partition_is_an_error() {
        let x = Array2::<f32>::zeros((0, 3));
        let err = learner().fit(&x, &[]).unwrap_err();
        assert!(matches!(err, ModelError::EmptyPartition));
    }

    #[test]
    fn row_count_mismatch_is_an_error() {
        let x = array![[1.0], [2.0]];
        let err = learner().fit(&x, &[1]).unwrap_err();
        assert!(matches!(err, ModelError::RowCountMismatch));
    }

    #[test]
    fn weight_length_mismatch_is_an_error() {
        let x = array![[1.0], [2.0]];
        let err = learner()
            .fit_weighted(&x, &[0, 1], Some(&[1.0]))
            .unwrap_err();
        assert!(matches!(err, ModelError::WeightLengthMismatch));
    }

    #[test]
    fn sample_weights_pull_the_decision() {
        // identical inputs with conflicting labels: the heavier side wins
        let x = array![[1.0], [1.0], [1.0], [1.0]];
        let y = vec![0, 0, 1, 1];

        let favor_negative = learner()
            .fit_weighted(&x, &y, Some(&[10.0, 10.0, 1.0, 1.0]))
            .unwrap();
        assert_eq!(favor_negative.predict(&x), vec![0, 0, 0, 0]);

        let favor_positive = learner()
            .fit_weighted(&x, &y, Some(&[1.0, 1.0, 10.0, 10.0]))
            .unwrap();
        assert_eq!(favor_positive.predict(&x), vec![1, 1, 1, 1]);
    }

    #[test]
    fn probabilities_are_in_unit_interval() {
        let x = array![[0.0, 5.0], [1.0, 2.0], [4.0, 1.0], [5.0, 0.0]];
        let y = vec![0, 0, 1, 1];
        let model = learner().fit(&x, &y).unwrap();
        for p in model.predict_proba(&x) {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn constant_column_does_not_break_the_fit() {
        let x = array![[1.0, 7.0], [2.0, 7.0], [10.0, 7.0], [11.0, 7.0]];
        let y = vec![0, 0, 1, 1];
        let model = learner().fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x), y);
    }

    #[test]
    fn budget_exhaustion_still_returns_a_model() {
        let config = LearnerConfig {
            max_iter: 3,
            tolerance: 0.0,
            ..LearnerConfig::default()
        };
        let x = array![[0.0], [1.0], [10.0], [11.0]];
        let y = vec![0, 0, 1, 1];
        let model = LogisticRegression::new(config).fit(&x, &y).unwrap();
        assert!(!model.converged);
        assert_eq!(model.iterations, 3);
        assert_eq!(model.predict(&x).len(), 4);
    }
}
