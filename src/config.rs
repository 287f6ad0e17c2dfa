use serde::{Deserialize, Serialize};

/// Configuration for one audit run. Everything that makes a run
/// reproducible lives here; there is no ambient global state, the seed
/// included.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Seed for the train/test permutation.
    pub seed: u64,
    /// Fraction of rows assigned to the test partition.
    pub test_fraction: f32,
    /// Sensitive column the fairness reports are computed against.
    pub fairness_attribute: String,
    pub learner: LearnerConfig,
    pub reduction: ReductionConfig,
}

impl Default for AuditConfig {
    fn default() -> Self {
        AuditConfig {
            seed: 42,
            test_fraction: 0.3,
            fairness_attribute: "sex".to_string(),
            learner: LearnerConfig::default(),
            reduction: ReductionConfig::default(),
        }
    }
}

/// Hyperparameters for the logistic regression base learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    pub max_iter: usize,
    pub learning_rate: f32,
    /// L2 penalty strength.
    pub l2: f32,
    /// Gradient infinity-norm below which the fit counts as converged.
    pub tolerance: f32,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        LearnerConfig {
            max_iter: 1000,
            learning_rate: 0.1,
            l2: 1e-3,
            tolerance: 1e-4,
        }
    }
}

/// Hyperparameters for the exponentiated gradient reduction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    pub max_iter: usize,
    /// Multiplier learning rate.
    pub eta: f32,
    /// Largest tolerated demographic parity gap.
    pub tolerance: f32,
    /// Cap on the multiplier L1 norm.
    pub bound: f32,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        ReductionConfig {
            max_iter: 50,
            eta: 2.0,
            tolerance: 0.01,
            bound: 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let config = AuditConfig::default();
        let encoded = serde_json::to_string(&config).unwrap();
        let decoded: AuditConfig = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.seed, config.seed);
        assert_eq!(decoded.fairness_attribute, "sex");
        assert_eq!(decoded.learner.max_iter, 1000);
        assert_eq!(decoded.reduction.max_iter, 50);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let decoded: AuditConfig = serde_json::from_str(r#"{"seed": 7}"#).unwrap();
        assert_eq!(decoded.seed, 7);
        assert!((decoded.test_fraction - 0.3).abs() < f32::EPSILON);
    }
}
