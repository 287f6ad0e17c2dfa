use crate::config::AuditConfig;
use crate::dataset::{self, Prepared};
use crate::errors::{AuditError, DataError};
use crate::fairness::{compute_fairness, FairnessReport};
use crate::mitigation::ExponentiatedGradient;
use crate::model::LogisticRegression;
use crate::performance::{evaluate, PerformanceReport};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// Everything one run produces, ready for display or serialization: base
/// model performance, fairness before mitigation, mitigated model
/// performance, fairness after. The before/after pair makes the
/// accuracy-for-parity trade visible.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuditReport {
    pub performance: PerformanceReport,
    pub fairness_before: FairnessReport,
    pub mitigated_performance: PerformanceReport,
    pub fairness_after: FairnessReport,
    pub classifier_converged: bool,
    pub mitigation_converged: bool,
}

/// One full sequential pass: prepare, train, evaluate, measure fairness,
/// mitigate, measure fairness again. Deterministic given the input bytes
/// and the seed in `config`.
pub fn run_audit<R: Read>(source: R, config: &AuditConfig) -> Result<AuditReport, AuditError> {
    let prepared = dataset::prepare(source, config)?;
    audit_prepared(&prepared, config)
}

pub fn run_audit_path<P: AsRef<Path>>(
    path: P,
    config: &AuditConfig,
) -> Result<AuditReport, AuditError> {
    let file = std::fs::File::open(path).map_err(DataError::Io)?;
    run_audit(file, config)
}

fn audit_prepared(prepared: &Prepared, config: &AuditConfig) -> Result<AuditReport, AuditError> {
    let attribute = config.fairness_attribute.as_str();
    let sens_train = prepared
        .train
        .sensitive
        .column(attribute)
        .ok_or_else(|| DataError::MissingColumn(attribute.to_string()))?;
    let sens_test = prepared
        .test
        .sensitive
        .column(attribute)
        .ok_or_else(|| DataError::MissingColumn(attribute.to_string()))?;

    let model = LogisticRegression::new(config.learner.clone())
        .fit(&prepared.train.features, &prepared.train.labels)?;
    let (performance, predicted) =
        evaluate(&model, &prepared.test.features, &prepared.test.labels)?;
    let fairness_before = compute_fairness(&prepared.test.labels, &predicted, sens_test)?;

    let mitigated = ExponentiatedGradient::new(config.learner.clone(), config.reduction.clone())
        .fit(&prepared.train.features, &prepared.train.labels, sens_train)?;
    let (mitigated_performance, predicted_after) =
        evaluate(&mitigated, &prepared.test.features, &prepared.test.labels)?;
    let fairness_after = compute_fairness(&prepared.test.labels, &predicted_after, sens_test)?;

    Ok(AuditReport {
        performance,
        fairness_before,
        mitigated_performance,
        fairness_after,
        classifier_converged: model.converged,
        mitigation_converged: mitigated.converged,
    })
}
