use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("Required column `{0}` is missing from the input header")]
    MissingColumn(String),
    #[error("No rows remain after dropping records with missing values")]
    EmptyAfterCleaning,
    #[error("Malformed tabular input: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Feature matrix and label vector must have the same number of rows")]
    RowCountMismatch,
    #[error("Sample weight vector must have one entry per row")]
    WeightLengthMismatch,
    #[error("Cannot fit a model on an empty partition")]
    EmptyPartition,
}

#[derive(Debug, Error)]
pub enum FairnessError {
    #[error("Fairness metrics are undefined for a single sensitive group")]
    SingleGroup,
    #[error("All data arrays must have equal length")]
    LengthMismatch,
}

#[derive(Debug, Error)]
pub enum MitigationError {
    #[error("Mitigation requires at least two sensitive groups in the training split")]
    SingleGroup,
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Top level error for a full audit run. `DataError` and `FairnessError`
/// abort the run; convergence shortfalls are reported as warnings on the
/// fitted models and never surface here.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Fairness(#[from] FairnessError),
    #[error(transparent)]
    Mitigation(#[from] MitigationError),
}
