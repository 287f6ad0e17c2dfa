use crate::config::AuditConfig;
use crate::errors::DataError;
use ndarray::{Array2, Axis};
use std::io::Read;
use std::path::Path;

pub(crate) mod encoding;
pub(crate) mod split;

pub use encoding::ColumnEncoder;
pub use split::{split_indices, SplitIndices};

/// Token marking an absent value in the source encoding.
pub const MISSING_SENTINEL: &str = "?";
/// Column the binary label is derived from.
pub const LABEL_COLUMN: &str = "income";
/// Substring marking the high-income category.
pub const HIGH_INCOME_MARKER: &str = ">50K";
/// Protected columns retained unencoded for fairness computation.
pub const SENSITIVE_COLUMNS: [&str; 2] = ["sex", "race"];

const REQUIRED_COLUMNS: [&str; 3] = [LABEL_COLUMN, "sex", "race"];

/// Raw tabular input: a fixed header and one row of string cells per record.
pub struct RawTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn from_reader<R: Read>(source: R) -> Result<RawTable, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(source);

        let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(RawTable { header, rows })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<RawTable, DataError> {
        let file = std::fs::File::open(path)?;
        RawTable::from_reader(file)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|col| col == name)
    }

    /// Drops every record containing the missing-value sentinel. No
    /// imputation. Returns the number of records dropped.
    pub fn drop_missing(&mut self) -> usize {
        let before = self.rows.len();
        self.rows
            .retain(|row| !row.iter().any(|cell| cell == MISSING_SENTINEL));
        before - self.rows.len()
    }
}

/// Raw categorical values of the protected columns, row-aligned with the
/// encoded feature matrix. Fairness metrics are computed against these
/// values, never their integer codes.
#[derive(Debug, Clone)]
pub struct SensitiveFrame {
    columns: Vec<String>,
    // column major, values[c][r] pairs with feature row r
    values: Vec<Vec<String>>,
}

impl SensitiveFrame {
    pub fn column(&self, name: &str) -> Option<&[String]> {
        let idx = self.columns.iter().position(|col| col == name)?;
        Some(&self.values[idx])
    }

    pub fn len(&self) -> usize {
        self.values.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select(&self, indices: &[usize]) -> SensitiveFrame {
        SensitiveFrame {
            columns: self.columns.clone(),
            values: self
                .values
                .iter()
                .map(|col| indices.iter().map(|&i| col[i].clone()).collect())
                .collect(),
        }
    }
}

/// One side of the train/test split. Rows of `features`, `labels`, and
/// `sensitive` at the same index originate from the same source record.
#[derive(Debug)]
pub struct Partition {
    pub features: Array2<f32>,
    pub labels: Vec<i16>,
    pub sensitive: SensitiveFrame,
}

#[derive(Debug)]
pub struct Prepared {
    pub train: Partition,
    pub test: Partition,
    pub feature_names: Vec<String>,
}

/// Full preparation pass: parse, clean, derive the label, extract the
/// sensitive columns, encode categoricals, split.
pub fn prepare<R: Read>(source: R, config: &AuditConfig) -> Result<Prepared, DataError> {
    let table = RawTable::from_reader(source)?;
    prepare_table(table, config)
}

pub fn prepare_table(mut table: RawTable, config: &AuditConfig) -> Result<Prepared, DataError> {
    for required in REQUIRED_COLUMNS {
        if table.column_index(required).is_none() {
            return Err(DataError::MissingColumn(required.to_string()));
        }
    }

    let dropped = table.drop_missing();
    if dropped > 0 {
        tracing::warn!(dropped, "dropped records with missing values");
    }
    if table.is_empty() {
        return Err(DataError::EmptyAfterCleaning);
    }

    let label_idx = table
        .column_index(LABEL_COLUMN)
        .expect("label column checked above");
    let labels: Vec<i16> = table
        .rows
        .iter()
        .map(|row| i16::from(row[label_idx].contains(HIGH_INCOME_MARKER)))
        .collect();

    let sensitive = extract_sensitive(&table);
    let (features, feature_names) = encode_features(&table, label_idx);

    let split = split_indices(table.len(), config.test_fraction, config.seed);
    let train = gather(&features, &labels, &sensitive, &split.train);
    let test = gather(&features, &labels, &sensitive, &split.test);

    Ok(Prepared {
        train,
        test,
        feature_names,
    })
}

fn extract_sensitive(table: &RawTable) -> SensitiveFrame {
    let columns: Vec<String> = SENSITIVE_COLUMNS.iter().map(|c| c.to_string()).collect();
    let values = SENSITIVE_COLUMNS
        .iter()
        .map(|name| {
            let idx = table.column_index(name).expect("sensitive column checked");
            table.rows.iter().map(|row| row[idx].clone()).collect()
        })
        .collect();
    SensitiveFrame { columns, values }
}

/// Encodes every feature column to f32. Numeric columns parse directly;
/// categorical columns get an integer encoding fit over the entire cleaned
/// dataset, so a category seen in test always carries the code it had in
/// train. The label source column is excluded.
fn encode_features(table: &RawTable, label_idx: usize) -> (Array2<f32>, Vec<String>) {
    let feature_cols: Vec<usize> = (0..table.header.len()).filter(|&c| c != label_idx).collect();
    let feature_names: Vec<String> = feature_cols
        .iter()
        .map(|&c| table.header[c].clone())
        .collect();

    let n = table.len();
    let mut features = Array2::<f32>::zeros((n, feature_cols.len()));
    for (j, &col) in feature_cols.iter().enumerate() {
        let raw: Vec<&str> = table.rows.iter().map(|row| row[col].as_str()).collect();
        if let Some(parsed) = parse_numeric(&raw) {
            for (i, value) in parsed.into_iter().enumerate() {
                features[[i, j]] = value;
            }
        } else {
            let encoder = ColumnEncoder::fit(raw.iter().copied());
            for (i, value) in raw.into_iter().enumerate() {
                features[[i, j]] = encoder.code(value).expect("encoder fit on this column") as f32;
            }
        }
    }

    (features, feature_names)
}

fn parse_numeric(values: &[&str]) -> Option<Vec<f32>> {
    values.iter().map(|v| v.parse::<f32>().ok()).collect()
}

fn gather(
    features: &Array2<f32>,
    labels: &[i16],
    sensitive: &SensitiveFrame,
    indices: &[usize],
) -> Partition {
    Partition {
        features: features.select(Axis(0), indices),
        labels: indices.iter().map(|&i| labels[i]).collect(),
        sensitive: sensitive.select(indices),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;

    fn census_csv() -> String {
        let mut csv = String::from("age,workclass,sex,race,income\n");
        for i in 0..20 {
            let sex = if i % 2 == 0 { "Male" } else { "Female" };
            let race = if i % 4 == 0 { "Black" } else { "White" };
            let income = if i % 3 == 0 { ">50K" } else { "<=50K" };
            let workclass = if i == 7 { "?" } else { "Private" };
            csv.push_str(&format!("{},{},{},{},{}\n", 20 + i, workclass, sex, race, income));
        }
        csv
    }

    #[test]
    fn missing_sentinel_rows_are_dropped() {
        let mut table = RawTable::from_reader(census_csv().as_bytes()).unwrap();
        let dropped = table.drop_missing();
        assert_eq!(dropped, 1);
        assert_eq!(table.len(), 19);
        for row in &table.rows {
            assert!(!row.iter().any(|cell| cell == MISSING_SENTINEL));
        }
    }

    #[test]
    fn label_derived_by_substring_match() {
        let csv = "age,sex,race,income\n\
                   30,Male,White,>50K\n\
                   31,Female,White,<=50K\n\
                   32,Male,Black,>50K.\n\
                   33,Female,Black,<=50K.\n";
        let prepared =
            prepare(csv.as_bytes(), &AuditConfig { test_fraction: 0.5, ..AuditConfig::default() })
                .unwrap();
        let mut all: Vec<i16> = prepared.train.labels.clone();
        all.extend(&prepared.test.labels);
        all.sort_unstable();
        // two high-income rows regardless of the trailing period variant
        assert_eq!(all, vec![0, 0, 1, 1]);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let csv = "age,sex,income\n30,Male,>50K\n";
        let err = prepare(csv.as_bytes(), &AuditConfig::default()).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn(col) if col == "race"));
    }

    #[test]
    fn all_rows_missing_is_an_error() {
        let csv = "age,sex,race,income\n?,Male,White,>50K\n30,?,White,<=50K\n";
        let err = prepare(csv.as_bytes(), &AuditConfig::default()).unwrap_err();
        assert!(matches!(err, DataError::EmptyAfterCleaning));
    }

    #[test]
    fn split_keeps_rows_aligned() {
        // encode the row id into both a numeric column and the label so
        // alignment survives the shuffle
        let mut csv = String::from("row_id,sex,race,income\n");
        for i in 0..40 {
            let sex = if i % 2 == 0 { "Male" } else { "Female" };
            let income = if i % 2 == 0 { ">50K" } else { "<=50K" };
            csv.push_str(&format!("{},{},White,{}\n", i, sex, income));
        }
        let prepared = prepare(csv.as_bytes(), &AuditConfig::default()).unwrap();

        for part in [&prepared.train, &prepared.test] {
            let sex = part.sensitive.column("sex").unwrap();
            for (r, &label) in part.labels.iter().enumerate() {
                let row_id = part.features[[r, 0]] as i64;
                assert_eq!(label, i16::from(row_id % 2 == 0));
                let expected_sex = if row_id % 2 == 0 { "Male" } else { "Female" };
                assert_eq!(sex[r], expected_sex);
            }
        }
    }

    #[test]
    fn split_sizes_follow_test_fraction() {
        let prepared = prepare(census_csv().as_bytes(), &AuditConfig::default()).unwrap();
        // 19 clean rows, 30% test
        assert_eq!(prepared.test.labels.len(), 6);
        assert_eq!(prepared.train.labels.len(), 13);
        assert_eq!(prepared.train.features.nrows(), 13);
        assert_eq!(prepared.train.sensitive.len(), 13);
    }

    #[test]
    fn label_column_is_not_a_feature() {
        let prepared = prepare(census_csv().as_bytes(), &AuditConfig::default()).unwrap();
        assert!(!prepared.feature_names.iter().any(|name| name == LABEL_COLUMN));
        assert_eq!(prepared.train.features.ncols(), 4);
    }

    #[test]
    fn preparation_is_reproducible() {
        let config = AuditConfig::default();
        let a = prepare(census_csv().as_bytes(), &config).unwrap();
        let b = prepare(census_csv().as_bytes(), &config).unwrap();
        assert_eq!(a.train.labels, b.train.labels);
        assert_eq!(a.train.features, b.train.features);
        assert_eq!(
            a.test.sensitive.column("race").unwrap(),
            b.test.sensitive.column("race").unwrap()
        );
    }
}
