use ahash::AHashMap;

/// Integer encoding for one categorical column. Codes are assigned over the
/// distinct values of the entire cleaned dataset in lexicographic order, so
/// the mapping is deterministic and identical for the train and test
/// partitions.
pub struct ColumnEncoder {
    codes: AHashMap<String, usize>,
}

impl ColumnEncoder {
    pub fn fit<'a, I>(values: I) -> ColumnEncoder
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut distinct: Vec<&str> = values.into_iter().collect();
        distinct.sort_unstable();
        distinct.dedup();

        let codes = distinct
            .into_iter()
            .enumerate()
            .map(|(code, value)| (value.to_string(), code))
            .collect();
        ColumnEncoder { codes }
    }

    pub fn code(&self, value: &str) -> Option<usize> {
        self.codes.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
