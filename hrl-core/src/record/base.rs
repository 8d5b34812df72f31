//! Base implementation of records for logging.
use crate::error::HrlError;
use chrono::prelude::{DateTime, Local};
use std::collections::HashMap;

/// Represents possible types of values that can be stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single floating-point value, typically a counter or a rate.
    Scalar(f32),

    /// A timestamp with local timezone.
    DateTime(DateTime<Local>),

    /// A 1-dimensional array of floating-point values, e.g. a position.
    Array1(Vec<f32>),

    /// A text value, e.g. the name of an option.
    String(String),
}

/// A container for storing key-value pairs of various data types.
///
/// # Examples
///
/// ```rust
/// use hrl_core::record::{Record, RecordValue};
///
/// let mut record = Record::from_scalar("success_rate", 0.5);
/// record.insert("goal", RecordValue::Array1(vec![1.0, 2.0]));
/// let goal = record.get_array1("goal").unwrap();
/// assert_eq!(goal, vec![1.0, 2.0]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Merges two records, consuming both.
    ///
    /// If both records contain the same key, the value from the second record
    /// will overwrite the value from the first record.
    pub fn merge(self, record: Record) -> Self {
        Record(self.0.into_iter().chain(record.0).collect())
    }

    /// Gets a scalar value from the record.
    pub fn get_scalar(&self, k: &str) -> Result<f32, HrlError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(HrlError::RecordValueTypeError("Scalar".to_string())),
            None => Err(HrlError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a 1-dimensional array from the record.
    pub fn get_array1(&self, k: &str) -> Result<Vec<f32>, HrlError> {
        match self.0.get(k) {
            Some(RecordValue::Array1(v)) => Ok(v.clone()),
            Some(_) => Err(HrlError::RecordValueTypeError("Array1".to_string())),
            None => Err(HrlError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a string value from the record.
    pub fn get_string(&self, k: &str) -> Result<String, HrlError> {
        match self.0.get(k) {
            Some(RecordValue::String(s)) => Ok(s.clone()),
            Some(_) => Err(HrlError::RecordValueTypeError("String".to_string())),
            None => Err(HrlError::RecordKeyError(k.to_string())),
        }
    }

    /// Checks if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overwrites_with_second_record() {
        let r1 = Record::from_slice(&[
            ("a", RecordValue::Scalar(1.0)),
            ("b", RecordValue::String("x".to_string())),
        ]);
        let r2 = Record::from_scalar("a", 2.0);
        let r = r1.merge(r2);

        assert_eq!(r.get_scalar("a").unwrap(), 2.0);
        assert_eq!(r.get_string("b").unwrap(), "x");
    }

    #[test]
    fn test_getter_errors() {
        let r = Record::from_scalar("a", 1.0);

        assert!(matches!(
            r.get_scalar("missing"),
            Err(HrlError::RecordKeyError(_))
        ));
        assert!(matches!(
            r.get_string("a"),
            Err(HrlError::RecordValueTypeError(_))
        ));
    }
}
