// Copyright 2024-Present the index-schema authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use time::OffsetDateTime;

use crate::value::FieldValue;

/// Backend-neutral accessor over one field's raw stored value(s) in a
/// physical index document.
///
/// Each backend supplies an implementation wrapping its own raw document
/// representation; field setters use it to reconstruct domain values without
/// knowing anything about the backend. Every accessor returns `None` when
/// the document holds no value of the requested shape for this field.
pub trait StoredValue {
    /// The value as a single string.
    fn as_string(&self) -> Option<String>;
    /// The values as a list of strings.
    fn as_strings(&self) -> Option<Vec<String>>;
    /// The value as a single 32-bit integer.
    fn as_integer(&self) -> Option<i32>;
    /// The values as a list of 32-bit integers.
    fn as_integers(&self) -> Option<Vec<i32>>;
    /// The value as a single 64-bit integer.
    fn as_long(&self) -> Option<i64>;
    /// The values as a list of 64-bit integers.
    fn as_longs(&self) -> Option<Vec<i64>>;
    /// The value as a single timestamp.
    fn as_timestamp(&self) -> Option<OffsetDateTime>;
    /// The value as a single byte string.
    fn as_bytes(&self) -> Option<Vec<u8>>;
    /// The values as a list of byte strings.
    fn as_byte_arrays(&self) -> Option<Vec<Vec<u8>>>;
}

/// [`StoredValue`] implementation over a slice of already-decoded
/// [`FieldValue`]s.
///
/// This is the natural accessor for key-value backends that store field
/// values in the crate's own representation, and for tests.
#[derive(Clone, Copy, Debug)]
pub struct FieldValueAccessor<'a> {
    values: &'a [FieldValue],
}

impl<'a> FieldValueAccessor<'a> {
    /// Wraps a slice of stored field values.
    pub fn new(values: &'a [FieldValue]) -> Self {
        FieldValueAccessor { values }
    }

    fn first(&self) -> Option<&'a FieldValue> {
        self.values.first()
    }
}

fn non_empty<T>(values: Vec<T>) -> Option<Vec<T>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

impl StoredValue for FieldValueAccessor<'_> {
    fn as_string(&self) -> Option<String> {
        match self.first()? {
            FieldValue::Text(text) => Some(text.clone()),
            _ => None,
        }
    }

    fn as_strings(&self) -> Option<Vec<String>> {
        non_empty(
            self.values
                .iter()
                .filter_map(|value| match value {
                    FieldValue::Text(text) => Some(text.clone()),
                    _ => None,
                })
                .collect(),
        )
    }

    fn as_integer(&self) -> Option<i32> {
        match self.first()? {
            FieldValue::Int(num) => Some(*num),
            _ => None,
        }
    }

    fn as_integers(&self) -> Option<Vec<i32>> {
        non_empty(
            self.values
                .iter()
                .filter_map(|value| match value {
                    FieldValue::Int(num) => Some(*num),
                    _ => None,
                })
                .collect(),
        )
    }

    fn as_long(&self) -> Option<i64> {
        match self.first()? {
            FieldValue::Long(num) => Some(*num),
            _ => None,
        }
    }

    fn as_longs(&self) -> Option<Vec<i64>> {
        non_empty(
            self.values
                .iter()
                .filter_map(|value| match value {
                    FieldValue::Long(num) => Some(*num),
                    _ => None,
                })
                .collect(),
        )
    }

    fn as_timestamp(&self) -> Option<OffsetDateTime> {
        match self.first()? {
            FieldValue::Timestamp(timestamp) => Some(*timestamp),
            _ => None,
        }
    }

    fn as_bytes(&self) -> Option<Vec<u8>> {
        match self.first()? {
            FieldValue::Bytes(bytes) => Some(bytes.clone()),
            _ => None,
        }
    }

    fn as_byte_arrays(&self) -> Option<Vec<Vec<u8>>> {
        non_empty(
            self.values
                .iter()
                .filter_map(|value| match value {
                    FieldValue::Bytes(bytes) => Some(bytes.clone()),
                    _ => None,
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_accessor_over_empty_slice() {
        let accessor = FieldValueAccessor::new(&[]);
        assert_eq!(accessor.as_string(), None);
        assert_eq!(accessor.as_strings(), None);
        assert_eq!(accessor.as_integer(), None);
        assert_eq!(accessor.as_bytes(), None);
        assert_eq!(accessor.as_timestamp(), None);
    }

    #[test]
    fn test_accessor_scalar_and_list_views() {
        let values = vec![
            FieldValue::Text("alpha".to_string()),
            FieldValue::Text("beta".to_string()),
        ];
        let accessor = FieldValueAccessor::new(&values);
        assert_eq!(accessor.as_string(), Some("alpha".to_string()));
        assert_eq!(
            accessor.as_strings(),
            Some(vec!["alpha".to_string(), "beta".to_string()])
        );
        // Requesting an incompatible shape yields absent, not a panic.
        assert_eq!(accessor.as_integer(), None);
        assert_eq!(accessor.as_longs(), None);
    }

    #[test]
    fn test_accessor_numeric_and_timestamp() {
        let values = vec![FieldValue::Int(5)];
        let accessor = FieldValueAccessor::new(&values);
        assert_eq!(accessor.as_integer(), Some(5));
        assert_eq!(accessor.as_integers(), Some(vec![5]));

        let at = datetime!(2024-01-15 08:30 UTC);
        let values = vec![FieldValue::Timestamp(at)];
        let accessor = FieldValueAccessor::new(&values);
        assert_eq!(accessor.as_timestamp(), Some(at));
    }
}
