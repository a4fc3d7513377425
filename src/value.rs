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

use prost::Message;
use time::OffsetDateTime;
use tracing::warn;

use crate::field_type::FieldKind;
use crate::stored_value::StoredValue;

/// One extracted field value, in the backend-neutral representation handed
/// to indexers.
///
/// Protobuf messages are carried as their prost-encoded bytes; the owning
/// field's [`FieldKind`] distinguishes them from plain byte strings.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// A string value.
    Text(String),
    /// A 32-bit integer value.
    Int(i32),
    /// A 64-bit integer value.
    Long(i64),
    /// A timestamp value.
    Timestamp(OffsetDateTime),
    /// A byte-string value.
    Bytes(Vec<u8>),
}

/// A protobuf message used as a field value.
///
/// Prost messages cannot implement [`IndexableValue`] directly without
/// overlapping the plain scalar impls, so getters and setters for message
/// fields traffic in this wrapper instead.
#[derive(Clone, Debug, PartialEq)]
pub struct Protobuf<M>(pub M);

/// Conversion between a typed extracted value and the backend-neutral
/// [`FieldValue`] representation.
///
/// This is a closed set: the impls below enumerate every value shape a field
/// can declare, and each one carries its [`FieldKind`] tag. Repeatable kinds
/// are exactly the `Vec<_>` impls.
pub trait IndexableValue: Sized {
    /// The kind tag of this value shape.
    const KIND: FieldKind;

    /// Flattens the value into individual [`FieldValue`]s. Scalar shapes
    /// yield exactly one element.
    fn into_field_values(self) -> Vec<FieldValue>;

    /// Reconstructs the value from a stored index document, or `None` when
    /// the document holds no compatible value for the field.
    fn from_stored(doc: &dyn StoredValue) -> Option<Self>;
}

impl IndexableValue for String {
    const KIND: FieldKind = FieldKind::Text;

    fn into_field_values(self) -> Vec<FieldValue> {
        vec![FieldValue::Text(self)]
    }

    fn from_stored(doc: &dyn StoredValue) -> Option<Self> {
        doc.as_string()
    }
}

impl IndexableValue for Vec<String> {
    const KIND: FieldKind = FieldKind::TextList;

    fn into_field_values(self) -> Vec<FieldValue> {
        self.into_iter().map(FieldValue::Text).collect()
    }

    fn from_stored(doc: &dyn StoredValue) -> Option<Self> {
        doc.as_strings()
    }
}

impl IndexableValue for i32 {
    const KIND: FieldKind = FieldKind::Int;

    fn into_field_values(self) -> Vec<FieldValue> {
        vec![FieldValue::Int(self)]
    }

    fn from_stored(doc: &dyn StoredValue) -> Option<Self> {
        doc.as_integer()
    }
}

impl IndexableValue for Vec<i32> {
    const KIND: FieldKind = FieldKind::IntList;

    fn into_field_values(self) -> Vec<FieldValue> {
        self.into_iter().map(FieldValue::Int).collect()
    }

    fn from_stored(doc: &dyn StoredValue) -> Option<Self> {
        doc.as_integers()
    }
}

impl IndexableValue for i64 {
    const KIND: FieldKind = FieldKind::Long;

    fn into_field_values(self) -> Vec<FieldValue> {
        vec![FieldValue::Long(self)]
    }

    fn from_stored(doc: &dyn StoredValue) -> Option<Self> {
        doc.as_long()
    }
}

impl IndexableValue for Vec<i64> {
    const KIND: FieldKind = FieldKind::LongList;

    fn into_field_values(self) -> Vec<FieldValue> {
        self.into_iter().map(FieldValue::Long).collect()
    }

    fn from_stored(doc: &dyn StoredValue) -> Option<Self> {
        doc.as_longs()
    }
}

impl IndexableValue for OffsetDateTime {
    const KIND: FieldKind = FieldKind::Timestamp;

    fn into_field_values(self) -> Vec<FieldValue> {
        vec![FieldValue::Timestamp(self)]
    }

    fn from_stored(doc: &dyn StoredValue) -> Option<Self> {
        doc.as_timestamp()
    }
}

impl IndexableValue for Vec<u8> {
    const KIND: FieldKind = FieldKind::Bytes;

    fn into_field_values(self) -> Vec<FieldValue> {
        vec![FieldValue::Bytes(self)]
    }

    fn from_stored(doc: &dyn StoredValue) -> Option<Self> {
        doc.as_bytes()
    }
}

impl IndexableValue for Vec<Vec<u8>> {
    const KIND: FieldKind = FieldKind::BytesList;

    fn into_field_values(self) -> Vec<FieldValue> {
        self.into_iter().map(FieldValue::Bytes).collect()
    }

    fn from_stored(doc: &dyn StoredValue) -> Option<Self> {
        doc.as_byte_arrays()
    }
}

impl<M> IndexableValue for Protobuf<M>
where M: Message + Default
{
    const KIND: FieldKind = FieldKind::Message;

    fn into_field_values(self) -> Vec<FieldValue> {
        vec![FieldValue::Bytes(self.0.encode_to_vec())]
    }

    fn from_stored(doc: &dyn StoredValue) -> Option<Self> {
        let bytes = doc.as_bytes()?;
        decode_message(&bytes).map(Protobuf)
    }
}

impl<M> IndexableValue for Vec<Protobuf<M>>
where M: Message + Default
{
    const KIND: FieldKind = FieldKind::MessageList;

    fn into_field_values(self) -> Vec<FieldValue> {
        self.into_iter()
            .map(|message| FieldValue::Bytes(message.0.encode_to_vec()))
            .collect()
    }

    fn from_stored(doc: &dyn StoredValue) -> Option<Self> {
        let byte_arrays = doc.as_byte_arrays()?;
        byte_arrays
            .iter()
            .map(|bytes| decode_message(bytes).map(Protobuf))
            .collect()
    }
}

fn decode_message<M: Message + Default>(bytes: &[u8]) -> Option<M> {
    match M::decode(bytes) {
        Ok(message) => Some(message),
        Err(error) => {
            warn!(error = ?error, "failed to decode stored protobuf message");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::stored_value::FieldValueAccessor;

    #[derive(Clone, PartialEq, prost::Message)]
    struct UserRef {
        #[prost(uint64, tag = "1")]
        id: u64,
        #[prost(string, tag = "2")]
        email: String,
    }

    #[test]
    fn test_scalar_values_flatten_to_one_element() {
        assert_eq!(
            "abc".to_string().into_field_values(),
            vec![FieldValue::Text("abc".to_string())]
        );
        assert_eq!(42i32.into_field_values(), vec![FieldValue::Int(42)]);
        assert_eq!(42i64.into_field_values(), vec![FieldValue::Long(42)]);
        assert_eq!(
            datetime!(2023-05-01 12:00 UTC).into_field_values(),
            vec![FieldValue::Timestamp(datetime!(2023-05-01 12:00 UTC))]
        );
        assert_eq!(
            vec![1u8, 2, 3].into_field_values(),
            vec![FieldValue::Bytes(vec![1, 2, 3])]
        );
    }

    #[test]
    fn test_list_values_flatten_elementwise() {
        let values = vec!["a".to_string(), "b".to_string()].into_field_values();
        assert_eq!(
            values,
            vec![
                FieldValue::Text("a".to_string()),
                FieldValue::Text("b".to_string())
            ]
        );
        assert_eq!(
            vec![1i32, 2].into_field_values(),
            vec![FieldValue::Int(1), FieldValue::Int(2)]
        );
    }

    #[test]
    fn test_protobuf_round_trip() {
        let user = UserRef {
            id: 7,
            email: "admin@example.com".to_string(),
        };
        let field_values = Protobuf(user.clone()).into_field_values();
        assert_eq!(field_values.len(), 1);

        let accessor = FieldValueAccessor::new(&field_values);
        let decoded: Protobuf<UserRef> = IndexableValue::from_stored(&accessor).unwrap();
        assert_eq!(decoded.0, user);
    }

    #[test]
    fn test_protobuf_list_round_trip() {
        let users = vec![
            Protobuf(UserRef {
                id: 1,
                email: "a@example.com".to_string(),
            }),
            Protobuf(UserRef {
                id: 2,
                email: "b@example.com".to_string(),
            }),
        ];
        let field_values = users.clone().into_field_values();
        assert_eq!(field_values.len(), 2);

        let accessor = FieldValueAccessor::new(&field_values);
        let decoded: Vec<Protobuf<UserRef>> = IndexableValue::from_stored(&accessor).unwrap();
        assert_eq!(decoded, users);
    }

    #[test]
    fn test_undecodable_protobuf_is_absent() {
        let field_values = vec![FieldValue::Bytes(vec![0xff, 0xff, 0xff])];
        let accessor = FieldValueAccessor::new(&field_values);
        let decoded: Option<Protobuf<UserRef>> = IndexableValue::from_stored(&accessor);
        assert!(decoded.is_none());
    }
}
