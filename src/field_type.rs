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

use std::fmt;

/// Primitive storage type of one search tokenization, as seen by a backend.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FieldType {
    /// An exact-match integer token.
    Integer,
    /// An integer token supporting range queries.
    IntegerRange,
    /// An exact-match 64-bit integer token.
    Long,
    /// A timestamp token supporting range queries.
    Timestamp,
    /// An exact-match string token.
    Exact,
    /// A string analyzed into full-text tokens.
    FullText,
    /// A string token supporting prefix queries.
    Prefix,
    /// Stored verbatim, never searchable.
    StoredOnly,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Integer => "integer",
            FieldType::IntegerRange => "integer_range",
            FieldType::Long => "long",
            FieldType::Timestamp => "timestamp",
            FieldType::Exact => "exact",
            FieldType::FullText => "full_text",
            FieldType::Prefix => "prefix",
            FieldType::StoredOnly => "stored_only",
        };
        write!(f, "{name}")
    }
}

/// Tokenization intent requested by a schema author on a search spec.
///
/// Distinct from [`FieldType`]: one field's raw kind can back several
/// different tokenizations, and the concrete storage type is derived from
/// the (option, kind) pair at schema-build time.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SearchOption {
    /// Range queries over numeric or timestamp values.
    Range,
    /// Prefix matching over string values.
    Prefix,
    /// Exact matching.
    Exact,
    /// Full-text matching over analyzed string values.
    FullText,
    /// No matching at all, value retrievable verbatim.
    StoreOnly,
}

impl fmt::Display for SearchOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchOption::Range => "range",
            SearchOption::Prefix => "prefix",
            SearchOption::Exact => "exact",
            SearchOption::FullText => "full_text",
            SearchOption::StoreOnly => "store_only",
        };
        write!(f, "{name}")
    }
}

/// Shape of the value a field extracts from a domain object.
///
/// This is a closed set, supplied through the typed constructors on
/// [`IndexedField`](crate::IndexedField) rather than inferred from generics.
/// There is deliberately no `TimestampList`: timestamps are non-repeatable.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FieldKind {
    /// A single string.
    Text,
    /// Zero or more strings.
    TextList,
    /// A single 32-bit integer.
    Int,
    /// Zero or more 32-bit integers.
    IntList,
    /// A single 64-bit integer.
    Long,
    /// Zero or more 64-bit integers.
    LongList,
    /// A single timestamp.
    Timestamp,
    /// A single byte string.
    Bytes,
    /// Zero or more byte strings.
    BytesList,
    /// A single protobuf message, carried as its encoded bytes.
    Message,
    /// Zero or more protobuf messages.
    MessageList,
}

impl FieldKind {
    /// True iff values of this kind hold zero or more elements.
    pub fn is_repeatable(&self) -> bool {
        matches!(
            self,
            FieldKind::TextList
                | FieldKind::IntList
                | FieldKind::LongList
                | FieldKind::BytesList
                | FieldKind::MessageList
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Text => "text",
            FieldKind::TextList => "list<text>",
            FieldKind::Int => "int",
            FieldKind::IntList => "list<int>",
            FieldKind::Long => "long",
            FieldKind::LongList => "list<long>",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Bytes => "bytes",
            FieldKind::BytesList => "list<bytes>",
            FieldKind::Message => "message",
            FieldKind::MessageList => "list<message>",
        };
        write!(f, "{name}")
    }
}

/// Derives the storage [`FieldType`] backing a (search option, field kind)
/// combination, or `None` when the combination is not indexable.
///
/// Total over the declared domain: any extension of [`SearchOption`] or
/// [`FieldKind`] must extend this table, and an unhandled combination is a
/// schema declaration error caught at build time, never a silent default.
pub(crate) fn storage_field_type(option: SearchOption, kind: FieldKind) -> Option<FieldType> {
    match (option, kind) {
        (SearchOption::StoreOnly, _) => Some(FieldType::StoredOnly),
        (SearchOption::Exact, FieldKind::Int | FieldKind::IntList) => Some(FieldType::Integer),
        // Range over repeated integers is disallowed: only the scalar kind
        // maps to an integer-range token.
        (SearchOption::Range, FieldKind::Int) => Some(FieldType::IntegerRange),
        (_, FieldKind::Long | FieldKind::LongList) => Some(FieldType::Long),
        (_, FieldKind::Timestamp) => Some(FieldType::Timestamp),
        (SearchOption::Exact, FieldKind::Text | FieldKind::TextList) => Some(FieldType::Exact),
        (SearchOption::FullText, FieldKind::Text | FieldKind::TextList) => {
            Some(FieldType::FullText)
        }
        (SearchOption::Prefix, FieldKind::Text | FieldKind::TextList) => Some(FieldType::Prefix),
        _ => None,
    }
}
