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

#![warn(missing_docs)]

//! Schema layer for secondary indexes over domain objects.
//!
//! A [`Schema`] is an immutable, versioned set of [`IndexedField`]
//! definitions. Each field pairs a typed extraction rule (from a domain
//! object into backend-neutral [`FieldValue`]s) with the search
//! tokenizations declared on it, and optionally a reverse rule used to
//! reconstruct objects from stored documents. The [`Index`] trait is the
//! contract concrete backends implement, and [`SiteIndexer`] drives bulk
//! reindexes against any of them.

mod config;
mod error;
mod field_type;
mod index;
mod indexed_field;
mod query;
mod schema;
mod site_indexer;
mod stored_value;
#[cfg(any(test, feature = "testsuite"))]
pub mod testing;
mod value;

pub use config::{IndexConfig, PaginationType, INDEX_TYPE_ENV_KEY};
pub use error::{FieldError, QueryParseError, StorageError};
pub use field_type::{FieldKind, FieldType, SearchOption};
pub use index::{DataSource, Index};
pub use indexed_field::{
    validate_field_name, FieldBuilder, IndexedField, SearchSpec, FIELD_NAME_PATTERN,
};
pub use query::{FieldPredicate, Predicate, QueryOptions};
pub use schema::{FieldValues, Schema, SchemaBuilder};
pub use site_indexer::{IndexAllResult, ProgressReporter, SiteIndexer};
pub use stored_value::{FieldValueAccessor, StoredValue};
pub use value::{FieldValue, IndexableValue, Protobuf};
