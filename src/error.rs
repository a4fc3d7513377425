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

use thiserror::Error;

/// Error raised when an index query cannot be honored by a backend.
///
/// Backends must reject predicate shapes they cannot evaluate with this error
/// instead of silently mis-filtering.
#[derive(Debug, Error)]
pub enum QueryParseError {
    /// The predicate tree contains a shape the backend does not support.
    #[error("unsupported predicate: {0}")]
    Unsupported(String),
    /// The predicate tree contains more leaf terms than the backend allows.
    #[error("too many query terms: got {got}, index allows at most {max}")]
    TooManyTerms {
        /// Number of leaf terms in the rejected predicate tree.
        got: usize,
        /// Configured term limit of the backend.
        max: usize,
    },
}

/// A fault reading from or writing to the underlying storage.
///
/// A storage fault while extracting field values means the source object
/// itself is unreadable: the whole document is treated as un-indexable for
/// this attempt and callers are expected to retry it later.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error surfaced by the backing store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The backing store is not reachable or not serving.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// The index returned data violating its own contract, e.g. several
    /// entries for a supposedly unique key.
    #[error("index inconsistency: {0}")]
    Inconsistent(String),
    /// A query was rejected while servicing a storage-level operation.
    #[error("invalid index query: {0}")]
    Query(#[from] QueryParseError),
}

/// Outcome classification for a failed field extraction.
///
/// The two variants drive two very different recovery paths (see
/// [`Schema::build_fields`](crate::Schema::build_fields)): a `Storage` fault
/// aborts the whole document, while an `Extract` fault only drops the one
/// field that misbehaved.
#[derive(Debug, Error)]
pub enum FieldError {
    /// The source object could not be read at all.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The field extractor itself failed; a bug local to one field.
    #[error("field extractor failed: {0}")]
    Extract(#[source] anyhow::Error),
}

impl FieldError {
    /// Convenience constructor for non-storage extractor failures.
    pub fn extract(error: impl Into<anyhow::Error>) -> Self {
        FieldError::Extract(error.into())
    }
}
