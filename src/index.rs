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

use async_trait::async_trait;

use crate::error::{QueryParseError, StorageError};
use crate::query::{Predicate, QueryOptions};
use crate::schema::Schema;

/// A prepared query against one index: the backend has already parsed the
/// predicate, and the results are fetched on demand.
#[async_trait]
pub trait DataSource<V>: Send + Sync {
    /// An inexpensive estimate of the result count, used for query planning.
    fn cardinality(&self) -> usize;

    /// Executes the query and returns the matching documents.
    async fn fetch(&self) -> Result<Vec<V>, StorageError>;
}

/// A secondary index over documents of type `V`, addressed by a unique key
/// of type `K`.
///
/// Implementations wrap one concrete backend and one [`Schema`] generation.
/// Writes are visible to subsequent reads once the corresponding call
/// returns.
#[async_trait]
pub trait Index<K, V>: Send + Sync
where
    K: fmt::Debug + Send + Sync,
    V: Send + Sync,
{
    /// The schema generation this index writes and reads with.
    fn schema(&self) -> &Schema<V>;

    /// Derives the unique key of a document.
    fn key_of(&self, value: &V) -> K;

    /// The predicate matching exactly the document with the given key.
    fn key_predicate(&self, key: &K) -> Predicate;

    /// Inserts or overwrites the index entry for this document.
    async fn replace(&self, value: &V) -> Result<(), StorageError>;

    /// Deletes the index entry for this key. Deleting an absent key is not
    /// an error.
    async fn delete(&self, key: &K) -> Result<(), StorageError>;

    /// Deletes every entry, e.g. before an offline reindex.
    async fn delete_all(&self) -> Result<(), StorageError>;

    /// Parses a predicate into an executable query.
    ///
    /// Parsing is synchronous and infallible at the storage level: a backend
    /// rejects unsupported predicate shapes or oversized trees here, before
    /// any I/O happens.
    fn get_source(
        &self,
        predicate: Predicate,
        options: QueryOptions,
    ) -> Result<Box<dyn DataSource<V>>, QueryParseError>;

    /// Flags the index as ready (or not ready) to serve queries. Site
    /// administration flips this around offline reindexes.
    fn mark_ready(&self, ready: bool) -> Result<(), StorageError>;

    /// Looks up the single document stored under `key`.
    ///
    /// An index holds at most one entry per key; finding several is reported
    /// as [`StorageError::Inconsistent`] rather than silently returning one
    /// of them.
    async fn get(&self, key: &K, options: QueryOptions) -> Result<Option<V>, StorageError> {
        let source = self.get_source(self.key_predicate(key), options.single_result())?;
        let mut results = source.fetch().await?;
        match results.len() {
            0 => Ok(None),
            1 => Ok(results.pop()),
            _ => Err(StorageError::Inconsistent(format!(
                "multiple index entries found for key `{key:?}`"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::config::IndexConfig;
    use crate::query::FieldPredicate;
    use crate::value::FieldValue;
    use crate::IndexedField;

    /// Index stub returning a canned result set for any query.
    struct CannedIndex {
        schema: Schema<String>,
        results: Mutex<Vec<String>>,
    }

    impl CannedIndex {
        fn returning(results: Vec<String>) -> Self {
            let id = IndexedField::text("id")
                .exact("id")
                .build(|value: &String| Ok(Some(value.clone())))
                .unwrap();
            CannedIndex {
                schema: Schema::builder(1).add_field(id).build().unwrap(),
                results: Mutex::new(results),
            }
        }
    }

    struct CannedSource {
        results: Vec<String>,
    }

    #[async_trait]
    impl DataSource<String> for CannedSource {
        fn cardinality(&self) -> usize {
            self.results.len()
        }

        async fn fetch(&self) -> Result<Vec<String>, StorageError> {
            Ok(self.results.clone())
        }
    }

    #[async_trait]
    impl Index<String, String> for CannedIndex {
        fn schema(&self) -> &Schema<String> {
            &self.schema
        }

        fn key_of(&self, value: &String) -> String {
            value.clone()
        }

        fn key_predicate(&self, key: &String) -> Predicate {
            let spec = self.schema.search_spec("id").unwrap();
            Predicate::Field(FieldPredicate::for_spec(
                spec,
                FieldValue::Text(key.clone()),
            ))
        }

        async fn replace(&self, _value: &String) -> Result<(), StorageError> {
            Ok(())
        }

        async fn delete(&self, _key: &String) -> Result<(), StorageError> {
            Ok(())
        }

        async fn delete_all(&self) -> Result<(), StorageError> {
            Ok(())
        }

        fn get_source(
            &self,
            _predicate: Predicate,
            _options: QueryOptions,
        ) -> Result<Box<dyn DataSource<String>>, QueryParseError> {
            let results = self.results.lock().unwrap().clone();
            Ok(Box::new(CannedSource { results }))
        }

        fn mark_ready(&self, _ready: bool) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn options() -> QueryOptions {
        QueryOptions::create(IndexConfig::default(), 0, 10, 10, None).unwrap()
    }

    #[tokio::test]
    async fn test_get_absent_key() {
        let index = CannedIndex::returning(Vec::new());
        let found = index.get(&"I123".to_string(), options()).await.unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_get_unique_key() {
        let index = CannedIndex::returning(vec!["I123".to_string()]);
        let found = index.get(&"I123".to_string(), options()).await.unwrap();
        assert_eq!(found, Some("I123".to_string()));
    }

    #[tokio::test]
    async fn test_get_duplicated_key_is_an_inconsistency() {
        let index = CannedIndex::returning(vec!["I123".to_string(), "I123".to_string()]);
        let get_err = index.get(&"I123".to_string(), options()).await.unwrap_err();
        assert!(matches!(get_err, StorageError::Inconsistent(_)));
        assert!(get_err.to_string().contains("I123"));
    }
}
