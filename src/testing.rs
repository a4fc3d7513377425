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

//! In-memory index backend for tests.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{QueryParseError, StorageError};
use crate::field_type::FieldType;
use crate::index::{DataSource, Index};
use crate::query::{FieldPredicate, Predicate, QueryOptions};
use crate::schema::Schema;
use crate::value::FieldValue;

struct StoredDoc<V> {
    document: V,
    stored_fields: BTreeMap<String, Vec<FieldValue>>,
}

/// An [`Index`] keeping all entries in memory.
///
/// Documents go through the full extraction path on `replace`, so tests
/// exercising a schema against this backend see exactly the stored shape a
/// real backend would. Key lookups are the only supported predicate: the
/// backend rejects anything else with [`QueryParseError::Unsupported`].
pub struct RamIndex<K, V> {
    schema: Schema<V>,
    key_spec: String,
    key_fn: Box<dyn Fn(&V) -> K + Send + Sync>,
    docs: Mutex<BTreeMap<K, StoredDoc<V>>>,
    failing_keys: Mutex<BTreeSet<K>>,
    ready: AtomicBool,
}

impl<K, V> RamIndex<K, V>
where
    K: Ord + Clone + fmt::Debug + fmt::Display + FromStr + Send + Sync + 'static,
    V: Clone + fmt::Debug + Send + Sync + 'static,
{
    /// Creates an in-memory index over `schema`, keyed by the search spec
    /// named `key_spec`.
    ///
    /// Panics when the schema declares no such spec.
    pub fn for_test(
        schema: Schema<V>,
        key_spec: impl Into<String>,
        key_fn: impl Fn(&V) -> K + Send + Sync + 'static,
    ) -> Self {
        let key_spec = key_spec.into();
        assert!(
            schema.search_spec(&key_spec).is_some(),
            "schema declares no search spec named `{key_spec}`"
        );
        RamIndex {
            schema,
            key_spec,
            key_fn: Box::new(key_fn),
            docs: Mutex::new(BTreeMap::new()),
            failing_keys: Mutex::new(BTreeSet::new()),
            ready: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent `replace` of the document with this key fail
    /// with [`StorageError::Unavailable`].
    pub fn fail_replace_of(&self, key: K) {
        self.failing_keys.lock().expect("poisoned lock").insert(key);
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.docs.lock().expect("poisoned lock").len()
    }

    /// True when the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when a document is stored under this key.
    pub fn contains(&self, key: &K) -> bool {
        self.docs.lock().expect("poisoned lock").contains_key(key)
    }

    /// The raw stored field values of the document under this key, as
    /// produced by the schema's extraction path.
    pub fn stored_doc(&self, key: &K) -> Option<BTreeMap<String, Vec<FieldValue>>> {
        self.docs
            .lock()
            .expect("poisoned lock")
            .get(key)
            .map(|doc| doc.stored_fields.clone())
    }

    /// Whether [`Index::mark_ready`] was last called with `true`.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    fn parse_key(&self, predicate: &Predicate) -> Result<K, QueryParseError> {
        let field_predicate = match predicate {
            Predicate::Field(field_predicate) if field_predicate.field() == self.key_spec => {
                field_predicate
            }
            unsupported => {
                return Err(QueryParseError::Unsupported(format!(
                    "ram index only answers key lookups on `{}`, got {unsupported:?}",
                    self.key_spec
                )));
            }
        };
        let raw_key = match field_predicate.value() {
            FieldValue::Text(text) => text.clone(),
            FieldValue::Int(num) => num.to_string(),
            FieldValue::Long(num) => num.to_string(),
            other => {
                return Err(QueryParseError::Unsupported(format!(
                    "ram index cannot use {other:?} as a key"
                )));
            }
        };
        K::from_str(&raw_key).map_err(|_| {
            QueryParseError::Unsupported(format!("malformed key value `{raw_key}`"))
        })
    }
}

struct RamSource<V> {
    results: Vec<V>,
}

#[async_trait]
impl<V: Clone + Send + Sync> DataSource<V> for RamSource<V> {
    fn cardinality(&self) -> usize {
        self.results.len()
    }

    async fn fetch(&self) -> Result<Vec<V>, StorageError> {
        Ok(self.results.clone())
    }
}

#[async_trait]
impl<K, V> Index<K, V> for RamIndex<K, V>
where
    K: Ord + Clone + fmt::Debug + fmt::Display + FromStr + Send + Sync + 'static,
    V: Clone + fmt::Debug + Send + Sync + 'static,
{
    fn schema(&self) -> &Schema<V> {
        &self.schema
    }

    fn key_of(&self, value: &V) -> K {
        (self.key_fn)(value)
    }

    fn key_predicate(&self, key: &K) -> Predicate {
        let spec = self
            .schema
            .search_spec(&self.key_spec)
            .expect("key spec was checked at construction");
        // The key value must be typed the way the spec stores it.
        let raw_key = key.to_string();
        let value = match spec.field_type() {
            FieldType::Integer | FieldType::IntegerRange => match raw_key.parse::<i32>() {
                Ok(num) => FieldValue::Int(num),
                Err(_) => FieldValue::Text(raw_key),
            },
            FieldType::Long => match raw_key.parse::<i64>() {
                Ok(num) => FieldValue::Long(num),
                Err(_) => FieldValue::Text(raw_key),
            },
            _ => FieldValue::Text(raw_key),
        };
        Predicate::Field(FieldPredicate::for_spec(spec, value))
    }

    async fn replace(&self, value: &V) -> Result<(), StorageError> {
        let key = self.key_of(value);
        if self.failing_keys.lock().expect("poisoned lock").contains(&key) {
            return Err(StorageError::Unavailable(format!(
                "injected failure replacing key `{key}`"
            )));
        }
        let stored_fields = self
            .schema
            .build_fields(value, &HashSet::new())?
            .into_iter()
            .map(|field_values| {
                (
                    field_values.field().name().to_string(),
                    field_values.values().to_vec(),
                )
            })
            .collect();
        self.docs.lock().expect("poisoned lock").insert(
            key,
            StoredDoc {
                document: value.clone(),
                stored_fields,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &K) -> Result<(), StorageError> {
        self.docs.lock().expect("poisoned lock").remove(key);
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StorageError> {
        self.docs.lock().expect("poisoned lock").clear();
        Ok(())
    }

    fn get_source(
        &self,
        predicate: Predicate,
        options: QueryOptions,
    ) -> Result<Box<dyn DataSource<V>>, QueryParseError> {
        let max_terms = options.config().max_terms();
        if predicate.leaf_count() > max_terms {
            return Err(QueryParseError::TooManyTerms {
                got: predicate.leaf_count(),
                max: max_terms,
            });
        }
        let key = self.parse_key(&predicate)?;
        let results: Vec<V> = self
            .docs
            .lock()
            .expect("poisoned lock")
            .get(&key)
            .map(|doc| doc.document.clone())
            .into_iter()
            .skip(options.start() as usize)
            .take(options.limit() as usize)
            .collect();
        Ok(Box::new(RamSource { results }))
    }

    fn mark_ready(&self, ready: bool) -> Result<(), StorageError> {
        self.ready.store(ready, Ordering::Relaxed);
        Ok(())
    }
}
