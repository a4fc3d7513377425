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

use std::num::NonZeroUsize;
use std::sync::Arc;

use index_schema::testing::RamIndex;
use index_schema::{
    FieldValueAccessor, Index, IndexConfig, IndexedField, QueryOptions, Schema, SiteIndexer,
    INDEX_TYPE_ENV_KEY,
};
use time::macros::datetime;
use time::OffsetDateTime;

#[derive(Clone, Debug, Default, PartialEq)]
struct Change {
    id: i32,
    topic: Option<String>,
    hashtags: Vec<String>,
    updated_at: Option<OffsetDateTime>,
}

fn id_field() -> Arc<IndexedField<Change>> {
    IndexedField::integer("id")
        .required()
        .stored_exact("id")
        .build_with_setter(
            |change: &Change| Ok(Some(change.id)),
            |change, id| change.id = id,
        )
        .unwrap()
}

fn topic_field() -> Arc<IndexedField<Change>> {
    IndexedField::text("topic")
        .stored_exact("topic")
        .full_text("topic_fuzzy")
        .build_with_setter(
            |change: &Change| Ok(change.topic.clone()),
            |change, topic| change.topic = Some(topic),
        )
        .unwrap()
}

fn hashtags_field() -> Arc<IndexedField<Change>> {
    IndexedField::texts("hashtag")
        .stored_exact("hashtag")
        .build_with_setter(
            |change: &Change| Ok(Some(change.hashtags.clone())),
            |change, hashtags| change.hashtags = hashtags,
        )
        .unwrap()
}

fn updated_at_field() -> Arc<IndexedField<Change>> {
    IndexedField::timestamp("updated_at")
        .range("updated_at")
        .build_with_setter(
            |change: &Change| Ok(change.updated_at),
            |change, updated_at| change.updated_at = Some(updated_at),
        )
        .unwrap()
}

fn sample_change(id: i32) -> Change {
    Change {
        id,
        topic: Some(format!("topic-{id}")),
        hashtags: vec!["perf".to_string()],
        updated_at: Some(datetime!(2024-03-20 17:45 UTC)),
    }
}

fn options() -> QueryOptions {
    QueryOptions::create(IndexConfig::default(), 0, 10, 10, None).unwrap()
}

#[test]
fn test_schema_evolution_across_generations() {
    let id = id_field();
    let topic = topic_field();
    let hashtags = hashtags_field();
    let updated_at = updated_at_field();

    let v10 = Schema::builder(10)
        .add_fields([id.clone(), topic.clone(), hashtags.clone()])
        .build()
        .unwrap();
    let v11 = Schema::builder_from(&v10)
        .remove_field("hashtag")
        .add_field(updated_at.clone())
        .build()
        .unwrap();
    assert_eq!(v11.version(), 11);

    // Unchanged fields are the same definition in both generations.
    assert!(Arc::ptr_eq(v10.fields().get("topic").unwrap(), &topic));
    assert!(Arc::ptr_eq(v11.fields().get("topic").unwrap(), &topic));

    // Query code written against the newest generation falls back for the
    // older one.
    let resolved = v11.get_field(&updated_at, &[&hashtags]).unwrap();
    assert!(Arc::ptr_eq(&resolved, &updated_at));
    let resolved = v10.get_field(&updated_at, &[&hashtags]).unwrap();
    assert!(Arc::ptr_eq(&resolved, &hashtags));

    assert!(v10.has_field(&hashtags));
    assert!(!v11.has_field(&hashtags));
}

#[tokio::test]
async fn test_end_to_end_replace_get_delete() {
    let schema = Schema::builder(1)
        .add_fields([id_field(), topic_field(), hashtags_field(), updated_at_field()])
        .build()
        .unwrap();
    let index = RamIndex::for_test(schema, "id", |change: &Change| change.id);
    index.mark_ready(true).unwrap();

    let change = sample_change(7);
    index.replace(&change).await.unwrap();
    assert_eq!(index.get(&7, options()).await.unwrap(), Some(change));

    index.delete(&7).await.unwrap();
    assert_eq!(index.get(&7, options()).await.unwrap(), None);
}

#[tokio::test]
async fn test_reconstruction_from_stored_document() {
    let schema = Schema::builder(1)
        .add_fields([id_field(), topic_field(), hashtags_field(), updated_at_field()])
        .build()
        .unwrap();
    let fields: Vec<_> = schema.fields().values().cloned().collect();
    let index = RamIndex::for_test(schema, "id", |change: &Change| change.id);

    let original = sample_change(7);
    index.replace(&original).await.unwrap();
    let stored = index.stored_doc(&7).unwrap();

    let mut reconstructed = Change::default();
    for field in &fields {
        if let Some(values) = stored.get(field.name()) {
            assert!(field.set_if_possible(&mut reconstructed, &FieldValueAccessor::new(values)));
        }
    }
    assert_eq!(reconstructed, original);
}

#[tokio::test]
async fn test_bulk_reindex_with_one_bad_document() {
    let schema = Schema::builder(1)
        .add_fields([id_field(), topic_field()])
        .build()
        .unwrap();
    let index = RamIndex::for_test(schema, "id", |change: &Change| change.id);
    index.fail_replace_of(42);

    let indexer = SiteIndexer::new(NonZeroUsize::new(8).unwrap());
    let result = indexer
        .index_all(&index, (1..=100).map(sample_change))
        .await;

    assert!(!result.success);
    assert_eq!(result.done_count, 99);
    assert_eq!(result.failed_count, 1);

    assert!(!index.contains(&42));
    assert_eq!(index.len(), 99);
    assert_eq!(
        index.get(&1, options()).await.unwrap(),
        Some(sample_change(1))
    );
    assert_eq!(
        index.get(&100, options()).await.unwrap(),
        Some(sample_change(100))
    );
}

#[test]
fn test_backend_type_env_override() {
    let config = IndexConfig::from_yaml("index:\n  type: lucene\n").unwrap();
    assert_eq!(config.backend_type(), "lucene");

    std::env::set_var(INDEX_TYPE_ENV_KEY, "fake");
    assert_eq!(config.backend_type(), "fake");

    // Blank overrides are ignored.
    std::env::set_var(INDEX_TYPE_ENV_KEY, "  ");
    assert_eq!(config.backend_type(), "lucene");

    std::env::remove_var(INDEX_TYPE_ENV_KEY);
    assert_eq!(config.backend_type(), "lucene");
}
