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

use std::collections::BTreeSet;

use anyhow::ensure;

use crate::config::IndexConfig;
use crate::field_type::FieldType;
use crate::indexed_field::SearchSpec;
use crate::value::FieldValue;

/// A single comparison against one search spec of the index.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldPredicate {
    field: String,
    field_type: FieldType,
    value: FieldValue,
}

impl FieldPredicate {
    /// Builds a predicate against a declared search spec. The storage type
    /// is taken from the spec, so backends never have to re-derive it.
    pub fn for_spec(spec: &SearchSpec, value: FieldValue) -> Self {
        FieldPredicate {
            field: spec.name().to_string(),
            field_type: spec.field_type(),
            value,
        }
    }

    /// The search-spec name this predicate addresses.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The storage type of the addressed spec.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// The value to compare against.
    pub fn value(&self) -> &FieldValue {
        &self.value
    }
}

/// A backend-neutral boolean predicate tree over index fields.
///
/// Backends translate this tree into their native query language; shapes a
/// backend cannot evaluate must be rejected with
/// [`QueryParseError::Unsupported`](crate::QueryParseError::Unsupported).
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// All children must match.
    And(Vec<Predicate>),
    /// At least one child must match.
    Or(Vec<Predicate>),
    /// The child must not match.
    Not(Box<Predicate>),
    /// A leaf comparison.
    Field(FieldPredicate),
}

impl Predicate {
    /// Conjunction of several predicates.
    pub fn and(children: impl IntoIterator<Item = Predicate>) -> Predicate {
        Predicate::And(children.into_iter().collect())
    }

    /// Disjunction of several predicates.
    pub fn or(children: impl IntoIterator<Item = Predicate>) -> Predicate {
        Predicate::Or(children.into_iter().collect())
    }

    /// Negation of a predicate.
    pub fn not(child: Predicate) -> Predicate {
        Predicate::Not(Box::new(child))
    }

    /// Number of leaf comparisons in the tree. Backends enforce their term
    /// limits against this count.
    pub fn leaf_count(&self) -> usize {
        match self {
            Predicate::And(children) | Predicate::Or(children) => {
                children.iter().map(Predicate::leaf_count).sum()
            }
            Predicate::Not(child) => child.leaf_count(),
            Predicate::Field(_) => 1,
        }
    }
}

/// Pagination and projection parameters of one index query.
///
/// Options are created in caller terms (`start` is an offset into the result
/// set) and converted into backend terms with [`Self::convert_for_backend`]
/// right before the query is issued.
#[derive(Clone, Debug)]
pub struct QueryOptions {
    config: IndexConfig,
    start: u32,
    search_after: Option<String>,
    page_size: u32,
    page_size_multiplier: u32,
    limit: u32,
    fields: Option<BTreeSet<String>>,
}

impl QueryOptions {
    /// Creates query options, validating the pagination parameters.
    pub fn create(
        config: IndexConfig,
        start: u32,
        page_size: u32,
        limit: u32,
        fields: Option<BTreeSet<String>>,
    ) -> anyhow::Result<QueryOptions> {
        ensure!(limit > 0, "limit must be positive, got {limit}");
        ensure!(page_size > 0, "page size must be positive, got {page_size}");
        let page_size_multiplier = config.page_size_multiplier();
        Ok(QueryOptions {
            config,
            start,
            search_after: None,
            page_size,
            page_size_multiplier,
            limit,
            fields,
        })
    }

    /// Creates query options with the configuration's default limit.
    pub fn create_with_default_limit(
        config: IndexConfig,
        start: u32,
        page_size: u32,
        fields: Option<BTreeSet<String>>,
    ) -> anyhow::Result<QueryOptions> {
        let limit = config.default_limit();
        QueryOptions::create(config, start, page_size, limit, fields)
    }

    /// The index configuration these options were created against.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Offset of the first result to return, in caller terms.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Opaque resume token for search-after pagination, when set.
    pub fn search_after(&self) -> Option<&str> {
        self.search_after.as_deref()
    }

    /// Number of results fetched per backend page.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Growth factor applied to the page size on each successive page.
    pub fn page_size_multiplier(&self) -> u32 {
        self.page_size_multiplier
    }

    /// Maximum number of results the caller wants.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// The stored fields to return, or `None` for all of them.
    pub fn fields(&self) -> Option<&BTreeSet<String>> {
        self.fields.as_ref()
    }

    /// Returns a copy with a different start offset. A nonzero offset is
    /// incompatible with search-after pagination.
    pub fn with_start(&self, start: u32) -> QueryOptions {
        assert!(
            start == 0 || self.search_after.is_none(),
            "cannot combine a start offset with search-after pagination"
        );
        QueryOptions {
            start,
            ..self.clone()
        }
    }

    /// Returns a copy with a different limit. The limit must stay positive.
    pub fn with_limit(&self, limit: u32) -> QueryOptions {
        assert!(limit > 0, "limit must be positive, got {limit}");
        QueryOptions {
            limit,
            ..self.clone()
        }
    }

    /// Returns a copy resuming after the given opaque token instead of at an
    /// offset. Search-after pagination always restarts counting at zero.
    pub fn with_search_after(&self, search_after: impl Into<String>) -> QueryOptions {
        QueryOptions {
            start: 0,
            search_after: Some(search_after.into()),
            ..self.clone()
        }
    }

    /// Returns a copy with a different page-size growth factor.
    pub fn with_page_size_multiplier(&self, page_size_multiplier: u32) -> QueryOptions {
        assert!(
            page_size_multiplier > 0,
            "page size multiplier must be positive, got {page_size_multiplier}"
        );
        QueryOptions {
            page_size_multiplier,
            ..self.clone()
        }
    }

    /// Returns a copy with a different projection.
    pub fn with_fields(&self, fields: Option<BTreeSet<String>>) -> QueryOptions {
        QueryOptions {
            fields,
            ..self.clone()
        }
    }

    /// Returns options suitable for a unique-key lookup: no offset, no resume
    /// token, and a limit of two so that a duplicated key is detectable.
    pub fn single_result(&self) -> QueryOptions {
        QueryOptions {
            config: self.config.clone(),
            start: 0,
            search_after: None,
            page_size: 2,
            page_size_multiplier: 1,
            limit: 2,
            fields: self.fields.clone(),
        }
    }

    /// Rewrites these options from caller terms into backend terms.
    ///
    /// Backends fetch from offset zero and over-fetch by the caller's start
    /// offset, so `limit` and `page_size` both grow by `start` (saturating,
    /// then capped at the configured maxima) while `start` itself resets to
    /// zero. A search-after token is preserved unchanged.
    pub fn convert_for_backend(&self) -> QueryOptions {
        let limit = self
            .limit
            .saturating_add(self.start)
            .min(self.config.max_limit());
        let page_size = self
            .page_size
            .saturating_add(self.start)
            .min(self.config.max_page_size());
        QueryOptions {
            config: self.config.clone(),
            start: 0,
            search_after: self.search_after.clone(),
            page_size,
            page_size_multiplier: self.page_size_multiplier,
            limit,
            fields: self.fields.clone(),
        }
    }
}
