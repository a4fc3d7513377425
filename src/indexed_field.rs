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

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZeroU32;
use std::sync::Arc;

use anyhow::{anyhow, bail, ensure};
use once_cell::sync::Lazy;
use prost::Message;
use regex::Regex;
use time::OffsetDateTime;

use crate::error::FieldError;
use crate::field_type::{storage_field_type, FieldKind, FieldType, SearchOption};
use crate::stored_value::StoredValue;
use crate::value::{FieldValue, IndexableValue, Protobuf};

/// Pattern a field or search-spec name must match.
pub const FIELD_NAME_PATTERN: &str = r"^[a-z0-9_]+$";

static FIELD_NAME_PTN: Lazy<Regex> =
    Lazy::new(|| Regex::new(FIELD_NAME_PATTERN).expect("the field name pattern is valid"));

/// Validates a field or search-spec name.
///
/// A name may only contain lowercase ASCII letters, digits, and underscores,
/// and must not be empty.
pub fn validate_field_name(name: &str) -> anyhow::Result<()> {
    ensure!(FIELD_NAME_PTN.is_match(name), "illegal field name: `{name}`");
    Ok(())
}

type Getter<I> = Box<dyn Fn(&I) -> Result<Option<Vec<FieldValue>>, FieldError> + Send + Sync>;
type Setter<I> = Box<dyn Fn(&mut I, &dyn StoredValue) -> bool + Send + Sync>;

/// One search tokenization declared on an [`IndexedField`].
///
/// A field commonly has a base spec reusing the field's own name, plus
/// optional aliases using different names for different tokenizations. The
/// concrete storage [`FieldType`] is derived once, at declaration time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SearchSpec {
    name: String,
    search_option: SearchOption,
    stored: bool,
    field_type: FieldType,
}

impl SearchSpec {
    /// The name queries address this tokenization by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tokenization intent declared by the schema author.
    pub fn search_option(&self) -> SearchOption {
        self.search_option
    }

    /// Whether this spec's value is retrievable verbatim from the index.
    pub fn is_stored(&self) -> bool {
        self.stored
    }

    /// The storage type backing this tokenization.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }
}

/// Definition of one field stored in a secondary index: a named, typed
/// extraction rule from a domain object, an optional reverse rule used
/// during reconstruction, and the search tokenizations declared on it.
///
/// Fields are declared through the typed constructors ([`IndexedField::text`],
/// [`IndexedField::integer`], ...) and are immutable once built. Identity is
/// `Arc` identity: two schema generations share a field by sharing the same
/// `Arc`, and [`Schema::get_field`](crate::Schema::get_field) treats a
/// same-named but distinct definition as a fatal declaration error.
pub struct IndexedField<I> {
    name: String,
    description: Option<String>,
    kind: FieldKind,
    required: bool,
    size: Option<NonZeroU32>,
    search_specs: BTreeMap<String, SearchSpec>,
    getter: Getter<I>,
    setter: Option<Setter<I>>,
}

impl<I> fmt::Debug for IndexedField<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedField")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("size", &self.size)
            .field("search_specs", &self.search_specs.keys().collect::<Vec<_>>())
            .field("has_setter", &self.setter.is_some())
            .finish()
    }
}

impl<I: 'static> IndexedField<I> {
    /// Starts the declaration of a single-string field.
    pub fn text(name: impl Into<String>) -> FieldBuilder<I, String> {
        FieldBuilder::new(name)
    }

    /// Starts the declaration of a repeated-string field.
    pub fn texts(name: impl Into<String>) -> FieldBuilder<I, Vec<String>> {
        FieldBuilder::new(name)
    }

    /// Starts the declaration of a single 32-bit integer field.
    pub fn integer(name: impl Into<String>) -> FieldBuilder<I, i32> {
        FieldBuilder::new(name)
    }

    /// Starts the declaration of a repeated 32-bit integer field.
    pub fn integers(name: impl Into<String>) -> FieldBuilder<I, Vec<i32>> {
        FieldBuilder::new(name)
    }

    /// Starts the declaration of a single 64-bit integer field.
    pub fn long(name: impl Into<String>) -> FieldBuilder<I, i64> {
        FieldBuilder::new(name)
    }

    /// Starts the declaration of a repeated 64-bit integer field.
    pub fn longs(name: impl Into<String>) -> FieldBuilder<I, Vec<i64>> {
        FieldBuilder::new(name)
    }

    /// Starts the declaration of a timestamp field. Timestamps are
    /// non-repeatable by construction.
    pub fn timestamp(name: impl Into<String>) -> FieldBuilder<I, OffsetDateTime> {
        FieldBuilder::new(name)
    }

    /// Starts the declaration of a single byte-string field.
    pub fn bytes(name: impl Into<String>) -> FieldBuilder<I, Vec<u8>> {
        FieldBuilder::new(name)
    }

    /// Starts the declaration of a repeated byte-string field.
    pub fn byte_arrays(name: impl Into<String>) -> FieldBuilder<I, Vec<Vec<u8>>> {
        FieldBuilder::new(name)
    }

    /// Starts the declaration of a protobuf message field.
    pub fn message<M>(name: impl Into<String>) -> FieldBuilder<I, Protobuf<M>>
    where M: Message + Default + 'static {
        FieldBuilder::new(name)
    }

    /// Starts the declaration of a repeated protobuf message field.
    pub fn messages<M>(name: impl Into<String>) -> FieldBuilder<I, Vec<Protobuf<M>>>
    where M: Message + Default + 'static {
        FieldBuilder::new(name)
    }

    /// The name this field is stored under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Optional description of the field data.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The shape of the value this field extracts.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// True iff this field holds zero or more elements. Always derived from
    /// the field's kind, never declared independently.
    pub fn is_repeatable(&self) -> bool {
        self.kind.is_repeatable()
    }

    /// True if this field is mandatory. Advisory for this layer: enforcement
    /// is the indexer's responsibility.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Optional bound on the value length. For repeatable fields the bound
    /// applies to each element separately.
    pub fn size(&self) -> Option<NonZeroU32> {
        self.size
    }

    /// All search tokenizations declared on this field, keyed by spec name.
    pub fn search_specs(&self) -> &BTreeMap<String, SearchSpec> {
        &self.search_specs
    }

    /// Looks up one search tokenization by name.
    pub fn search_spec(&self, name: &str) -> Option<&SearchSpec> {
        self.search_specs.get(name)
    }

    /// Extracts this field's value(s) from the input object.
    ///
    /// `Ok(None)` means the field is absent on this object; absence is never
    /// reported through the error channel.
    pub fn get(&self, input: &I) -> Result<Option<Vec<FieldValue>>, FieldError> {
        (self.getter)(input)
    }

    /// Attempts to reconstruct this field's value from a stored index
    /// document and push it onto `object`.
    ///
    /// Returns false when the field declares no setter (index-only fields)
    /// or when the document holds no compatible value.
    pub fn set_if_possible(&self, object: &mut I, doc: &dyn StoredValue) -> bool {
        match &self.setter {
            Some(setter) => setter(object, doc),
            None => false,
        }
    }
}

/// Builder for an [`IndexedField`], parameterized by the typed value shape
/// `T` the getter produces.
///
/// The field's kind and repeatability are derived from `T`; they cannot be
/// declared independently of the type.
pub struct FieldBuilder<I, T> {
    name: String,
    description: Option<String>,
    required: bool,
    size: Option<NonZeroU32>,
    specs: Vec<(String, SearchOption, bool)>,
    _values: PhantomData<fn(&I) -> T>,
}

impl<I, T> FieldBuilder<I, T>
where
    I: 'static,
    T: IndexableValue + 'static,
{
    fn new(name: impl Into<String>) -> Self {
        FieldBuilder {
            name: name.into(),
            description: None,
            required: false,
            size: None,
            specs: Vec::new(),
            _values: PhantomData,
        }
    }

    /// Attaches a human-readable description to the field.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the field as mandatory.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Bounds the length of each value element.
    pub fn size(mut self, size: NonZeroU32) -> Self {
        self.size = Some(size);
        self
    }

    fn spec(mut self, name: impl Into<String>, option: SearchOption, stored: bool) -> Self {
        self.specs.push((name.into(), option, stored));
        self
    }

    /// Declares an exact-match tokenization.
    pub fn exact(self, name: impl Into<String>) -> Self {
        self.spec(name, SearchOption::Exact, false)
    }

    /// Declares an exact-match tokenization whose value is also stored.
    pub fn stored_exact(self, name: impl Into<String>) -> Self {
        self.spec(name, SearchOption::Exact, true)
    }

    /// Declares a full-text tokenization.
    pub fn full_text(self, name: impl Into<String>) -> Self {
        self.spec(name, SearchOption::FullText, false)
    }

    /// Declares a full-text tokenization whose value is also stored.
    pub fn stored_full_text(self, name: impl Into<String>) -> Self {
        self.spec(name, SearchOption::FullText, true)
    }

    /// Declares a prefix tokenization.
    pub fn prefix(self, name: impl Into<String>) -> Self {
        self.spec(name, SearchOption::Prefix, false)
    }

    /// Declares a prefix tokenization whose value is also stored.
    pub fn stored_prefix(self, name: impl Into<String>) -> Self {
        self.spec(name, SearchOption::Prefix, true)
    }

    /// Declares a range tokenization. Only legal on scalar integer and
    /// timestamp fields.
    pub fn range(self, name: impl Into<String>) -> Self {
        self.spec(name, SearchOption::Range, false)
    }

    /// Declares a range tokenization whose value is also stored.
    pub fn stored_range(self, name: impl Into<String>) -> Self {
        self.spec(name, SearchOption::Range, true)
    }

    /// Declares a store-only entry: the value is retrievable verbatim but
    /// never searchable.
    pub fn stored_only(self, name: impl Into<String>) -> Self {
        self.spec(name, SearchOption::StoreOnly, true)
    }

    /// Builds a search-only field: indexed, but never reconstructed into a
    /// domain object.
    pub fn build<G>(self, getter: G) -> anyhow::Result<Arc<IndexedField<I>>>
    where G: Fn(&I) -> Result<Option<T>, FieldError> + Send + Sync + 'static {
        self.build_inner(getter, None::<fn(&mut I, T)>)
    }

    /// Builds a field with both an extraction rule and a reconstruction
    /// rule.
    pub fn build_with_setter<G, S>(self, getter: G, setter: S) -> anyhow::Result<Arc<IndexedField<I>>>
    where
        G: Fn(&I) -> Result<Option<T>, FieldError> + Send + Sync + 'static,
        S: Fn(&mut I, T) + Send + Sync + 'static,
    {
        self.build_inner(getter, Some(setter))
    }

    fn build_inner<G, S>(self, getter: G, setter: Option<S>) -> anyhow::Result<Arc<IndexedField<I>>>
    where
        G: Fn(&I) -> Result<Option<T>, FieldError> + Send + Sync + 'static,
        S: Fn(&mut I, T) + Send + Sync + 'static,
    {
        validate_field_name(&self.name)?;
        let kind = T::KIND;

        let mut search_specs: BTreeMap<String, SearchSpec> = BTreeMap::new();
        for (spec_name, search_option, stored) in self.specs {
            validate_field_name(&spec_name)?;
            let field_type = storage_field_type(search_option, kind).ok_or_else(|| {
                anyhow!(
                    "search spec [{spec_name}, {search_option}] is not supported on field \
                     [{}, {kind}]",
                    self.name
                )
            })?;
            let search_spec = SearchSpec {
                name: spec_name,
                search_option,
                stored,
                field_type,
            };
            if let Some(duplicate) = search_specs.insert(search_spec.name.clone(), search_spec) {
                bail!(
                    "cannot add search spec `{}`: it is already defined on field `{}`",
                    duplicate.name,
                    self.name
                );
            }
        }

        let erased_getter: Getter<I> = Box::new(move |input| {
            Ok(getter(input)?.map(IndexableValue::into_field_values))
        });
        let erased_setter: Option<Setter<I>> = setter.map(|setter| {
            let erased: Setter<I> = Box::new(move |object: &mut I, doc: &dyn StoredValue| {
                match T::from_stored(doc) {
                    Some(value) => {
                        setter(object, value);
                        true
                    }
                    None => false,
                }
            });
            erased
        });

        Ok(Arc::new(IndexedField {
            name: self.name,
            description: self.description,
            kind,
            required: self.required,
            size: self.size,
            search_specs,
            getter: erased_getter,
            setter: erased_setter,
        }))
    }
}
