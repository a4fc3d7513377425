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

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use anyhow::bail;
use tracing::error;

use crate::error::{FieldError, StorageError};
use crate::indexed_field::{IndexedField, SearchSpec};
use crate::value::FieldValue;

/// The values one field extracted from one domain object, paired with the
/// field definition that produced them.
#[derive(Clone)]
pub struct FieldValues<I> {
    field: Arc<IndexedField<I>>,
    values: Vec<FieldValue>,
}

impl<I: 'static> FieldValues<I> {
    /// The field definition these values were extracted by.
    pub fn field(&self) -> &Arc<IndexedField<I>> {
        &self.field
    }

    /// The extracted values. Scalar fields yield at most one element.
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }
}

impl<I: 'static> fmt::Debug for FieldValues<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldValues")
            .field("field", &self.field.name())
            .field("values", &self.values)
            .finish()
    }
}

impl<I> PartialEq for FieldValues<I> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.field, &other.field) && self.values == other.values
    }
}

/// One immutable, versioned generation of an index layout: a set of
/// [`IndexedField`] definitions keyed by field name.
///
/// Successive generations share unchanged field definitions by sharing the
/// same `Arc`s; a redefined field is a new `Arc`. Field lookups across
/// generations rely on that identity, see [`Schema::get_field`].
pub struct Schema<I> {
    version: u32,
    use_legacy_numeric_fields: bool,
    fields: BTreeMap<String, Arc<IndexedField<I>>>,
}

impl<I> fmt::Debug for Schema<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("version", &self.version)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<I: 'static> Schema<I> {
    /// Starts a new schema generation at an explicit version.
    pub fn builder(version: u32) -> SchemaBuilder<I> {
        SchemaBuilder {
            version,
            use_legacy_numeric_fields: false,
            fields: Vec::new(),
            removed: Vec::new(),
        }
    }

    /// Starts the next schema generation from an existing one: same fields,
    /// version bumped by one.
    pub fn builder_from(prior: &Schema<I>) -> SchemaBuilder<I> {
        SchemaBuilder {
            version: prior.version + 1,
            use_legacy_numeric_fields: prior.use_legacy_numeric_fields,
            fields: prior.fields.values().cloned().collect(),
            removed: Vec::new(),
        }
    }

    /// The version number of this schema generation.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// True when numeric fields are written in the backend's legacy numeric
    /// encoding instead of the current one.
    pub fn use_legacy_numeric_fields(&self) -> bool {
        self.use_legacy_numeric_fields
    }

    /// All field definitions, keyed by field name.
    pub fn fields(&self) -> &BTreeMap<String, Arc<IndexedField<I>>> {
        &self.fields
    }

    /// Looks up a search spec across every field of this schema.
    pub fn search_spec(&self, spec_name: &str) -> Option<&SearchSpec> {
        self.fields
            .values()
            .find_map(|field| field.search_spec(spec_name))
    }

    /// Returns the preferred field if this schema contains it, otherwise the
    /// first present fallback.
    ///
    /// The arguments are field definitions, not names: a schema "contains" a
    /// field only when it holds the very same `Arc`. Finding a same-named but
    /// distinct definition means two generations disagree about what the name
    /// means, which is a declaration bug, and this method panics rather than
    /// letting queries run against the wrong definition.
    pub fn get_field(
        &self,
        preferred: &Arc<IndexedField<I>>,
        fallbacks: &[&Arc<IndexedField<I>>],
    ) -> Option<Arc<IndexedField<I>>> {
        std::iter::once(preferred)
            .chain(fallbacks.iter().copied())
            .find(|field| self.has_field(field))
            .cloned()
    }

    /// True iff this schema contains exactly this field definition.
    ///
    /// Panics when the schema holds a different definition under the same
    /// name, see [`Schema::get_field`].
    pub fn has_field(&self, field: &Arc<IndexedField<I>>) -> bool {
        match self.fields.get(field.name()) {
            Some(own_field) => {
                assert!(
                    Arc::ptr_eq(own_field, field),
                    "schema version {} holds a different definition of field `{}`",
                    self.version,
                    field.name()
                );
                true
            }
            None => false,
        }
    }

    /// Extracts every field of this schema from `input`, skipping the field
    /// names listed in `skip_fields`.
    ///
    /// Faults are handled per their classification: an extractor fault drops
    /// only the faulty field and is logged, while a storage fault aborts the
    /// whole document so the caller can retry it later. Fields whose getter
    /// reports absence are omitted from the result.
    pub fn build_fields(
        &self,
        input: &I,
        skip_fields: &HashSet<String>,
    ) -> Result<Vec<FieldValues<I>>, StorageError>
    where
        I: fmt::Debug,
    {
        let mut all_field_values = Vec::with_capacity(self.fields.len());
        for field in self.fields.values() {
            if skip_fields.contains(field.name()) {
                continue;
            }
            match field.get(input) {
                Ok(Some(values)) => all_field_values.push(FieldValues {
                    field: field.clone(),
                    values,
                }),
                Ok(None) => {}
                Err(FieldError::Extract(extract_err)) => {
                    error!(
                        field = field.name(),
                        input = ?input,
                        error = ?extract_err,
                        "field extractor failed, dropping field from document"
                    );
                }
                Err(FieldError::Storage(storage_err)) => return Err(storage_err),
            }
        }
        Ok(all_field_values)
    }
}

/// Builder for one [`Schema`] generation.
pub struct SchemaBuilder<I> {
    version: u32,
    use_legacy_numeric_fields: bool,
    fields: Vec<Arc<IndexedField<I>>>,
    removed: Vec<String>,
}

impl<I: 'static> SchemaBuilder<I> {
    /// Overrides the version number.
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Selects the backend's legacy numeric encoding for numeric fields.
    pub fn legacy_numeric_fields(mut self, use_legacy: bool) -> Self {
        self.use_legacy_numeric_fields = use_legacy;
        self
    }

    /// Adds one field definition.
    pub fn add_field(mut self, field: Arc<IndexedField<I>>) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds several field definitions.
    pub fn add_fields(mut self, fields: impl IntoIterator<Item = Arc<IndexedField<I>>>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Removes an inherited field by name. Removing a name this generation
    /// does not carry is a declaration error reported by [`Self::build`].
    pub fn remove_field(mut self, name: impl Into<String>) -> Self {
        self.removed.push(name.into());
        self
    }

    /// Validates and freezes the schema generation.
    pub fn build(self) -> anyhow::Result<Schema<I>> {
        let mut fields: BTreeMap<String, Arc<IndexedField<I>>> = BTreeMap::new();
        for field in self.fields {
            let field_name = field.name().to_string();
            if fields.insert(field_name.clone(), field).is_some() {
                bail!(
                    "schema version {} defines field `{field_name}` more than once",
                    self.version
                );
            }
        }
        for removed_name in self.removed {
            if fields.remove(&removed_name).is_none() {
                bail!(
                    "schema version {} removes unknown field `{removed_name}`",
                    self.version
                );
            }
        }
        Ok(Schema {
            version: self.version,
            use_legacy_numeric_fields: self.use_legacy_numeric_fields,
            fields,
        })
    }
}
