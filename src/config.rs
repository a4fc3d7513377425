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

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the configured backend type.
pub const INDEX_TYPE_ENV_KEY: &str = "INDEX_TYPE";

/// How an index backend paginates result sets.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationType {
    /// Offset-based pagination: pages are addressed by a start offset.
    #[default]
    Offset,
    /// Token-based pagination: each page carries an opaque resume token.
    SearchAfter,
    /// The backend does not paginate at all.
    None,
}

fn default_limit() -> u32 {
    1_000
}

fn default_unbounded() -> u32 {
    u32::MAX
}

fn default_max_terms() -> usize {
    1_024
}

fn default_page_size_multiplier() -> u32 {
    1
}

fn default_index_type() -> String {
    "memory".to_string()
}

/// Sizing and pagination limits shared by every index of a site, loaded from
/// the `index` section of the site configuration.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    #[serde(default = "default_limit")]
    default_limit: u32,
    #[serde(default = "default_unbounded")]
    max_limit: u32,
    #[serde(default = "default_unbounded")]
    max_pages: u32,
    #[serde(default = "default_unbounded")]
    max_page_size: u32,
    #[serde(default = "default_max_terms")]
    max_terms: usize,
    #[serde(default = "default_page_size_multiplier")]
    page_size_multiplier: u32,
    #[serde(rename = "type", default = "default_index_type")]
    index_type: String,
    #[serde(default)]
    pagination_type: PaginationType,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            default_limit: default_limit(),
            max_limit: default_unbounded(),
            max_pages: default_unbounded(),
            max_page_size: default_unbounded(),
            max_terms: default_max_terms(),
            page_size_multiplier: default_page_size_multiplier(),
            index_type: default_index_type(),
            pagination_type: PaginationType::default(),
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigRoot {
    #[serde(default)]
    index: IndexConfig,
}

impl IndexConfig {
    /// Parses the `index` section out of a YAML site configuration. A missing
    /// section yields the defaults.
    pub fn from_yaml(raw: &str) -> anyhow::Result<IndexConfig> {
        let root: ConfigRoot =
            serde_yaml::from_str(raw).context("failed to parse index configuration")?;
        root.index.validate()?;
        Ok(root.index)
    }

    /// Parses the `index` section out of a JSON site configuration.
    pub fn from_json(raw: &str) -> anyhow::Result<IndexConfig> {
        let root: ConfigRoot =
            serde_json::from_str(raw).context("failed to parse index configuration")?;
        root.index.validate()?;
        Ok(root.index)
    }

    /// Checks the configured limits for internal consistency.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.default_limit > 0, "`default_limit` must be positive");
        ensure!(self.max_limit > 0, "`max_limit` must be positive");
        ensure!(self.max_pages > 0, "`max_pages` must be positive");
        ensure!(self.max_page_size > 0, "`max_page_size` must be positive");
        ensure!(self.max_terms > 0, "`max_terms` must be positive");
        ensure!(
            self.page_size_multiplier > 0,
            "`page_size_multiplier` must be positive"
        );
        ensure!(
            self.default_limit <= self.max_limit,
            "`default_limit` ({}) must not exceed `max_limit` ({})",
            self.default_limit,
            self.max_limit
        );
        ensure!(!self.index_type.is_empty(), "`type` must not be empty");
        Ok(())
    }

    /// Limit applied to queries that do not request one.
    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    /// Hard cap on any query limit.
    pub fn max_limit(&self) -> u32 {
        self.max_limit
    }

    /// Hard cap on the number of pages a paginated query may fetch.
    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Hard cap on the backend page size.
    pub fn max_page_size(&self) -> u32 {
        self.max_page_size
    }

    /// Hard cap on the number of leaf terms in one query.
    pub fn max_terms(&self) -> usize {
        self.max_terms
    }

    /// Default page-size growth factor for paginated queries.
    pub fn page_size_multiplier(&self) -> u32 {
        self.page_size_multiplier
    }

    /// How backends of this site paginate.
    pub fn pagination_type(&self) -> PaginationType {
        self.pagination_type
    }

    /// The configured backend type, unless overridden by the `INDEX_TYPE`
    /// environment variable. A set but blank variable is ignored.
    pub fn backend_type(&self) -> String {
        if let Ok(from_env) = std::env::var(INDEX_TYPE_ENV_KEY) {
            let from_env = from_env.trim();
            if !from_env.is_empty() {
                return from_env.to_string();
            }
        }
        self.index_type.clone()
    }

    /// Overrides the hard cap on query limits.
    pub fn set_max_limit(&mut self, max_limit: u32) {
        self.max_limit = max_limit;
    }

    /// Overrides the hard cap on backend page sizes.
    pub fn set_max_page_size(&mut self, max_page_size: u32) {
        self.max_page_size = max_page_size;
    }

    /// Overrides the hard cap on leaf terms per query.
    pub fn set_max_terms(&mut self, max_terms: usize) {
        self.max_terms = max_terms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IndexConfig::default();
        assert_eq!(config.default_limit(), 1_000);
        assert_eq!(config.max_limit(), u32::MAX);
        assert_eq!(config.max_pages(), u32::MAX);
        assert_eq!(config.max_page_size(), u32::MAX);
        assert_eq!(config.max_terms(), 1_024);
        assert_eq!(config.page_size_multiplier(), 1);
        assert_eq!(config.pagination_type(), PaginationType::Offset);
        config.validate().unwrap();
    }

    #[test]
    fn test_from_yaml() {
        let config = IndexConfig::from_yaml(
            r#"
            index:
              type: lucene
              default_limit: 500
              max_limit: 10000
              max_terms: 2048
              pagination_type: search_after
            "#,
        )
        .unwrap();
        assert_eq!(config.default_limit(), 500);
        assert_eq!(config.max_limit(), 10_000);
        assert_eq!(config.max_terms(), 2_048);
        assert_eq!(config.pagination_type(), PaginationType::SearchAfter);
        // Unset knobs keep their defaults.
        assert_eq!(config.max_page_size(), u32::MAX);
    }

    #[test]
    fn test_from_yaml_missing_section_yields_defaults() {
        let config = IndexConfig::from_yaml("{}").unwrap();
        assert_eq!(config, IndexConfig::default());
    }

    #[test]
    fn test_from_json() {
        let config = IndexConfig::from_json(
            r#"{"index": {"type": "fake", "default_limit": 25, "max_limit": 100}}"#,
        )
        .unwrap();
        assert_eq!(config.default_limit(), 25);
        assert_eq!(config.max_limit(), 100);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let parse_err = IndexConfig::from_yaml(
            r#"
            index:
              default_limit: 10
              defualt_limit: 10
            "#,
        )
        .unwrap_err();
        assert!(parse_err.to_string().contains("failed to parse"));
    }

    #[test]
    fn test_validate_rejects_inconsistent_limits() {
        let config = IndexConfig::from_yaml(
            r#"
            index:
              default_limit: 200
              max_limit: 100
            "#,
        );
        assert!(config.is_err());

        let config = IndexConfig::from_yaml(
            r#"
            index:
              max_terms: 0
            "#,
        );
        assert!(config.is_err());
    }

    // Env-var interaction is covered in the integration tests to avoid
    // cross-test interference from set_var in parallel unit tests.
    #[test]
    fn test_backend_type_from_config() {
        let config = IndexConfig::from_yaml("index:\n  type: lucene\n").unwrap();
        if std::env::var(INDEX_TYPE_ENV_KEY).is_err() {
            assert_eq!(config.backend_type(), "lucene");
        }
    }
}
