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
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{error, info};

use crate::index::Index;

/// Receives running completion counts while a bulk reindex is underway.
pub trait ProgressReporter: Send + Sync {
    /// Called after each document finishes, with the total number of
    /// documents handled so far (successes and failures combined).
    fn update(&self, completed: u64);
}

/// Outcome of one bulk reindex run.
#[derive(Clone, Debug, Serialize)]
pub struct IndexAllResult {
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
    /// True iff every document was indexed.
    pub success: bool,
    /// Number of documents successfully indexed.
    pub done_count: u64,
    /// Number of documents that failed to index.
    pub failed_count: u64,
}

/// Drives a bulk reindex: feeds every document of a site into an [`Index`]
/// with bounded concurrency, counting successes and failures.
///
/// A failing document is logged and counted but never aborts the run; the
/// final [`IndexAllResult`] tells the caller whether the index is complete.
pub struct SiteIndexer {
    concurrency: NonZeroUsize,
    progress: Option<Arc<dyn ProgressReporter>>,
}

impl SiteIndexer {
    /// Creates a site indexer writing up to `concurrency` documents at once.
    pub fn new(concurrency: NonZeroUsize) -> Self {
        SiteIndexer {
            concurrency,
            progress: None,
        }
    }

    /// Attaches a progress reporter.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Indexes every document in `documents`, replacing existing entries.
    pub async fn index_all<K, V, I>(
        &self,
        index: &I,
        documents: impl IntoIterator<Item = V>,
    ) -> IndexAllResult
    where
        I: Index<K, V>,
        K: fmt::Debug + Send + Sync,
        V: Send + Sync,
    {
        let started_at = Instant::now();
        let mut done_count: u64 = 0;
        let mut failed_count: u64 = 0;

        let mut outcomes = stream::iter(documents.into_iter().map(|document| async move {
            let key = index.key_of(&document);
            let outcome = index.replace(&document).await;
            (key, outcome)
        }))
        .buffer_unordered(self.concurrency.get());

        while let Some((key, outcome)) = outcomes.next().await {
            match outcome {
                Ok(()) => done_count += 1,
                Err(replace_err) => {
                    failed_count += 1;
                    error!(key = ?key, error = ?replace_err, "failed to index document");
                }
            }
            if let Some(progress) = &self.progress {
                progress.update(done_count + failed_count);
            }
        }

        let result = IndexAllResult {
            elapsed: started_at.elapsed(),
            success: failed_count == 0,
            done_count,
            failed_count,
        };
        info!(
            done = result.done_count,
            failed = result.failed_count,
            elapsed_secs = result.elapsed.as_secs(),
            "bulk reindex finished"
        );
        result
    }
}
