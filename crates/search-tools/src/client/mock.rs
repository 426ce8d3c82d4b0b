//! Mock Lookup Client
//!
//! For testing and offline demos. Returns canned documents and remembers
//! every query and config it was called with.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::LookupClient;
use crate::error::{LookupError, Result};
use crate::model::{Document, LookupConfig};

/// A recorded lookup
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedLookup {
    pub query: String,
    pub config: LookupConfig,
}

#[derive(Default)]
pub struct MockLookupClient {
    documents: Vec<Document>,
    failure: Option<String>,
    calls: Mutex<Vec<RecordedLookup>>,
}

impl MockLookupClient {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            ..Self::default()
        }
    }

    /// Client whose every lookup fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Lookups received so far
    pub fn calls(&self) -> Vec<RecordedLookup> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl LookupClient for MockLookupClient {
    async fn lookup(&self, query: &str, config: &LookupConfig) -> Result<Vec<Document>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedLookup {
                query: query.to_string(),
                config: *config,
            });

        if let Some(message) = &self.failure {
            return Err(LookupError::Api(message.clone()));
        }
        Ok(self.documents.iter().take(config.top_k_results).cloned().collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
