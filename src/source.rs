//! Sources turn a configured query into a message count.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::{Account, Source};
use crate::error::{Error, Result};
use crate::mail;
use crate::search;

#[async_trait]
pub trait SourceHandler: Send + Sync {
    /// Number of messages matching `source` in `account`.
    async fn count(&self, source: &Source, account: &Account) -> Result<u64>;
}

/// Source handlers keyed by the `type` tag used in the configuration.
pub struct SourceRegistry {
    handlers: HashMap<String, Box<dyn SourceHandler>>,
}

impl SourceRegistry {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with every source type mailstat ships with.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("imap", ImapSource);
        registry
    }

    pub fn register(&mut self, kind: &str, handler: impl SourceHandler + 'static) {
        self.handlers.insert(kind.to_string(), Box::new(handler));
    }

    pub async fn dispatch(&self, source: &Source, account: &Account) -> Result<u64> {
        let handler = self
            .handlers
            .get(&source.kind)
            .ok_or_else(|| Error::UnknownSourceType {
                source_name: source.name.clone(),
                kind: source.kind.clone(),
            })?;
        handler.count(source, account).await
    }
}

pub struct ImapSource;

#[async_trait]
impl SourceHandler for ImapSource {
    async fn count(&self, source: &Source, account: &Account) -> Result<u64> {
        let tokens = search::parse_search(&source.search)?;
        let criteria = search::to_imap_criteria(&tokens)?;
        debug!(source = %source.name, %criteria, "imap search criteria");

        let account_c = account.clone();
        let folder = source.folder.clone();
        let count = tokio::task::spawn_blocking(move || {
            mail::imap::count_matching(&account_c, &folder, &criteria)
        })
        .await
        .map_err(|e| Error::source_failed(&source.name, e))?
        .map_err(|e| Error::source_failed(&source.name, e))?;

        info!(
            source = %source.name,
            account = %account.name,
            folder = %source.folder,
            count,
            "imap search done"
        );
        Ok(count)
    }
}
