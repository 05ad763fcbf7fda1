use tracing::info;

use crate::config::{Account, Source};
use crate::error::{Error, Result};
use crate::source::SourceRegistry;

/// Count for one source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub source: String,
    pub account: String,
    pub count: u64,
}

/// Counts of one run, in source declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    entries: Vec<Entry>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: &str, account: &str, count: u64) {
        self.entries.push(Entry {
            source: source.to_string(),
            account: account.to_string(),
            count,
        });
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The one account named by `source`. Zero or several matches are an error.
pub fn resolve_account<'a>(source: &Source, accounts: &'a [Account]) -> Result<&'a Account> {
    let mut matching = accounts.iter().filter(|a| a.name == source.account);
    match (matching.next(), matching.count()) {
        (Some(account), 0) => Ok(account),
        (first, rest) => Err(Error::AccountNotFound {
            source_name: source.name.clone(),
            account: source.account.clone(),
            matches: usize::from(first.is_some()) + rest,
        }),
    }
}

/// Run every source in order. The first failure aborts the whole run.
pub async fn collect(
    sources: &[Source],
    accounts: &[Account],
    registry: &SourceRegistry,
) -> Result<Report> {
    let mut report = Report::new();

    for source in sources {
        let account = resolve_account(source, accounts)?;
        info!(source = %source.name, account = %account.name, kind = %source.kind, "processing source");

        let count = registry.dispatch(source, account).await?;
        report.push(&source.name, &account.name, count);
    }

    Ok(report)
}
