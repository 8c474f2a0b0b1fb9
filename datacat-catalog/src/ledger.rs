//! Append-only access ledger: one JSON-lines blob per day recording who read or
//! wrote which dataset stage.

use std::{fmt::Display, sync::Arc};

use bytes::Bytes;
use datacat_object_storage::{BlobClient, WriteMode};
use serde::{Deserialize, Serialize};

use crate::{util, Result};

/// Namespace carried by the endpoint that views the ledger itself.
pub const LEDGER_NAMESPACE: &str = "ledger_endpoint";

/// An (account, container, prefix) triple in blob storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageLocation {
    pub account: String,
    pub container: String,
    pub prefix: String,
}

impl StorageLocation {
    pub fn new(
        account: impl Into<String>,
        container: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            container: container.into(),
            prefix: prefix.into(),
        }
    }
}

impl Display for StorageLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.account, self.container, self.prefix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerAction {
    Read,
    Write,
}

impl Display for LedgerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerAction::Read => write!(f, "read"),
            LedgerAction::Write => write!(f, "write"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: String,
    pub username: String,
    /// Dotted namespace of the endpoint that was accessed.
    pub dataset: String,
    pub action: LedgerAction,
}

impl LedgerEntry {
    pub fn now(dataset: impl Into<String>, action: LedgerAction) -> Self {
        Self {
            timestamp: util::ledger_timestamp(),
            username: datacat_config::CONFIG.username(),
            dataset: dataset.into(),
            action,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccessLedger {
    location: StorageLocation,
    client: Arc<dyn BlobClient>,
}

impl AccessLedger {
    pub fn new(location: StorageLocation, client: Arc<dyn BlobClient>) -> Self {
        Self { location, client }
    }

    pub fn location(&self) -> &StorageLocation {
        &self.location
    }

    /// Blob holding the entries of `date` (`YYYY-MM-DD`).
    pub fn blob_name(&self, date: &str) -> String {
        format!("{}/{}.jsonl", self.location.prefix.trim_end_matches('/'), date)
    }

    pub async fn append(&self, entry: &LedgerEntry) -> Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        let blob_name = self.blob_name(&util::today());
        self.client
            .write_blob(
                &self.location.account,
                &self.location.container,
                &blob_name,
                Bytes::from(line),
                WriteMode::Append,
            )
            .await?;
        tracing::debug!(
            "Ledger {} {} by {} -> {}",
            entry.action,
            entry.dataset,
            entry.username,
            blob_name
        );
        Ok(())
    }

    /// Record `action` on `dataset` as performed now by the configured user.
    pub async fn record(&self, dataset: &str, action: LedgerAction) -> Result<LedgerEntry> {
        let entry = LedgerEntry::now(dataset, action);
        self.append(&entry).await?;
        Ok(entry)
    }

    /// Entries logged on `date`, oldest first. A day without activity has none.
    pub async fn entries(&self, date: &str) -> Result<Vec<LedgerEntry>> {
        let bytes = match self
            .client
            .read_blob(&self.location.account, &self.location.container, &self.blob_name(date))
            .await
        {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut entries = vec![];
        for line in bytes.split(|b| *b == b'\n') {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            entries.push(serde_json::from_slice(line)?);
        }
        Ok(entries)
    }

    /// Dates with at least one entry, newest first.
    pub async fn dates(&self) -> Result<Vec<String>> {
        let prefix = format!("{}/", self.location.prefix.trim_end_matches('/'));
        let items = self
            .client
            .walk_blobs(&self.location.account, &self.location.container, &prefix)
            .await?;
        let mut dates: Vec<String> = items
            .into_iter()
            .filter(|item| !item.is_prefix)
            .filter_map(|item| {
                item.name
                    .strip_prefix(&prefix)
                    .and_then(|n| n.strip_suffix(".jsonl"))
                    .map(str::to_string)
            })
            .collect();
        dates.sort_by(|a, b| b.cmp(a));
        Ok(dates)
    }
}
