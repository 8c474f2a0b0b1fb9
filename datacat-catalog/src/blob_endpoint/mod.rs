use std::{fmt::Display, sync::Arc};

use bytes::Bytes;
use datacat_object_storage::{BlobClient, BlobItem};

use crate::{
    error::CatalogError,
    ledger::{AccessLedger, LedgerAction, StorageLocation, LEDGER_NAMESPACE},
    version::{match_versions, Selection},
    Result,
};

mod download;
mod frames;
mod write;

pub use write::WriteOptions;

/// One versioned location in blob storage: `{prefix}/{version}/{files}`.
///
/// Every read or write through a non-ledger endpoint appends one entry to the
/// access ledger at `ledger_location`.
#[derive(Debug, Clone)]
pub struct BlobEndpoint {
    account: String,
    container: String,
    prefix: String,
    ledger_location: StorageLocation,
    namespace: String,
    client: Arc<dyn BlobClient>,
}

impl BlobEndpoint {
    pub fn new(
        account: impl Into<String>,
        container: impl Into<String>,
        prefix: &str,
        ledger_location: StorageLocation,
        namespace: impl Into<String>,
        client: Arc<dyn BlobClient>,
    ) -> Self {
        Self {
            account: account.into(),
            container: container.into(),
            prefix: prefix.strip_suffix('/').unwrap_or(prefix).to_string(),
            ledger_location,
            namespace: namespace.into(),
            client,
        }
    }

    /// The endpoint viewing the ledger stored at `location`. It never logs its own access.
    pub fn ledger_view(location: StorageLocation, client: Arc<dyn BlobClient>) -> Self {
        let prefix = location.prefix.clone();
        Self::new(
            location.account.clone(),
            location.container.clone(),
            &prefix,
            location,
            LEDGER_NAMESPACE,
            client,
        )
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn ledger_location(&self) -> &StorageLocation {
        &self.ledger_location
    }

    pub fn is_ledger(&self) -> bool {
        self.namespace == LEDGER_NAMESPACE
    }

    pub fn ledger(&self) -> AccessLedger {
        AccessLedger::new(self.ledger_location.clone(), self.client.clone())
    }

    pub(crate) fn client(&self) -> &Arc<dyn BlobClient> {
        &self.client
    }

    pub(crate) fn blob_path(&self, path_after_prefix: &str) -> String {
        format!("{}/{}", self.prefix, path_after_prefix.trim_start_matches('/'))
    }

    /// Append an access entry unless this endpoint is the ledger itself.
    pub async fn ledger_entry(&self, action: LedgerAction) -> Result<()> {
        if self.is_ledger() {
            return Ok(());
        }
        self.ledger().record(&self.namespace, action).await?;
        Ok(())
    }

    /// Version partitions directly below the prefix, newest first.
    pub async fn get_versions(&self) -> Result<Vec<String>> {
        let walk_path = format!("{}/", self.prefix);
        let items = self
            .client
            .walk_blobs(&self.account, &self.container, &walk_path)
            .await?;
        let mut versions: Vec<String> = items
            .into_iter()
            .filter(|item| item.is_prefix)
            .map(|item| {
                let name = item.name.strip_prefix(&walk_path).unwrap_or(&item.name);
                name.strip_suffix('/').unwrap_or(name).to_string()
            })
            .collect();
        versions.sort_by(|a, b| b.cmp(a));
        Ok(versions)
    }

    /// Resolve `version` to concrete partitions and list their blobs ordered by
    /// write time. The ledger endpoint has no versions and lists everything.
    pub(crate) async fn version_blobs(
        &self,
        version: &str,
        selection: Selection,
        announce: bool,
    ) -> Result<Vec<BlobItem>> {
        let walk_paths = if self.is_ledger() {
            vec![format!("{}/", self.prefix)]
        } else {
            let available = self.get_versions().await?;
            let resolved = match_versions(version, &available, selection)?;
            if announce {
                tracing::info!("Using version(s): {}", resolved.join(", "));
            }
            resolved
                .iter()
                .map(|v| format!("{}/{}/", self.prefix, v))
                .collect()
        };

        let mut blobs = vec![];
        for walk_path in &walk_paths {
            blobs.extend(
                self.client
                    .list_blobs(&self.account, &self.container, walk_path)
                    .await?,
            );
        }
        blobs.sort_by(|a, b| {
            a.last_modified
                .cmp(&b.last_modified)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(blobs)
    }

    async fn fetch(&self, blobs: &[BlobItem]) -> Result<Vec<Bytes>> {
        let mut payloads = Vec::with_capacity(blobs.len());
        for blob in blobs {
            payloads.push(
                self.client
                    .read_blob(&self.account, &self.container, &blob.name)
                    .await?,
            );
        }
        Ok(payloads)
    }

    /// Raw payloads of every blob in the resolved version(s), oldest blob first.
    pub async fn read_blobs(&self, version: &str, selection: Selection) -> Result<Vec<Bytes>> {
        let blobs = self.version_blobs(version, selection, true).await?;
        let payloads = self.fetch(&blobs).await?;
        self.ledger_entry(LedgerAction::Read).await?;
        Ok(payloads)
    }

    /// Extension of the first blob of the resolved version, without the dot.
    pub async fn get_file_ext(&self, version: &str) -> Result<String> {
        let blobs = self.version_blobs(version, Selection::Newest, false).await?;
        let first = blobs
            .first()
            .ok_or_else(|| CatalogError::EmptyVersion(format!("{}/{}", self, version)))?;
        Ok(file_ext(&first.name).to_string())
    }
}

pub(crate) fn file_ext(name: &str) -> &str {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or_default()
}

impl Display for BlobEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.account, self.container, self.prefix)
    }
}
