use std::path::Path;

use super::BlobEndpoint;
use crate::{ledger::LedgerAction, version::Selection, Result};

impl BlobEndpoint {
    /// Mirror the resolved version(s) into `local_path` as `{version}/{files}`.
    ///
    /// Files already present locally are kept unless `force` is set. Returns
    /// whether anything was written; only then is a read logged.
    pub async fn download_version_to_local(
        &self,
        local_path: &Path,
        version: &str,
        force: bool,
        selection: Selection,
    ) -> Result<bool> {
        let blobs = self.version_blobs(version, selection, true).await?;
        let strip = format!("{}/", self.prefix());

        let mut written = false;
        for blob in &blobs {
            let relative = blob.name.strip_prefix(&strip).unwrap_or(&blob.name);
            let local_file = relative
                .split('/')
                .filter(|s| !s.is_empty())
                .fold(local_path.to_path_buf(), |path, segment| path.join(segment));
            if let Some(parent) = local_file.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            if !force && tokio::fs::try_exists(&local_file).await? {
                tracing::debug!("Skipping existing file {}", local_file.display());
                continue;
            }
            let data = self
                .client()
                .read_blob(self.account(), self.container(), &blob.name)
                .await?;
            tokio::fs::write(&local_file, &data).await?;
            written = true;
        }

        if written {
            self.ledger_entry(LedgerAction::Read).await?;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blob_endpoint::tests::{endpoint, ledger_len, put},
        version::LATEST,
    };

    #[tokio::test]
    async fn second_download_skips_existing_files() {
        let endpoint = endpoint("p");
        put(&endpoint, "p/2024-01-02/a.csv", "a\n1\n").await;
        put(&endpoint, "p/2024-01-02/sub/b.csv", "b\n2\n").await;
        put(&endpoint, "p/2024-01-01/a.csv", "old\n").await;
        let dir = tempfile::tempdir().unwrap();

        let first = endpoint
            .download_version_to_local(dir.path(), LATEST, false, Selection::Newest)
            .await
            .unwrap();
        assert!(first);
        let a = dir.path().join("2024-01-02/a.csv");
        assert_eq!(std::fs::read(&a).unwrap(), b"a\n1\n");
        assert!(dir.path().join("2024-01-02/sub/b.csv").is_file());
        assert!(!dir.path().join("2024-01-01").exists());

        std::fs::write(&a, "local edit").unwrap();
        let second = endpoint
            .download_version_to_local(dir.path(), LATEST, false, Selection::Newest)
            .await
            .unwrap();
        assert!(!second);
        assert_eq!(std::fs::read(&a).unwrap(), b"local edit");
        assert_eq!(ledger_len(&endpoint).await, 1);

        let forced = endpoint
            .download_version_to_local(dir.path(), LATEST, true, Selection::Newest)
            .await
            .unwrap();
        assert!(forced);
        assert_eq!(std::fs::read(&a).unwrap(), b"a\n1\n");
        assert_eq!(ledger_len(&endpoint).await, 2);
    }

    #[tokio::test]
    async fn full_range_downloads_every_version() {
        let endpoint = endpoint("p");
        put(&endpoint, "p/2024-01-01/a.csv", "1").await;
        put(&endpoint, "p/2024-01-02/a.csv", "2").await;
        let dir = tempfile::tempdir().unwrap();

        assert!(endpoint
            .download_version_to_local(dir.path(), LATEST, false, Selection::All)
            .await
            .unwrap());
        assert!(dir.path().join("2024-01-01/a.csv").is_file());
        assert!(dir.path().join("2024-01-02/a.csv").is_file());
    }
}
