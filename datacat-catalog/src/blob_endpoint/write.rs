use std::path::Path;

use bytes::Bytes;
use datacat_object_storage::WriteMode;

use super::BlobEndpoint;
use crate::{error::CatalogError, ledger::LedgerAction, util, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Place the blobs under a fresh timestamp version. Ignored when appending.
    pub auto_version: bool,
    /// Append to the existing blob instead of replacing it.
    pub append: bool,
}

impl WriteOptions {
    pub fn auto_versioned() -> Self {
        Self {
            auto_version: true,
            append: false,
        }
    }

    pub fn appending() -> Self {
        Self {
            auto_version: false,
            append: true,
        }
    }
}

/// `data.csv` written as part 3 of 12 becomes `data_03.csv`.
pub(crate) fn partition_name(full_path: &str, idx: usize, total: usize) -> String {
    let width = total.to_string().len();
    let file_start = full_path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let (stem, ext) = match full_path[file_start..].rfind('.') {
        Some(dot) if dot > 0 => full_path.split_at(file_start + dot),
        _ => (full_path, ""),
    };
    format!("{}_{:0width$}{}", stem, idx, ext, width = width)
}

impl BlobEndpoint {
    pub(crate) fn versioned_path(&self, path_after_prefix: &str, options: WriteOptions) -> String {
        let path_after_prefix = path_after_prefix.trim_start_matches('/');
        if options.auto_version && !options.append {
            format!("{}/{}", util::version_timestamp(), path_after_prefix)
        } else {
            path_after_prefix.to_string()
        }
    }

    /// Write the buffers without touching the ledger, returning the blob names.
    pub(crate) async fn put_blobs(
        &self,
        buffers: Vec<Bytes>,
        path_after_prefix: &str,
        append: bool,
    ) -> Result<Vec<String>> {
        let full_path = self.blob_path(path_after_prefix);
        let total = buffers.len();
        let mode = if append {
            WriteMode::Append
        } else {
            WriteMode::Overwrite
        };

        let mut written = Vec::with_capacity(total);
        for (idx, buffer) in buffers.into_iter().enumerate() {
            let blob_name = if total > 1 && !append {
                partition_name(&full_path, idx, total)
            } else {
                full_path.clone()
            };
            self.client()
                .write_blob(self.account(), self.container(), &blob_name, buffer, mode)
                .await?;
            written.push(blob_name);
        }
        Ok(written)
    }

    /// Write one or more buffers under `path_after_prefix`.
    ///
    /// Several buffers are written as numbered partitions of the same file. The
    /// path should include the version segment unless `auto_version` is set.
    pub async fn write_blobs(
        &self,
        buffers: Vec<Bytes>,
        path_after_prefix: &str,
        options: WriteOptions,
    ) -> Result<Vec<String>> {
        if buffers.is_empty() {
            tracing::warn!("No buffers given for {}, nothing written", path_after_prefix);
            return Ok(vec![]);
        }
        let path = self.versioned_path(path_after_prefix, options);
        let written = self.put_blobs(buffers, &path, options.append).await?;
        self.ledger_entry(LedgerAction::Write).await?;
        Ok(written)
    }

    pub async fn write_blob(
        &self,
        buffer: Bytes,
        path_after_prefix: &str,
        options: WriteOptions,
    ) -> Result<String> {
        let mut written = self
            .write_blobs(vec![buffer], path_after_prefix, options)
            .await?;
        Ok(written.remove(0))
    }

    pub async fn save_file_to_blob(
        &self,
        file_path: &Path,
        path_after_prefix: &str,
        auto_version: bool,
    ) -> Result<String> {
        if !file_path.is_file() {
            return Err(CatalogError::LocalPathNotFound(file_path.to_path_buf()));
        }
        let data = tokio::fs::read(file_path).await?;
        self.write_blob(
            Bytes::from(data),
            path_after_prefix,
            WriteOptions {
                auto_version,
                append: false,
            },
        )
        .await
    }

    /// Upload every file below `dir_path`, keeping the relative layout. All
    /// files share one auto version and a single ledger entry.
    pub async fn save_dir_to_blob(
        &self,
        dir_path: &Path,
        path_after_prefix: &str,
        auto_version: bool,
    ) -> Result<Vec<String>> {
        if !dir_path.is_dir() {
            return Err(CatalogError::LocalPathNotFound(dir_path.to_path_buf()));
        }
        let base = self.versioned_path(
            path_after_prefix,
            WriteOptions {
                auto_version,
                append: false,
            },
        );
        let base = base.trim_end_matches('/');

        let mut written = vec![];
        for entry in walkdir::WalkDir::new(dir_path).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(dir_path) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let blob_path = if base.is_empty() {
                relative
            } else {
                format!("{}/{}", base, relative)
            };
            let data = tokio::fs::read(entry.path()).await?;
            written.extend(self.put_blobs(vec![Bytes::from(data)], &blob_path, false).await?);
        }

        if written.is_empty() {
            tracing::warn!("No files found in {}, nothing uploaded", dir_path.display());
            return Ok(written);
        }
        self.ledger_entry(LedgerAction::Write).await?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_endpoint::tests::{endpoint, ledger_len};

    #[test]
    fn partition_names_are_zero_padded() {
        assert_eq!(partition_name("p/v/data.csv", 3, 12), "p/v/data_03.csv");
        assert_eq!(partition_name("p/v/data.csv", 0, 2), "p/v/data_0.csv");
        assert_eq!(partition_name("p/v.1/data", 7, 100), "p/v.1/data_007");
        assert_eq!(partition_name("p/v/.hidden", 1, 2), "p/v/.hidden_1");
    }

    #[tokio::test]
    async fn multi_part_write_names_each_partition() {
        let endpoint = endpoint("p");
        let buffers: Vec<Bytes> = (0..11).map(|i| Bytes::from(format!("{}", i))).collect();
        let written = endpoint
            .write_blobs(buffers, "v1/data.csv", WriteOptions::default())
            .await
            .unwrap();

        assert_eq!(written.len(), 11);
        assert_eq!(written[0], "p/v1/data_00.csv");
        assert_eq!(written[10], "p/v1/data_10.csv");
        let mut unique = written.clone();
        unique.dedup();
        assert_eq!(unique.len(), 11);
        assert_eq!(ledger_len(&endpoint).await, 1);
    }

    #[tokio::test]
    async fn empty_write_leaves_no_trace() {
        let endpoint = endpoint("p");
        let written = endpoint
            .write_blobs(vec![], "v1/data.csv", WriteOptions::default())
            .await
            .unwrap();
        assert!(written.is_empty());
        assert!(endpoint.get_versions().await.unwrap().is_empty());
        assert_eq!(ledger_len(&endpoint).await, 0);
    }

    #[tokio::test]
    async fn appended_parts_share_one_blob() {
        let endpoint = endpoint("p");
        let written = endpoint
            .write_blobs(
                vec![Bytes::from("a\n"), Bytes::from("b\n")],
                "v1/log.txt",
                WriteOptions::appending(),
            )
            .await
            .unwrap();
        assert_eq!(written, vec!["p/v1/log.txt", "p/v1/log.txt"]);
        let payloads = endpoint
            .read_blobs("v1", crate::version::Selection::Newest)
            .await
            .unwrap();
        assert_eq!(payloads, vec![Bytes::from("a\nb\n")]);
    }

    #[tokio::test]
    async fn auto_version_prefixes_a_timestamp() {
        let endpoint = endpoint("p");
        let written = endpoint
            .write_blob(Bytes::from("x"), "/data.csv", WriteOptions::auto_versioned())
            .await
            .unwrap();
        let versions = endpoint.get_versions().await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].len(), "2024-01-31T13-05-00".len());
        assert_eq!(written, format!("p/{}/data.csv", versions[0]));
    }

    #[tokio::test]
    async fn missing_local_paths_are_rejected() {
        let endpoint = endpoint("p");
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.csv");
        let err = endpoint
            .save_file_to_blob(&missing, "v1/absent.csv", false)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::LocalPathNotFound(p) if p == missing));
        let err = endpoint
            .save_dir_to_blob(&dir.path().join("nope"), "v1", false)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::LocalPathNotFound(_)));
        assert_eq!(ledger_len(&endpoint).await, 0);
    }

    #[tokio::test]
    async fn directory_upload_keeps_layout_under_one_version() {
        let endpoint = endpoint("p");
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("a.csv"), "a\n1\n").unwrap();
        std::fs::write(dir.path().join("nested/b.csv"), "b\n2\n").unwrap();

        let written = endpoint.save_dir_to_blob(dir.path(), "run", true).await.unwrap();
        assert_eq!(written.len(), 2);

        let versions = endpoint.get_versions().await.unwrap();
        assert_eq!(versions.len(), 1);
        let version = &versions[0];
        assert_eq!(
            written,
            vec![
                format!("p/{}/run/a.csv", version),
                format!("p/{}/run/nested/b.csv", version),
            ]
        );
        assert_eq!(ledger_len(&endpoint).await, 1);
    }

    #[tokio::test]
    async fn single_file_upload() {
        let endpoint = endpoint("p");
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.csv");
        std::fs::write(&file, "a\n1\n").unwrap();
        let written = endpoint.save_file_to_blob(&file, "v1/a.csv", false).await.unwrap();
        assert_eq!(written, "p/v1/a.csv");
        assert_eq!(ledger_len(&endpoint).await, 1);
    }
}
