use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use datacat_formats::FileFormat;
use datafusion::prelude::{DataFrame, SessionContext};

use super::{file_ext, BlobEndpoint, WriteOptions};
use crate::{error::CatalogError, ledger::LedgerAction, version::Selection, Result};

/// Normalise the target name for `format`: `.json` becomes `.jsonl` and a
/// missing extension is appended.
pub(crate) fn target_path(path_after_prefix: &str, format: FileFormat) -> String {
    let format = format.write_format();
    let mut path = path_after_prefix.to_string();
    if format == FileFormat::JsonLines {
        if let Some(stem) = path.strip_suffix(".json") {
            tracing::info!("Changing file extension to .jsonl for line-delimited JSON.");
            path = format!("{}.jsonl", stem);
        }
    }
    let extension = format!(".{}", format.extension());
    if !path.ends_with(&extension) {
        path.push_str(&extension);
    }
    path
}

impl BlobEndpoint {
    /// Decode every blob of the resolved version(s) into one batch, stacking
    /// parts whose columns drifted with a diagonal concatenation.
    pub async fn get_record_batch(&self, version: &str, selection: Selection) -> Result<RecordBatch> {
        let blobs = self.version_blobs(version, selection, true).await?;
        let first = blobs
            .first()
            .ok_or_else(|| CatalogError::EmptyVersion(format!("{}/{}", self, version)))?;
        let format = FileFormat::from_extension(file_ext(&first.name))?;

        let payloads: Vec<Bytes> = self.fetch(&blobs).await?;
        self.ledger_entry(LedgerAction::Read).await?;
        Ok(format.decode_all(&payloads)?)
    }

    /// Lazy DataFusion view over [`BlobEndpoint::get_record_batch`].
    pub async fn get_dataframe(
        &self,
        ctx: &SessionContext,
        version: &str,
        selection: Selection,
    ) -> Result<DataFrame> {
        let batch = self.get_record_batch(version, selection).await?;
        Ok(ctx.read_batch(batch)?)
    }

    /// Encode `batches` as `format` and write them as a single blob.
    pub async fn save_record_batches(
        &self,
        batches: &[RecordBatch],
        path_after_prefix: &str,
        format: FileFormat,
        auto_version: bool,
    ) -> Result<String> {
        let data = format.encode(batches)?;
        self.write_blob(
            data,
            &target_path(path_after_prefix, format),
            WriteOptions {
                auto_version,
                append: false,
            },
        )
        .await
    }

    pub async fn save_dataframe(
        &self,
        df: DataFrame,
        path_after_prefix: &str,
        format: FileFormat,
        auto_version: bool,
    ) -> Result<String> {
        let batches = df.collect().await?;
        self.save_record_batches(&batches, path_after_prefix, format, auto_version)
            .await
    }
}
