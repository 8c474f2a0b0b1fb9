use std::{fmt::Display, str::FromStr};

use arrow::{
    compute::concat_batches, datatypes::SchemaRef, error::ArrowError, record_batch::RecordBatch,
};
use bytes::Bytes;

pub mod concat;
pub mod csv;
pub mod error;
pub mod json;
pub mod parquet;

pub use concat::diagonal_concat;
pub use error::FormatError;

pub type Result<T> = std::result::Result<T, FormatError>;

/// Tabular payload formats understood by blob endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Csv,
    /// A JSON array of records. Decode only, writes fall back to [`FileFormat::JsonLines`].
    Json,
    JsonLines,
    Parquet,
}

impl FileFormat {
    pub const SUPPORTED: [&'static str; 5] = ["parquet", "parq", "csv", "json", "jsonl"];

    /// Route a blob by its file extension (case insensitive, leading dot allowed).
    pub fn from_extension(extension: &str) -> Result<Self> {
        extension.parse()
    }

    /// The extension written for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Json => "json",
            FileFormat::JsonLines => "jsonl",
            FileFormat::Parquet => "parquet",
        }
    }

    /// The format actually produced when asked to write `self`.
    pub fn write_format(&self) -> FileFormat {
        match self {
            FileFormat::Json => FileFormat::JsonLines,
            other => *other,
        }
    }

    /// Decode one payload into a single batch.
    pub fn decode(&self, bytes: &Bytes) -> Result<RecordBatch> {
        match self {
            FileFormat::Csv => csv::decode(bytes),
            FileFormat::Json => json::decode_document(bytes),
            FileFormat::JsonLines => json::decode_lines(bytes),
            FileFormat::Parquet => parquet::decode(bytes),
        }
    }

    /// Decode several payloads and stack them with [`diagonal_concat`].
    pub fn decode_all(&self, payloads: &[Bytes]) -> Result<RecordBatch> {
        tracing::debug!("Decoding {} {} payload(s)", payloads.len(), self);
        let batches = payloads
            .iter()
            .map(|bytes| self.decode(bytes))
            .collect::<Result<Vec<_>>>()?;
        diagonal_concat(&batches)
    }

    pub fn encode(&self, batches: &[RecordBatch]) -> Result<Bytes> {
        if batches.is_empty() {
            return Err(FormatError::NoData);
        }
        match self.write_format() {
            FileFormat::Csv => csv::encode(batches),
            FileFormat::Parquet => parquet::encode(batches),
            _ => json::encode_lines(batches),
        }
    }
}

impl FromStr for FileFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim_start_matches('.').to_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "json" => Ok(FileFormat::Json),
            "jsonl" => Ok(FileFormat::JsonLines),
            "parquet" | "parq" => Ok(FileFormat::Parquet),
            other => Err(FormatError::UnsupportedFileFormat {
                format: other.to_string(),
                supported: FileFormat::SUPPORTED.join(", "),
            }),
        }
    }
}

impl Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

pub(crate) fn collect_batches(
    schema: SchemaRef,
    reader: impl Iterator<Item = std::result::Result<RecordBatch, ArrowError>>,
) -> Result<RecordBatch> {
    let batches = reader.collect::<std::result::Result<Vec<_>, ArrowError>>()?;
    Ok(concat_batches(&schema, &batches)?)
}
