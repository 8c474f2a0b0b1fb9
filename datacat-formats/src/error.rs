use arrow::{datatypes::DataType, error::ArrowError};
use ::parquet::errors::ParquetError;

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("File format {format} not supported. Use one of: {supported}")]
    UnsupportedFileFormat { format: String, supported: String },
    #[error("Arrow error: {0}")]
    ArrowError(#[from] ArrowError),
    #[error("Parquet error: {0}")]
    ParquetError(#[from] ParquetError),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Expected a JSON array of records or a single record, found {0}")]
    InvalidJsonDocument(String),
    #[error("Cannot find a common super type for {left} and {right} in column {column_name}")]
    NoCommonSuperType {
        left: DataType,
        right: DataType,
        column_name: String,
    },
    #[error("No record batches provided")]
    NoData,
}
