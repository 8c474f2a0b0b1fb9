use std::path::PathBuf;

use datacat_formats::FormatError;
use datacat_object_storage::StorageError;
use datafusion::error::DataFusionError;

/// Schema violations in a single dataset configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required section '{0}'")]
    MissingSection(String),
    #[error("No storage stage section found, expected one of 'extract', 'load' or 'stage_*'")]
    NoStageSections,
    #[error("Invalid stage section '{stage}': {reason}")]
    InvalidStage { stage: String, reason: String },
    #[error("Invalid dataset name '{0}': must be non-empty and only contain lowercase letters, digits or underscores")]
    InvalidName(String),
    #[error("Invalid properties: {0}")]
    InvalidProperties(String),
    #[error("Failed to parse TOML: {0}")]
    TomlError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("Version {requested} not found in available versions: {available:?}")]
    NotFound {
        requested: String,
        available: Vec<String>,
    },
}

/// A dotted dataset path claimed by more than one configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateDataset {
    pub namespace: String,
    pub paths: Vec<PathBuf>,
}

fn format_duplicates(duplicates: &[DuplicateDataset]) -> String {
    duplicates
        .iter()
        .map(|d| {
            let paths = d
                .paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} ({})", d.namespace, paths)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid dataset {}: {source}", .path.display())]
    InvalidDataset {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
    #[error("Failed to read {}: {source}", .path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid catalog defaults {}: {source}", .path.display())]
    InvalidDefaults {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Duplicate dataset names found: {}", format_duplicates(.0))]
    DuplicateDatasets(Vec<DuplicateDataset>),
    #[error("Namespace '{0}' is both a dataset and a group")]
    NamespaceConflict(String),
    #[error("No catalogs exist under {roots:?}")]
    NoCatalogs { roots: Vec<PathBuf> },
    #[error("'{0}' not found in the catalog")]
    NotFound(String),
    #[error("Stage '{stage}' not found for dataset '{dataset}'. Available stages are: {available:?}")]
    UnknownStage {
        dataset: String,
        stage: String,
        available: Vec<String>,
    },
    #[error("Local path {} does not exist", .0.display())]
    LocalPathNotFound(PathBuf),
    #[error("Location {} already exists", .0.display())]
    LocationExists(PathBuf),
    #[error("Invalid catalog name '{0}'")]
    InvalidCatalogName(String),
    #[error("Catalog '{name}' is provided by both {} and {}", .first.display(), .second.display())]
    DuplicateCatalog {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("No blobs found under {0}")]
    EmptyVersion(String),
    #[error("Invalid notebook {}: {reason}", .path.display())]
    InvalidNotebook { path: PathBuf, reason: String },
    #[error("Version error: {0}")]
    VersionError(#[from] VersionError),
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    #[error("Format error: {0}")]
    FormatError(#[from] FormatError),
    #[error("DataFusion error: {0}")]
    DataFusionError(#[from] DataFusionError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Glob pattern error: {0}")]
    GlobPatternError(#[from] glob::PatternError),
    #[error("Glob error: {0}")]
    GlobError(#[from] glob::GlobError),
    #[error("Walk error: {0}")]
    WalkError(#[from] walkdir::Error),
}
