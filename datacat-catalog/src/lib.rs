pub mod blob_endpoint;
pub mod catalog;
pub mod dataset;
pub mod error;
pub mod ledger;
pub mod namespace;
pub mod report;
pub mod scaffold;
pub mod util;
pub mod validator;
pub mod version;

pub use blob_endpoint::{BlobEndpoint, WriteOptions};
pub use catalog::{Catalog, CatalogPackage};
pub use dataset::{CatalogDefaults, DatasetEndpoint};
pub use error::{CatalogError, ConfigError, VersionError};
pub use ledger::{AccessLedger, LedgerAction, LedgerEntry, StorageLocation};
pub use namespace::{NamespaceGroup, NamespaceNode};
pub use report::ReportEndpoint;
pub use version::{match_versions, Selection, LATEST};

pub use datacat_formats::FileFormat;

pub type Result<T> = std::result::Result<T, CatalogError>;
