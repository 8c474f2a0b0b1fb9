use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use datacat_object_storage::BlobClient;
use serde::{Deserialize, Serialize};

use crate::{
    blob_endpoint::BlobEndpoint,
    error::{CatalogError, ConfigError},
    ledger::StorageLocation,
    validator::{is_stage_key, validate_dataset_config, DatasetConfig, Properties},
    Result,
};

pub const CATALOG_DEFAULTS_FILE: &str = "catalog_defaults.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDefaults {
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub container: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLedgerDefaults {
    #[serde(default = "AccessLedgerDefaults::default_path")]
    pub path: String,
}

impl AccessLedgerDefaults {
    fn default_path() -> String {
        "access_ledger".to_string()
    }
}

impl Default for AccessLedgerDefaults {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}

/// Per catalog defaults, read from `catalog_defaults.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDefaults {
    #[serde(default)]
    pub storage: StorageDefaults,
    #[serde(default)]
    pub access_ledger: AccessLedgerDefaults,
}

impl CatalogDefaults {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| CatalogError::InvalidDefaults {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Where every dataset of the catalog logs its accesses.
    pub fn ledger_location(&self) -> StorageLocation {
        StorageLocation::new(
            self.storage.account.clone(),
            self.storage.container.clone(),
            self.access_ledger.path.clone(),
        )
    }

    /// Fill blank `account`/`container` of every stage-like section.
    pub fn apply(&self, config: &mut toml::Table) {
        for (key, value) in config.iter_mut() {
            if !is_stage_key(key) {
                continue;
            }
            let Some(section) = value.as_table_mut() else {
                continue;
            };
            for (field, default) in [
                ("account", &self.storage.account),
                ("container", &self.storage.container),
            ] {
                let blank = section
                    .get(field)
                    .and_then(|v| v.as_str())
                    .map_or(!section.contains_key(field), str::is_empty);
                if blank {
                    section.insert(field.to_string(), toml::Value::String(default.clone()));
                }
            }
        }
    }
}

/// One dataset configuration file and a [`BlobEndpoint`] per storage stage.
#[derive(Debug, Clone)]
pub struct DatasetEndpoint {
    config_path: PathBuf,
    namespace: String,
    defaults: Arc<CatalogDefaults>,
    raw: toml::Table,
    config: DatasetConfig,
    stages: BTreeMap<String, BlobEndpoint>,
}

impl DatasetEndpoint {
    pub fn from_path(
        config_path: &Path,
        defaults: Arc<CatalogDefaults>,
        namespace: &str,
        client: Arc<dyn BlobClient>,
    ) -> Result<Self> {
        let content =
            std::fs::read_to_string(config_path).map_err(|source| CatalogError::ReadConfig {
                path: config_path.to_path_buf(),
                source,
            })?;
        let raw: toml::Table =
            toml::from_str(&content).map_err(|e| CatalogError::InvalidDataset {
                path: config_path.to_path_buf(),
                source: ConfigError::TomlError(e),
            })?;
        Self::from_table(raw, config_path, defaults, namespace, client)
    }

    pub fn from_table(
        mut raw: toml::Table,
        config_path: &Path,
        defaults: Arc<CatalogDefaults>,
        namespace: &str,
        client: Arc<dyn BlobClient>,
    ) -> Result<Self> {
        defaults.apply(&mut raw);
        let config = validate_dataset_config(&raw).map_err(|source| CatalogError::InvalidDataset {
            path: config_path.to_path_buf(),
            source,
        })?;

        let ledger_location = defaults.ledger_location();
        let stages = config
            .stages
            .iter()
            .map(|(stage, section)| {
                let endpoint = BlobEndpoint::new(
                    section.account.clone(),
                    section.container.clone(),
                    &section.prefix,
                    ledger_location.clone(),
                    format!("{}.{}", namespace, stage),
                    client.clone(),
                );
                (stage.clone(), endpoint)
            })
            .collect();

        Ok(Self {
            config_path: config_path.to_path_buf(),
            namespace: namespace.to_string(),
            defaults,
            raw,
            config,
            stages,
        })
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn defaults(&self) -> &CatalogDefaults {
        &self.defaults
    }

    pub fn properties(&self) -> &Properties {
        &self.config.properties
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// The configuration as loaded, with stage defaults filled in.
    pub fn raw_config(&self) -> &toml::Table {
        &self.raw
    }

    /// A top level configuration value, e.g. `source` or `data`.
    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.raw.get(key)
    }

    pub fn stage(&self, stage: &str) -> Option<&BlobEndpoint> {
        self.stages.get(stage)
    }

    pub fn try_stage(&self, stage: &str) -> Result<&BlobEndpoint> {
        self.stage(stage).ok_or_else(|| CatalogError::UnknownStage {
            dataset: self.namespace.clone(),
            stage: stage.to_string(),
            available: self.stage_names(),
        })
    }

    /// Stage names in sorted order.
    pub fn stage_names(&self) -> Vec<String> {
        self.stages.keys().cloned().collect()
    }

    /// The last stage in sorted order, the one loaded when none is named.
    pub fn default_stage(&self) -> Option<&BlobEndpoint> {
        self.stages.values().next_back()
    }

    pub fn stages(&self) -> impl Iterator<Item = (&String, &BlobEndpoint)> {
        self.stages.iter()
    }
}
