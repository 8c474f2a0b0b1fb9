//! Schema of a dataset configuration document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const PROPERTIES: &str = "properties";
pub const SOURCE: &str = "source";

/// Whether `key` names a storage stage section: `extract`, `load`, `data` or `stage*`.
pub fn is_stage_key(key: &str) -> bool {
    matches!(key, "extract" | "load" | "data") || key.starts_with("stage")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetType {
    Etl,
    Experiment,
    Multistage,
    Reference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    pub name: String,
    #[serde(rename = "type")]
    pub dataset_type: DatasetType,
    /// Relative path to where the data schema(s) are defined.
    #[serde(default)]
    pub schemas: Option<String>,
    #[serde(default)]
    pub transform_templates: Option<Vec<String>>,
    #[serde(default)]
    pub automate: bool,
    #[serde(flatten)]
    pub extra: toml::Table,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    pub account: String,
    pub container: String,
    /// Versions are written below this path as `{prefix}/{version}/`.
    pub prefix: String,
}

/// A validated dataset configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetConfig {
    pub properties: Properties,
    pub source: toml::Table,
    pub stages: BTreeMap<String, StageConfig>,
    /// Every other top level key, passed through untouched.
    pub extra: toml::Table,
}

fn validate_name(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidName(name.to_string()))
    }
}

fn validate_properties(value: &toml::Value) -> Result<Properties, ConfigError> {
    let properties: Properties = value
        .clone()
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::InvalidProperties(e.message().to_string()))?;
    validate_name(&properties.name)?;
    if matches!(&properties.schemas, Some(s) if s.is_empty()) {
        return Err(ConfigError::InvalidProperties(
            "'schemas' must not be empty".to_string(),
        ));
    }
    if matches!(&properties.transform_templates, Some(t) if t.is_empty()) {
        return Err(ConfigError::InvalidProperties(
            "'transform_templates' needs at least one entry".to_string(),
        ));
    }
    Ok(properties)
}

fn validate_stage(stage: &str, value: &toml::Value) -> Result<StageConfig, ConfigError> {
    let config: StageConfig = value
        .clone()
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::InvalidStage {
            stage: stage.to_string(),
            reason: e.message().to_string(),
        })?;
    for (field, content) in [
        ("account", &config.account),
        ("container", &config.container),
        ("prefix", &config.prefix),
    ] {
        if content.is_empty() {
            return Err(ConfigError::InvalidStage {
                stage: stage.to_string(),
                reason: format!("'{}' must not be empty", field),
            });
        }
    }
    Ok(config)
}

/// Check `config` and split it into its typed sections.
pub fn validate_dataset_config(config: &toml::Table) -> Result<DatasetConfig, ConfigError> {
    let properties = config
        .get(PROPERTIES)
        .ok_or_else(|| ConfigError::MissingSection(PROPERTIES.to_string()))?;
    let properties = validate_properties(properties)?;

    let source = match config.get(SOURCE) {
        Some(toml::Value::Table(source)) => source.clone(),
        Some(_) => {
            return Err(ConfigError::InvalidProperties(
                "'source' must be a table".to_string(),
            ))
        }
        None => return Err(ConfigError::MissingSection(SOURCE.to_string())),
    };

    let mut stages = BTreeMap::new();
    let mut extra = toml::Table::new();
    for (key, value) in config {
        if key == PROPERTIES || key == SOURCE {
            continue;
        }
        if is_stage_key(key) {
            stages.insert(key.clone(), validate_stage(key, value)?);
        } else {
            extra.insert(key.clone(), value.clone());
        }
    }
    if stages.is_empty() {
        return Err(ConfigError::NoStageSections);
    }

    Ok(DatasetConfig {
        properties,
        source,
        stages,
        extra,
    })
}
