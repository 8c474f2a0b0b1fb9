use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::{error::CatalogError, Result};

/// A report notebook shipped with a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEndpoint {
    notebook_path: PathBuf,
    namespace: String,
}

impl ReportEndpoint {
    pub fn new(notebook_path: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            notebook_path: notebook_path.into(),
            namespace: namespace.into(),
        }
    }

    pub fn notebook_path(&self) -> &Path {
        &self.notebook_path
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub async fn read(&self) -> Result<Bytes> {
        Ok(Bytes::from(tokio::fs::read(&self.notebook_path).await?))
    }

    /// Source of the cell tagged `parameters`, holding the defaults a run may override.
    pub async fn parameters(&self) -> Result<Option<String>> {
        let bytes = self.read().await?;
        let notebook: serde_json::Value = serde_json::from_slice(&bytes)?;
        let cells = notebook
            .get("cells")
            .and_then(|c| c.as_array())
            .ok_or_else(|| CatalogError::InvalidNotebook {
                path: self.notebook_path.clone(),
                reason: "missing 'cells' array".to_string(),
            })?;

        let tagged = cells.iter().find(|cell| {
            cell.pointer("/metadata/tags")
                .and_then(|t| t.as_array())
                .is_some_and(|tags| tags.iter().any(|t| t == "parameters"))
        });

        Ok(tagged.map(|cell| match cell.get("source") {
            Some(serde_json::Value::Array(lines)) => {
                lines.iter().filter_map(|l| l.as_str()).collect::<String>()
            }
            Some(serde_json::Value::String(source)) => source.clone(),
            _ => String::new(),
        }))
    }
}
