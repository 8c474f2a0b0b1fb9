//! Dot addressable tree of dataset endpoints built from a nested mapping of
//! `{segment: sub-mapping | "path/to/config.toml"}`.

use std::{path::Path, sync::Arc};

use datacat_object_storage::BlobClient;
use indexmap::IndexMap;

use crate::{
    blob_endpoint::BlobEndpoint, dataset::CatalogDefaults, dataset::DatasetEndpoint,
    report::ReportEndpoint, Result,
};

/// Key under which every top level group exposes a view of its ledger.
pub const LEDGER_ENDPOINT_KEY: &str = "_ledger_endpoint";

#[derive(Debug, Clone)]
pub enum NamespaceNode {
    Dataset(Box<DatasetEndpoint>),
    Endpoint(BlobEndpoint),
    Report(ReportEndpoint),
    Group(NamespaceGroup),
    List(Vec<NamespaceNode>),
    /// Any other configuration value, passed through unchanged.
    Scalar(toml::Value),
}

impl NamespaceNode {
    pub fn as_dataset(&self) -> Option<&DatasetEndpoint> {
        match self {
            NamespaceNode::Dataset(dataset) => Some(dataset),
            _ => None,
        }
    }

    pub fn as_endpoint(&self) -> Option<&BlobEndpoint> {
        match self {
            NamespaceNode::Endpoint(endpoint) => Some(endpoint),
            _ => None,
        }
    }

    pub fn as_report(&self) -> Option<&ReportEndpoint> {
        match self {
            NamespaceNode::Report(report) => Some(report),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&NamespaceGroup> {
        match self {
            NamespaceNode::Group(group) => Some(group),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NamespaceGroup {
    namespace: String,
    children: IndexMap<String, NamespaceNode>,
}

impl NamespaceGroup {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            children: IndexMap::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn get(&self, key: &str) -> Option<&NamespaceNode> {
        self.children.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, node: NamespaceNode) -> Option<NamespaceNode> {
        self.children.insert(key.into(), node)
    }

    /// Move every child of `other` into this group, replacing equal keys.
    pub fn extend(&mut self, other: NamespaceGroup) {
        self.children.extend(other.children);
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.children.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &NamespaceNode)> {
        self.children.iter()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Descend along a dotted path, e.g. `scenarios.covid.trends`.
    pub fn lookup(&self, path: &str) -> Option<&NamespaceNode> {
        let mut segments = path.split('.');
        let mut node = self.children.get(segments.next()?)?;
        for segment in segments {
            node = match node {
                NamespaceNode::Group(group) => group.children.get(segment)?,
                NamespaceNode::List(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(node)
    }
}

/// Materialises dataset namespaces for one catalog.
#[derive(Debug, Clone)]
pub struct NamespaceBuilder {
    defaults: Arc<CatalogDefaults>,
    client: Arc<dyn BlobClient>,
}

impl NamespaceBuilder {
    pub fn new(defaults: Arc<CatalogDefaults>, client: Arc<dyn BlobClient>) -> Self {
        Self { defaults, client }
    }

    /// Build the group for `map` at `namespace`. Groups directly below the root
    /// (a namespace without dots) also get a [`LEDGER_ENDPOINT_KEY`] endpoint.
    pub fn build_group(&self, map: &toml::Table, namespace: &str) -> Result<NamespaceGroup> {
        let mut group = NamespaceGroup::new(namespace);
        for (key, value) in map {
            let child_ns = if namespace.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", namespace, key)
            };
            group.insert(key.clone(), self.build_node(value, &child_ns)?);
        }

        if !namespace.is_empty() && !namespace.contains('.') {
            group.insert(
                LEDGER_ENDPOINT_KEY,
                NamespaceNode::Endpoint(BlobEndpoint::ledger_view(
                    self.defaults.ledger_location(),
                    self.client.clone(),
                )),
            );
        }
        Ok(group)
    }

    fn build_node(&self, value: &toml::Value, namespace: &str) -> Result<NamespaceNode> {
        Ok(match value {
            toml::Value::String(path) if path.ends_with(".toml") => {
                NamespaceNode::Dataset(Box::new(DatasetEndpoint::from_path(
                    Path::new(path),
                    self.defaults.clone(),
                    namespace,
                    self.client.clone(),
                )?))
            }
            toml::Value::Table(table) => NamespaceNode::Group(self.build_group(table, namespace)?),
            toml::Value::Array(items) => NamespaceNode::List(
                items
                    .iter()
                    .map(|item| self.build_node(item, namespace))
                    .collect::<Result<Vec<_>>>()?,
            ),
            other => NamespaceNode::Scalar(other.clone()),
        })
    }
}

/// Build the report group for `map`; keys ending in `ipynb` become report endpoints.
pub fn build_report_group(map: &toml::Table, namespace: &str) -> NamespaceGroup {
    let mut group = NamespaceGroup::new(namespace);
    for (key, value) in map {
        let child_ns = if namespace.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", namespace, key)
        };
        let node = match value {
            toml::Value::String(path) if key.ends_with("ipynb") => {
                NamespaceNode::Report(ReportEndpoint::new(path, child_ns))
            }
            toml::Value::Table(table) => NamespaceNode::Group(build_report_group(table, &child_ns)),
            other => NamespaceNode::Scalar(other.clone()),
        };
        group.insert(key.clone(), node);
    }
    group
}
