use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use datacat_object_storage::BlobClient;

use crate::{
    blob_endpoint::BlobEndpoint,
    dataset::{CatalogDefaults, DatasetEndpoint, CATALOG_DEFAULTS_FILE},
    error::CatalogError,
    ledger::AccessLedger,
    namespace::{
        build_report_group, NamespaceBuilder, NamespaceGroup, NamespaceNode, LEDGER_ENDPOINT_KEY,
    },
    report::ReportEndpoint,
    util::{self, FsEntry},
    Result,
};

pub const DATASETS_DIR: &str = "datasets";
pub const REPORTS_DIR: &str = "reports";

/// A directory holding `catalog_defaults.toml`, `datasets/` and `reports/`.
#[derive(Debug, Clone)]
pub struct CatalogPackage {
    pub name: String,
    pub path: PathBuf,
    pub defaults: Arc<CatalogDefaults>,
}

impl CatalogPackage {
    pub fn open(path: &Path) -> Result<Self> {
        let dir_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = util::remove_ws_and_nonalpha(&dir_name);
        if name.is_empty() {
            return Err(CatalogError::InvalidCatalogName(dir_name));
        }
        let defaults = CatalogDefaults::from_path(&path.join(CATALOG_DEFAULTS_FILE))?;
        Ok(Self {
            name,
            path: path.to_path_buf(),
            defaults: Arc::new(defaults),
        })
    }

    pub fn datasets_dir(&self) -> PathBuf {
        self.path.join(DATASETS_DIR)
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.path.join(REPORTS_DIR)
    }

    fn dataset_entries(&self) -> Result<Vec<FsEntry>> {
        util::fs_entries(&self.datasets_dir(), "toml", false)
    }

    fn report_entries(&self) -> Result<Vec<FsEntry>> {
        util::fs_entries(&self.reports_dir(), "ipynb", true)
    }
}

/// Catalog packages directly below each of `roots`, sorted by path per root.
pub fn discover_catalogs(roots: &[PathBuf]) -> Result<Vec<CatalogPackage>> {
    let mut packages = vec![];
    for root in roots {
        if !root.is_dir() {
            tracing::warn!("Catalog root {} is not a directory", root.display());
            continue;
        }
        let mut candidates = vec![];
        for entry in std::fs::read_dir(root)? {
            let path = entry?.path();
            if path.join(CATALOG_DEFAULTS_FILE).is_file() {
                candidates.push(path);
            }
        }
        candidates.sort();
        for path in candidates {
            packages.push(CatalogPackage::open(&path)?);
        }
    }
    Ok(packages)
}

/// Every dataset and report of every discovered catalog package.
#[derive(Debug, Clone)]
pub struct Catalog {
    packages: Vec<CatalogPackage>,
    datacat: NamespaceGroup,
    reportcat: NamespaceGroup,
    dataset_namespaces: Vec<String>,
    report_namespaces: Vec<String>,
}

impl Catalog {
    /// Discover, validate and build the catalogs below `roots`. Any invalid or
    /// duplicated dataset fails the whole load.
    pub fn load(roots: &[PathBuf], client: Arc<dyn BlobClient>) -> Result<Self> {
        let packages = discover_catalogs(roots)?;
        if packages.is_empty() {
            return Err(CatalogError::NoCatalogs {
                roots: roots.to_vec(),
            });
        }

        let mut dataset_entries = Vec::with_capacity(packages.len());
        for package in &packages {
            dataset_entries.push(package.dataset_entries()?);
        }
        util::verify_no_repeats(packages.iter().zip(&dataset_entries).flat_map(
            |(package, entries)| {
                entries
                    .iter()
                    .map(move |e| (format!("{}.{}", package.name, e.dot_path()), e.path.as_path()))
            },
        ))?;

        let mut seen: HashMap<&str, &Path> = HashMap::new();
        for package in &packages {
            if let Some(first) = seen.insert(&package.name, &package.path) {
                return Err(CatalogError::DuplicateCatalog {
                    name: package.name.clone(),
                    first: first.to_path_buf(),
                    second: package.path.clone(),
                });
            }
        }

        let mut datacat = NamespaceGroup::new("");
        let mut reportcat = NamespaceGroup::new("");
        let mut dataset_namespaces = vec![];
        let mut report_namespaces = vec![];

        for (package, entries) in packages.iter().zip(&dataset_entries) {
            let map = util::fs_ns_map(&package.name, entries)?;
            let builder = NamespaceBuilder::new(package.defaults.clone(), client.clone());
            let group = builder.build_group(&map, &package.name)?;
            dataset_namespaces.extend(
                util::dataset_dot_paths(&map)
                    .into_iter()
                    .map(|p| format!("{}.{}", package.name, p)),
            );
            datacat.insert(package.name.clone(), NamespaceNode::Group(group));

            let report_map = util::fs_ns_map(&package.name, &package.report_entries()?)?;
            report_namespaces.extend(
                util::dataset_dot_paths(&report_map)
                    .into_iter()
                    .map(|p| format!("{}.{}", package.name, p)),
            );
            reportcat.insert(
                package.name.clone(),
                NamespaceNode::Group(build_report_group(&report_map, &package.name)),
            );
            tracing::debug!(
                "Loaded catalog {} from {}",
                package.name,
                package.path.display()
            );
        }

        tracing::info!(
            "Loaded {} dataset(s) and {} report(s) from {} catalog(s)",
            dataset_namespaces.len(),
            report_namespaces.len(),
            packages.len()
        );

        Ok(Self {
            packages,
            datacat,
            reportcat,
            dataset_namespaces,
            report_namespaces,
        })
    }

    /// Load the catalogs named by `DATACAT_CATALOG_ROOTS` on the configured storage backend.
    pub async fn from_config() -> Result<Self> {
        let client = datacat_object_storage::default_blob_client().await?;
        Self::load(&datacat_config::CONFIG.catalog_roots(), client)
    }

    pub fn packages(&self) -> &[CatalogPackage] {
        &self.packages
    }

    pub fn datacat(&self) -> &NamespaceGroup {
        &self.datacat
    }

    pub fn reportcat(&self) -> &NamespaceGroup {
        &self.reportcat
    }

    /// Dotted paths of every dataset, e.g. `scenarios.covid19vax_trends`.
    pub fn dataset_namespaces(&self) -> &[String] {
        &self.dataset_namespaces
    }

    pub fn report_namespaces(&self) -> &[String] {
        &self.report_namespaces
    }

    pub fn catalog_defaults(&self, catalog: &str) -> Option<&CatalogDefaults> {
        self.packages
            .iter()
            .find(|p| p.name == catalog)
            .map(|p| p.defaults.as_ref())
    }

    pub fn dataset(&self, path: &str) -> Result<&DatasetEndpoint> {
        self.datacat
            .lookup(path)
            .and_then(NamespaceNode::as_dataset)
            .ok_or_else(|| CatalogError::NotFound(path.to_string()))
    }

    pub fn report(&self, path: &str) -> Result<&ReportEndpoint> {
        self.reportcat
            .lookup(path)
            .and_then(NamespaceNode::as_report)
            .ok_or_else(|| CatalogError::NotFound(path.to_string()))
    }

    /// A stage endpoint (`<dataset>.<stage>`) or a ledger view (`<catalog>._ledger_endpoint`).
    pub fn endpoint(&self, path: &str) -> Result<&BlobEndpoint> {
        if let Some(endpoint) = self.datacat.lookup(path).and_then(NamespaceNode::as_endpoint) {
            return Ok(endpoint);
        }
        let (dataset, stage) = path
            .rsplit_once('.')
            .ok_or_else(|| CatalogError::NotFound(path.to_string()))?;
        self.dataset(dataset)?.try_stage(stage)
    }

    /// Sorted stage names of a dataset.
    pub fn stages(&self, path: &str) -> Result<Vec<String>> {
        Ok(self.dataset(path)?.stage_names())
    }

    /// The access ledger shared by every dataset of `catalog`.
    pub fn ledger(&self, catalog: &str) -> Result<AccessLedger> {
        Ok(self
            .endpoint(&format!("{}.{}", catalog, LEDGER_ENDPOINT_KEY))?
            .ledger())
    }
}
