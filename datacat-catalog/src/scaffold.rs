use std::path::{Path, PathBuf};

use crate::{
    catalog::{DATASETS_DIR, REPORTS_DIR},
    dataset::CATALOG_DEFAULTS_FILE,
    error::CatalogError,
    Result,
};

/// `"My-Catalog 2"` becomes `"my_catalog_2"`.
pub fn normalise_catalog_name(name: &str) -> String {
    name.to_lowercase()
        .replace(['-', ' '], "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

fn defaults_template(name: &str) -> String {
    format!(
        r#"# Storage used by every dataset of this catalog that leaves
# account or container blank in a stage section.
[storage]
account = "{name}"
container = "{name}"

[access_ledger]
path = "access_ledger/{name}"
"#
    )
}

fn example_dataset_template(name: &str) -> String {
    format!(
        r#"[properties]
name = "example_dataset"
type = "etl"
automate = false

[source]
url = "https://example.com/data.csv"

[extract]
account = ""
container = ""
prefix = "{name}/example_dataset/raw"

[load]
account = ""
container = ""
prefix = "{name}/example_dataset/transformed"
"#
    )
}

/// Create a new catalog root at `location` holding one package named after
/// `name`, and return the package directory.
pub fn create_catalog(name: &str, location: &Path) -> Result<PathBuf> {
    let name = normalise_catalog_name(name);
    if name.is_empty() {
        return Err(CatalogError::InvalidCatalogName(name));
    }
    if location.exists() {
        return Err(CatalogError::LocationExists(location.to_path_buf()));
    }

    let package = location.join(&name);
    std::fs::create_dir_all(package.join(DATASETS_DIR))?;
    std::fs::create_dir_all(package.join(REPORTS_DIR))?;
    std::fs::write(package.join(CATALOG_DEFAULTS_FILE), defaults_template(&name))?;
    std::fs::write(
        package.join(DATASETS_DIR).join("example_dataset.toml"),
        example_dataset_template(&name),
    )?;
    tracing::info!("Created catalog {} at {}", name, package.display());
    Ok(package)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use datacat_object_storage::ObjectStoreBlobClient;

    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn names_are_normalised() {
        assert_eq!(normalise_catalog_name("My-Catalog 2"), "my_catalog_2");
        assert_eq!(normalise_catalog_name("ops!"), "ops");
    }

    #[test]
    fn scaffolded_catalog_loads() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("new-root");
        let package = create_catalog("Team Ops", &location).unwrap();
        assert_eq!(package, location.join("team_ops"));
        assert!(package.join(REPORTS_DIR).is_dir());

        let catalog = Catalog::load(
            &[location.clone()],
            Arc::new(ObjectStoreBlobClient::in_memory()),
        )
        .unwrap();
        assert_eq!(catalog.dataset_namespaces(), ["team_ops.example_dataset"]);
        let extract = catalog.endpoint("team_ops.example_dataset.extract").unwrap();
        assert_eq!(extract.account(), "team_ops");
    }

    #[test]
    fn existing_location_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let err = create_catalog("ops", dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::LocationExists(_)));
        let err = create_catalog("!!", &dir.path().join("x")).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidCatalogName(_)));
    }
}
