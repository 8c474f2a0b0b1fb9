use std::path::Path;

use console::style;
use datacat_catalog::{
    scaffold, BlobEndpoint, Catalog, CatalogError, DatasetEndpoint, Selection, LATEST,
};

use crate::tree::{tree, TreeOptions};

/// Dataset paths starting with `prefix`, sorted.
pub fn matching_datasets<'a>(catalog: &'a Catalog, prefix: Option<&str>) -> Vec<&'a str> {
    let mut names: Vec<&str> = catalog
        .dataset_namespaces()
        .iter()
        .map(String::as_str)
        .filter(|name| prefix.map_or(true, |p| name.starts_with(p)))
        .collect();
    names.sort_unstable();
    names
}

/// The requested stage, or the last one in sorted order.
pub fn resolve_stage<'a>(
    dataset: &'a DatasetEndpoint,
    stage: Option<&str>,
) -> Result<&'a BlobEndpoint, CatalogError> {
    match stage {
        Some(stage) => dataset.try_stage(stage),
        None => dataset
            .default_stage()
            .ok_or_else(|| CatalogError::NotFound(format!("{} has no stages", dataset.namespace()))),
    }
}

pub fn list(catalog: &Catalog, prefix: Option<&str>) {
    let names = matching_datasets(catalog, prefix);
    if names.is_empty() {
        println!("{}", style("No datasets found").yellow());
        return;
    }
    for name in names {
        println!("{}", name);
    }
}

pub fn stages(catalog: &Catalog, dataset: &str) -> anyhow::Result<()> {
    let dataset = catalog.dataset(dataset)?;
    let names = dataset.stage_names();
    let default = names.last().cloned();
    for name in &names {
        if Some(name) == default.as_ref() {
            println!("{}", style(name).red().bold());
        } else {
            println!("{}", name);
        }
    }
    println!(
        "\n{}",
        style("The default stage (highlighted) is used when --stage is omitted.").dim()
    );
    Ok(())
}

pub async fn versions(catalog: &Catalog, dataset: &str, stage: Option<&str>) -> anyhow::Result<()> {
    let dataset = catalog.dataset(dataset)?;
    let endpoint = resolve_stage(dataset, stage)?;
    let versions = endpoint.get_versions().await?;
    if versions.is_empty() {
        println!("{}", style(format!("No versions found in {}", endpoint)).yellow());
        return Ok(());
    }
    for (idx, version) in versions.iter().enumerate() {
        if idx == 0 {
            println!("{} {}", style(version).green().bold(), style("(newest)").dim());
        } else {
            println!("{}", version);
        }
    }
    Ok(())
}

pub struct DownloadArgs<'a> {
    pub dataset: &'a str,
    pub location: &'a Path,
    pub stage: Option<&'a str>,
    pub version: Option<&'a str>,
    pub force: bool,
    pub selection: Selection,
}

pub async fn download(catalog: &Catalog, args: DownloadArgs<'_>) -> anyhow::Result<()> {
    let dataset = catalog.dataset(args.dataset)?;
    let endpoint = resolve_stage(dataset, args.stage)?;
    let version = args.version.unwrap_or(LATEST);

    let written = endpoint
        .download_version_to_local(args.location, version, args.force, args.selection)
        .await?;
    if !written {
        println!(
            "{}",
            style(format!(
                "Nothing downloaded, {} is already present in {}. Use --force to overwrite.",
                version,
                args.location.display()
            ))
            .yellow()
        );
        return Ok(());
    }

    println!(
        "{}",
        style(format!(
            "Downloaded {} ({}) to {}",
            endpoint.namespace(),
            version,
            args.location.display()
        ))
        .green()
    );
    println!("{}", tree(args.location, &TreeOptions::default())?);
    Ok(())
}

pub fn validate(catalog: &Catalog) {
    println!(
        "{}",
        style(format!(
            "Catalog is valid: {} catalog(s), {} dataset(s), {} report(s)",
            catalog.packages().len(),
            catalog.dataset_namespaces().len(),
            catalog.report_namespaces().len()
        ))
        .green()
    );
}

pub fn create_catalog(name: &str, location: &Path) -> anyhow::Result<()> {
    let package = scaffold::create_catalog(name, location)?;
    println!(
        "{}",
        style(format!("Created catalog at {}", package.display())).green()
    );
    println!("{}", tree(location, &TreeOptions::default())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use datacat_object_storage::ObjectStoreBlobClient;

    use super::*;

    const DATASET: &str = r#"
[properties]
name = "trends"
type = "etl"

[source]
url = "https://x"

[extract]
account = "a"
container = "c"
prefix = "raw"

[load]
account = "a"
container = "c"
prefix = "transformed"
"#;

    fn catalog() -> (tempfile::TempDir, Catalog) {
        let root = tempfile::tempdir().unwrap();
        let package = root.path().join("ops");
        std::fs::create_dir_all(package.join("datasets/covid")).unwrap();
        std::fs::write(
            package.join("catalog_defaults.toml"),
            "[storage]\naccount = \"a\"\ncontainer = \"c\"\n",
        )
        .unwrap();
        std::fs::write(package.join("datasets/covid/trends.toml"), DATASET).unwrap();
        std::fs::write(
            package.join("datasets/fips.toml"),
            DATASET.replace("trends", "fips"),
        )
        .unwrap();
        let catalog = Catalog::load(
            &[root.path().to_path_buf()],
            Arc::new(ObjectStoreBlobClient::in_memory()),
        )
        .unwrap();
        (root, catalog)
    }

    #[test]
    fn datasets_filter_by_prefix() {
        let (_root, catalog) = catalog();
        assert_eq!(
            matching_datasets(&catalog, None),
            vec!["ops.covid.trends", "ops.fips"]
        );
        assert_eq!(
            matching_datasets(&catalog, Some("ops.covid")),
            vec!["ops.covid.trends"]
        );
        assert!(matching_datasets(&catalog, Some("other")).is_empty());
    }

    #[test]
    fn default_stage_is_the_last() {
        let (_root, catalog) = catalog();
        let dataset = catalog.dataset("ops.fips").unwrap();
        assert_eq!(resolve_stage(dataset, None).unwrap().prefix(), "transformed");
        assert_eq!(resolve_stage(dataset, Some("extract")).unwrap().prefix(), "raw");
        assert!(matches!(
            resolve_stage(dataset, Some("stage_09")),
            Err(CatalogError::UnknownStage { .. })
        ));
    }

    #[tokio::test]
    async fn download_without_versions_fails() {
        let (_root, catalog) = catalog();
        let target = tempfile::tempdir().unwrap();
        let args = DownloadArgs {
            dataset: "ops.fips",
            location: target.path(),
            stage: None,
            version: None,
            force: false,
            selection: Selection::Newest,
        };
        assert!(download(&catalog, args).await.is_err());
    }
}
