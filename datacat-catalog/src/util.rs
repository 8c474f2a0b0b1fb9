use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use chrono::Local;

use crate::{
    error::{CatalogError, DuplicateDataset},
    Result,
};

/// Path safe timestamp used to name auto versions (`2024-01-31T13-05-00`).
pub fn version_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H-%M-%S").to_string()
}

/// Timestamp recorded in ledger entries (`2024-01-31T13:05:00`).
pub fn ledger_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Current date, the partition key of the access ledger.
pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// `"Weekly Report.ipynb"` becomes `"weekly_report_ipynb"`.
pub fn remove_ws_and_nonalpha(s: &str) -> String {
    s.replace([' ', '.'], "_")
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// One file found below a catalog directory, addressed by its normalised segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEntry {
    pub segments: Vec<String>,
    pub path: PathBuf,
}

impl FsEntry {
    pub fn dot_path(&self) -> String {
        self.segments.join(".")
    }
}

/// Every `*.{file_ext}` file below `base_dir`, sorted by path.
///
/// Directory segments are normalised with [`remove_ws_and_nonalpha`]. The leaf
/// segment drops the extension unless `keep_extension` is set, in which case
/// the extension is folded into the normalised name (`report_ipynb`).
pub fn fs_entries(base_dir: &Path, file_ext: &str, keep_extension: bool) -> Result<Vec<FsEntry>> {
    if !base_dir.is_dir() {
        return Ok(vec![]);
    }
    let file_ext = file_ext.trim_start_matches('.');
    let pattern = base_dir.join("**").join(format!("*.{}", file_ext));
    let mut paths = glob::glob(&pattern.to_string_lossy())?.collect::<std::result::Result<Vec<_>, _>>()?;
    paths.sort();

    let mut entries = Vec::with_capacity(paths.len());
    for path in paths {
        let Ok(relative) = path.strip_prefix(base_dir) else {
            continue;
        };
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        let Some((leaf, dirs)) = parts.split_last() else {
            continue;
        };
        let mut segments: Vec<String> = dirs.iter().map(|d| remove_ws_and_nonalpha(d)).collect();
        let leaf = if keep_extension {
            leaf.clone()
        } else {
            leaf.strip_suffix(&format!(".{}", file_ext))
                .unwrap_or(leaf)
                .to_string()
        };
        segments.push(remove_ws_and_nonalpha(&leaf));
        entries.push(FsEntry { segments, path });
    }
    Ok(entries)
}

/// Nest `entries` under `root` into a mapping whose leaves are file paths.
pub fn fs_ns_map(root: &str, entries: &[FsEntry]) -> Result<toml::Table> {
    let mut map = toml::Table::new();
    for entry in entries {
        let mut current = &mut map;
        let mut namespace = root.to_string();
        if let Some((leaf, groups)) = entry.segments.split_last() {
            for group in groups {
                namespace = format!("{}.{}", namespace, group);
                let next = current
                    .entry(group.clone())
                    .or_insert_with(|| toml::Value::Table(toml::Table::new()));
                current = match next {
                    toml::Value::Table(table) => table,
                    _ => return Err(CatalogError::NamespaceConflict(namespace)),
                };
            }
            if current.contains_key(leaf) {
                return Err(CatalogError::NamespaceConflict(format!("{}.{}", namespace, leaf)));
            }
            current.insert(
                leaf.clone(),
                toml::Value::String(entry.path.to_string_lossy().to_string()),
            );
        }
    }
    Ok(map)
}

/// Dotted paths of every dataset config or report notebook leaf in `map`.
pub fn dataset_dot_paths(map: &toml::Table) -> Vec<String> {
    let mut paths = vec![];
    for (key, value) in map {
        match value {
            toml::Value::String(s) if s.ends_with(".toml") || s.ends_with(".ipynb") => {
                paths.push(key.clone())
            }
            toml::Value::Table(inner) => {
                paths.extend(
                    dataset_dot_paths(inner)
                        .into_iter()
                        .map(|p| format!("{}.{}", key, p)),
                );
            }
            _ => {}
        }
    }
    paths
}

/// Fail if any dotted path is claimed by more than one file.
pub fn verify_no_repeats<'a>(entries: impl IntoIterator<Item = (String, &'a Path)>) -> Result<()> {
    let mut seen: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for (namespace, path) in entries {
        seen.entry(namespace).or_default().push(path.to_path_buf());
    }
    let duplicates: Vec<DuplicateDataset> = seen
        .into_iter()
        .filter(|(_, paths)| paths.len() > 1)
        .map(|(namespace, paths)| DuplicateDataset { namespace, paths })
        .collect();

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::DuplicateDatasets(duplicates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_names() {
        assert_eq!(remove_ws_and_nonalpha("Hello World! 123.ipynb"), "hello_world_123_ipynb");
        assert_eq!(remove_ws_and_nonalpha("covid-19 vax"), "covid19_vax");
    }

    #[test]
    fn timestamps_have_fixed_width() {
        assert_eq!(version_timestamp().len(), "2024-01-31T13-05-00".len());
        assert!(!version_timestamp().contains(':'));
        assert_eq!(ledger_timestamp().len(), "2024-01-31T13:05:00".len());
        assert_eq!(today().len(), 10);
    }

    #[test]
    fn fs_map_mirrors_directory_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Public Health/vax")).unwrap();
        std::fs::write(dir.path().join("Public Health/vax/trends.toml"), "").unwrap();
        std::fs::write(dir.path().join("reference.toml"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let entries = fs_entries(dir.path(), "toml", false).unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.dot_path()).collect();
        assert_eq!(paths, vec!["public_health.vax.trends", "reference"]);

        let map = fs_ns_map("cat", &entries).unwrap();
        let mut dotted = dataset_dot_paths(&map);
        dotted.sort();
        assert_eq!(dotted, vec!["public_health.vax.trends", "reference"]);
    }

    #[test]
    fn report_leaves_keep_their_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("weekly report.ipynb"), "{}").unwrap();
        let entries = fs_entries(dir.path(), "ipynb", true).unwrap();
        assert_eq!(entries[0].segments, vec!["weekly_report_ipynb"]);
    }

    #[test]
    fn missing_directory_has_no_entries() {
        let dir = tempfile::tempdir().unwrap();
        assert!(fs_entries(&dir.path().join("absent"), "toml", false)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn leaf_and_group_with_same_name_conflict() {
        let entries = vec![
            FsEntry {
                segments: vec!["a".into()],
                path: PathBuf::from("/x/a.toml"),
            },
            FsEntry {
                segments: vec!["a".into(), "b".into()],
                path: PathBuf::from("/x/a/b.toml"),
            },
        ];
        let err = fs_ns_map("cat", &entries).unwrap_err();
        assert!(matches!(err, CatalogError::NamespaceConflict(ns) if ns == "cat.a"));
    }

    #[test]
    fn repeats_are_reported_with_files() {
        let a = PathBuf::from("/one/trends.toml");
        let b = PathBuf::from("/two/Trends.toml");
        let c = PathBuf::from("/two/other.toml");
        let err = verify_no_repeats(vec![
            ("cat.trends".to_string(), a.as_path()),
            ("cat.trends".to_string(), b.as_path()),
            ("cat.other".to_string(), c.as_path()),
        ])
        .unwrap_err();
        match err {
            CatalogError::DuplicateDatasets(duplicates) => {
                assert_eq!(duplicates.len(), 1);
                assert_eq!(duplicates[0].namespace, "cat.trends");
                assert_eq!(duplicates[0].paths, vec![a, b]);
            }
            other => panic!("unexpected error {other}"),
        }
        assert!(verify_no_repeats(vec![("x".to_string(), c.as_path())]).is_ok());
    }
}
