use std::path::PathBuf;

use envconfig::Envconfig;
use lazy_static::lazy_static;

#[derive(Debug, Envconfig)]
pub struct Config {
    /// Comma separated list of directories holding catalog packages.
    #[envconfig(from = "DATACAT_CATALOG_ROOTS", default = "./catalogs")]
    pub catalog_roots: String,
    #[envconfig(from = "DATACAT_LOG_LEVEL", default = "info")]
    pub log_level: String,
    /// One of `azure`, `local` or `memory`.
    #[envconfig(from = "DATACAT_STORAGE_BACKEND", default = "azure")]
    pub storage_backend: String,
    #[envconfig(from = "DATACAT_LOCAL_STORAGE_DIR", default = "./data/blobs")]
    pub local_storage_dir: String,
    #[envconfig(from = "DATACAT_USER")]
    pub user: Option<String>,
}

impl Config {
    pub fn init() -> Config {
        Config::init_from_env().expect("Failed to load config")
    }

    pub fn catalog_roots(&self) -> Vec<PathBuf> {
        split_roots(&self.catalog_roots)
    }

    pub fn local_storage_dir(&self) -> PathBuf {
        PathBuf::from(&self.local_storage_dir)
    }

    /// The name recorded in access ledger entries.
    pub fn username(&self) -> String {
        self.user
            .clone()
            .filter(|u| !u.is_empty())
            .or_else(|| std::env::var("USER").ok().filter(|u| !u.is_empty()))
            .or_else(|| std::env::var("USERNAME").ok().filter(|u| !u.is_empty()))
            .unwrap_or_else(|| UNKNOWN_USER.to_string())
    }
}

pub const UNKNOWN_USER: &str = "unknown_user";

pub fn split_roots(roots: &str) -> Vec<PathBuf> {
    roots
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(PathBuf::from)
        .collect()
}

lazy_static! {
    pub static ref CONFIG: Config = Config::init();
}
