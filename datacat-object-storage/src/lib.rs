use std::{collections::HashMap, fmt::Display, path::PathBuf, str::FromStr, sync::Arc};

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use object_store::{
    azure::MicrosoftAzureBuilder, local::LocalFileSystem, memory::InMemory, path::Path,
    ObjectStore, PutMode, PutPayload,
};

pub mod error;

pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;

static DEFAULT_BLOB_CLIENT: tokio::sync::OnceCell<Arc<ObjectStoreBlobClient>> =
    tokio::sync::OnceCell::const_new();

/// The process wide blob client, built from [`datacat_config::CONFIG`] on first use.
pub async fn default_blob_client() -> Result<Arc<ObjectStoreBlobClient>> {
    DEFAULT_BLOB_CLIENT
        .get_or_try_init(|| async {
            let backend = StoreBackend::from_str(&datacat_config::CONFIG.storage_backend)?;
            Ok::<_, StorageError>(Arc::new(ObjectStoreBlobClient::new(backend)))
        })
        .await
        .cloned()
}

/// One entry returned by a listing. Sub-prefixes returned by [`BlobClient::walk_blobs`]
/// end with a `/` and carry no meaningful timestamp.
///
/// `object_store` exposes no creation time, so `last_modified` is the best
/// ordering key available: rewriting a blob moves it to the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    pub name: String,
    pub last_modified: DateTime<Utc>,
    pub is_prefix: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Replace whatever is stored under the name.
    #[default]
    Overwrite,
    /// Fail if the name already exists.
    Create,
    /// Add the payload to the end of the existing blob, creating it if needed.
    Append,
}

/// Byte level access to a blob container, addressed by storage account and container.
///
/// Listings interpret `name_starts_with` at `/` boundaries.
#[async_trait::async_trait]
pub trait BlobClient: std::fmt::Debug + Send + Sync {
    async fn read_blob(&self, account: &str, container: &str, blob_name: &str) -> Result<Bytes>;

    async fn write_blob(
        &self,
        account: &str,
        container: &str,
        blob_name: &str,
        data: Bytes,
        mode: WriteMode,
    ) -> Result<()>;

    /// Immediate children of `name_starts_with`: blobs and sub-prefixes.
    async fn walk_blobs(
        &self,
        account: &str,
        container: &str,
        name_starts_with: &str,
    ) -> Result<Vec<BlobItem>>;

    /// Every blob below `name_starts_with`, at any depth.
    async fn list_blobs(
        &self,
        account: &str,
        container: &str,
        name_starts_with: &str,
    ) -> Result<Vec<BlobItem>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Azure,
    Local(PathBuf),
    Memory,
}

impl FromStr for StoreBackend {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "azure" => Ok(StoreBackend::Azure),
            "local" => Ok(StoreBackend::Local(
                datacat_config::CONFIG.local_storage_dir(),
            )),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(StorageError::UnsupportedBackend(other.to_string())),
        }
    }
}

/// [`BlobClient`] on top of `object_store`, with one store per (account, container).
#[derive(Debug)]
pub struct ObjectStoreBlobClient {
    backend: StoreBackend,
    stores: parking_lot::Mutex<HashMap<(String, String), Arc<dyn ObjectStore>>>,
}

impl ObjectStoreBlobClient {
    pub fn new(backend: StoreBackend) -> Self {
        Self {
            backend,
            stores: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(StoreBackend::Memory)
    }

    pub fn backend(&self) -> &StoreBackend {
        &self.backend
    }

    /// Route an (account, container) pair to an already built store.
    pub fn register_store(&self, account: &str, container: &str, store: Arc<dyn ObjectStore>) {
        self.stores
            .lock()
            .insert((account.to_string(), container.to_string()), store);
    }

    fn store(&self, account: &str, container: &str) -> Result<Arc<dyn ObjectStore>> {
        let key = (account.to_string(), container.to_string());
        let mut stores = self.stores.lock();
        if let Some(store) = stores.get(&key) {
            return Ok(store.clone());
        }

        let store: Arc<dyn ObjectStore> = match &self.backend {
            StoreBackend::Azure => {
                tracing::info!("Using Azure object store for {}/{}", account, container);
                let azure = MicrosoftAzureBuilder::from_env()
                    .with_account(account)
                    .with_container_name(container)
                    .build()
                    .map_err(|e| {
                        StorageError::InitializationError(format!(
                            "Failed to build Azure object store for {}/{}: {}",
                            account, container, e
                        ))
                    })?;
                Arc::new(azure)
            }
            StoreBackend::Local(root) => {
                let dir = root.join(account).join(container);
                std::fs::create_dir_all(&dir)?;
                tracing::info!("Using LocalFileSystem object store at {}", dir.display());
                Arc::new(LocalFileSystem::new_with_prefix(dir)?)
            }
            StoreBackend::Memory => Arc::new(InMemory::new()),
        };

        stores.insert(key, store.clone());
        Ok(store)
    }
}

impl Display for ObjectStoreBlobClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectStoreBlobClient({:?})", self.backend)
    }
}

fn listing_prefix(name_starts_with: &str) -> Option<Path> {
    let trimmed = name_starts_with.trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(Path::from(trimmed))
    }
}

#[async_trait::async_trait]
impl BlobClient for ObjectStoreBlobClient {
    async fn read_blob(&self, account: &str, container: &str, blob_name: &str) -> Result<Bytes> {
        let store = self.store(account, container)?;
        let bytes = store.get(&Path::from(blob_name)).await?.bytes().await?;
        Ok(bytes)
    }

    async fn write_blob(
        &self,
        account: &str,
        container: &str,
        blob_name: &str,
        data: Bytes,
        mode: WriteMode,
    ) -> Result<()> {
        let store = self.store(account, container)?;
        let location = Path::from(blob_name);
        match mode {
            WriteMode::Overwrite => {
                store.put(&location, PutPayload::from(data)).await?;
            }
            WriteMode::Create => {
                store
                    .put_opts(&location, PutPayload::from(data), PutMode::Create.into())
                    .await?;
            }
            WriteMode::Append => {
                // object_store has no native append, so the blob is rewritten whole.
                let existing = match store.get(&location).await {
                    Ok(result) => result.bytes().await?,
                    Err(object_store::Error::NotFound { .. }) => Bytes::new(),
                    Err(e) => return Err(e.into()),
                };
                let mut combined = BytesMut::with_capacity(existing.len() + data.len());
                combined.extend_from_slice(&existing);
                combined.extend_from_slice(&data);
                store
                    .put(&location, PutPayload::from(combined.freeze()))
                    .await?;
            }
        }
        Ok(())
    }

    async fn walk_blobs(
        &self,
        account: &str,
        container: &str,
        name_starts_with: &str,
    ) -> Result<Vec<BlobItem>> {
        let store = self.store(account, container)?;
        let prefix = listing_prefix(name_starts_with);
        let listing = store.list_with_delimiter(prefix.as_ref()).await?;

        let mut items: Vec<BlobItem> = listing
            .common_prefixes
            .into_iter()
            .map(|p| BlobItem {
                name: format!("{}/", p),
                last_modified: DateTime::<Utc>::default(),
                is_prefix: true,
            })
            .collect();
        items.extend(listing.objects.into_iter().map(|meta| BlobItem {
            name: meta.location.to_string(),
            last_modified: meta.last_modified,
            is_prefix: false,
        }));
        Ok(items)
    }

    async fn list_blobs(
        &self,
        account: &str,
        container: &str,
        name_starts_with: &str,
    ) -> Result<Vec<BlobItem>> {
        let store = self.store(account, container)?;
        let prefix = listing_prefix(name_starts_with);
        let objects: Vec<_> = store.list(prefix.as_ref()).try_collect().await?;
        Ok(objects
            .into_iter()
            .map(|meta| BlobItem {
                name: meta.location.to_string(),
                last_modified: meta.last_modified,
                is_prefix: false,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted_names(items: &[BlobItem]) -> Vec<String> {
        let mut names: Vec<_> = items.iter().map(|i| i.name.clone()).collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let client = ObjectStoreBlobClient::in_memory();
        client
            .write_blob("acct", "cont", "p/v1/a.csv", Bytes::from("a,b\n1,2\n"), WriteMode::Overwrite)
            .await
            .unwrap();
        let bytes = client.read_blob("acct", "cont", "p/v1/a.csv").await.unwrap();
        assert_eq!(bytes, Bytes::from("a,b\n1,2\n"));
    }

    #[tokio::test]
    async fn containers_are_isolated() {
        let client = ObjectStoreBlobClient::in_memory();
        client
            .write_blob("acct", "one", "x.txt", Bytes::from("1"), WriteMode::Overwrite)
            .await
            .unwrap();
        assert!(client.read_blob("acct", "two", "x.txt").await.is_err());
    }

    #[tokio::test]
    async fn walk_returns_immediate_children_only() {
        let client = ObjectStoreBlobClient::in_memory();
        for name in ["p/2024-01-01/a.csv", "p/2024-01-02/a.csv", "p/2024-01-02/sub/b.csv", "p/top.txt"] {
            client
                .write_blob("acct", "cont", name, Bytes::from("x"), WriteMode::Overwrite)
                .await
                .unwrap();
        }

        let items = client.walk_blobs("acct", "cont", "p/").await.unwrap();
        assert_eq!(
            sorted_names(&items),
            vec!["p/2024-01-01/", "p/2024-01-02/", "p/top.txt"]
        );
        assert!(items.iter().filter(|i| i.name.ends_with('/')).all(|i| i.is_prefix));

        let listed = client.list_blobs("acct", "cont", "p/2024-01-02/").await.unwrap();
        assert_eq!(
            sorted_names(&listed),
            vec!["p/2024-01-02/a.csv", "p/2024-01-02/sub/b.csv"]
        );
    }

    #[tokio::test]
    async fn listings_carry_the_last_write_time() {
        let client = ObjectStoreBlobClient::in_memory();
        client
            .write_blob("acct", "cont", "p/v/a.csv", Bytes::from("1"), WriteMode::Overwrite)
            .await
            .unwrap();
        let first = client.list_blobs("acct", "cont", "p/v/").await.unwrap()[0].last_modified;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        client
            .write_blob("acct", "cont", "p/v/a.csv", Bytes::from("2"), WriteMode::Overwrite)
            .await
            .unwrap();
        let second = client.list_blobs("acct", "cont", "p/v/").await.unwrap()[0].last_modified;
        assert!(second > first);
    }

    #[tokio::test]
    async fn append_extends_existing_blob() {
        let client = ObjectStoreBlobClient::in_memory();
        client
            .write_blob("acct", "cont", "log.jsonl", Bytes::from("one\n"), WriteMode::Append)
            .await
            .unwrap();
        client
            .write_blob("acct", "cont", "log.jsonl", Bytes::from("two\n"), WriteMode::Append)
            .await
            .unwrap();
        let bytes = client.read_blob("acct", "cont", "log.jsonl").await.unwrap();
        assert_eq!(bytes, Bytes::from("one\ntwo\n"));
    }

    #[tokio::test]
    async fn create_refuses_to_overwrite() {
        let client = ObjectStoreBlobClient::in_memory();
        client
            .write_blob("acct", "cont", "a.txt", Bytes::from("1"), WriteMode::Create)
            .await
            .unwrap();
        let second = client
            .write_blob("acct", "cont", "a.txt", Bytes::from("2"), WriteMode::Create)
            .await;
        assert!(matches!(second, Err(StorageError::ObjectStoreError(_))));
    }

    #[tokio::test]
    async fn local_backend_nests_account_and_container() {
        let dir = tempfile::tempdir().unwrap();
        let client = ObjectStoreBlobClient::new(StoreBackend::Local(dir.path().to_path_buf()));
        client
            .write_blob("acct", "cont", "p/v/a.txt", Bytes::from("hi"), WriteMode::Overwrite)
            .await
            .unwrap();
        let on_disk = std::fs::read(dir.path().join("acct/cont/p/v/a.txt")).unwrap();
        assert_eq!(on_disk, b"hi");
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = StoreBackend::from_str("ftp").unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedBackend(b) if b == "ftp"));
    }
}
