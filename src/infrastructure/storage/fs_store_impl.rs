use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use serde::{Deserialize, Serialize};
use tokio::fs;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::application::ports::object_store::{
    Metadata, ObjectAttrs, ObjectStore, ObjectStoreError, ObjectWrite,
};

const SIDECAR_DIR: &str = ".meta";
// staging area for atomic writes, outside the key space
const TEMP_DIR: &str = ".tmp";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Sidecar {
    content_type: String,
    #[serde(default)]
    metadata: Metadata,
    created_at: DateTime<Utc>,
}

/// Object store on a local directory. Object bytes live at `<root>/<key>`,
/// attributes in `<root>/.meta/<key>.json`.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub async fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(SIDECAR_DIR).join(TEMP_DIR))
            .await
            .with_context(|| format!("failed to create storage root {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative(key: &str) -> Result<PathBuf, ObjectStoreError> {
        // a file can't carry a trailing slash; directory markers have no home here
        if key.ends_with('/') {
            return Err(anyhow!("directory key {key:?} cannot be stored as a file").into());
        }
        let mut relative = PathBuf::new();
        for component in Path::new(key).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir | Component::RootDir => continue,
                _ => return Err(anyhow!("key {key} escapes the storage root").into()),
            }
        }
        if relative.as_os_str().is_empty() || relative.starts_with(SIDECAR_DIR) {
            return Err(anyhow!("invalid object key {key:?}").into());
        }
        Ok(relative)
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, ObjectStoreError> {
        Ok(self.root.join(Self::relative(key)?))
    }

    // reads treat a directory-style key as absent rather than invalid
    fn existing_path(&self, key: &str) -> Result<PathBuf, ObjectStoreError> {
        if key.ends_with('/') {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        self.object_path(key)
    }

    fn sidecar_path(&self, key: &str) -> Result<PathBuf, ObjectStoreError> {
        let mut path = self.root.join(SIDECAR_DIR).join(Self::relative(key)?);
        let mut file_name = path.file_name().unwrap_or_default().to_os_string();
        file_name.push(".json");
        path.set_file_name(file_name);
        Ok(path)
    }

    async fn read_sidecar(&self, key: &str) -> Result<Option<Sidecar>, ObjectStoreError> {
        let path = self.sidecar_path(key)?;
        match fs::read(&path).await {
            Ok(raw) => {
                let sidecar = serde_json::from_slice(&raw)
                    .with_context(|| format!("corrupt sidecar {}", path.display()))?;
                Ok(Some(sidecar))
            }
            Err(err) if is_missing(&err) => Ok(None),
            Err(err) => Err(anyhow::Error::from(err)
                .context(format!("failed to read sidecar {}", path.display()))
                .into()),
        }
    }

    async fn write_sidecar(&self, key: &str, sidecar: &Sidecar) -> Result<(), ObjectStoreError> {
        let path = self.sidecar_path(key)?;
        let raw = serde_json::to_vec(sidecar).context("failed to encode sidecar")?;
        self.write_atomic(&path, &raw).await
    }

    // temp file + rename so readers never observe a half-written object
    async fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), ObjectStoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let tmp_dir = self.root.join(SIDECAR_DIR).join(TEMP_DIR);
        fs::create_dir_all(&tmp_dir)
            .await
            .with_context(|| format!("failed to create {}", tmp_dir.display()))?;
        let tmp = tmp_dir.join(format!("{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, data)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        if let Err(err) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(anyhow::Error::from(err)
                .context(format!("failed to move object into {}", path.display()))
                .into());
        }
        Ok(())
    }
}

// a parent path component that is a regular file also means "no such object"
fn is_missing(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}

fn io_error(key: &str, op: &str, err: std::io::Error) -> ObjectStoreError {
    if is_missing(&err) {
        ObjectStoreError::NotFound(key.to_string())
    } else {
        anyhow::Error::from(err)
            .context(format!("{op} failed for {key}"))
            .into()
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        write: &ObjectWrite,
    ) -> Result<ObjectAttrs, ObjectStoreError> {
        let path = self.object_path(key)?;
        self.write_atomic(&path, &bytes).await?;
        let sidecar = Sidecar {
            content_type: write.content_type.clone(),
            metadata: write.metadata.clone(),
            created_at: Utc::now(),
        };
        self.write_sidecar(key, &sidecar).await?;
        self.stat(key).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let path = self.existing_path(key)?;
        fs::read(&path).await.map_err(|err| io_error(key, "read", err))
    }

    async fn stat(&self, key: &str) -> Result<ObjectAttrs, ObjectStoreError> {
        let path = self.existing_path(key)?;
        let meta = fs::metadata(&path)
            .await
            .map_err(|err| io_error(key, "stat", err))?;
        if !meta.is_file() {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        let updated_at: DateTime<Utc> = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let sidecar = self.read_sidecar(key).await?;
        Ok(ObjectAttrs {
            key: key.to_string(),
            size: meta.len() as i64,
            content_type: sidecar.as_ref().map(|s| s.content_type.clone()),
            created_at: sidecar.as_ref().map(|s| s.created_at).unwrap_or(updated_at),
            updated_at,
            metadata: sidecar.map(|s| s.metadata).unwrap_or_default(),
            partial: false,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        let path = self.existing_path(key)?;
        fs::remove_file(&path)
            .await
            .map_err(|err| io_error(key, "delete", err))?;
        if let Err(err) = fs::remove_file(self.sidecar_path(key)?).await {
            if !is_missing(&err) {
                tracing::warn!(key = %key, error = ?err, "sidecar_delete_failed");
            }
        }
        Ok(())
    }

    async fn copy(
        &self,
        src_key: &str,
        dst_key: &str,
        refresh: Option<&ObjectWrite>,
    ) -> Result<(), ObjectStoreError> {
        let bytes = self.get(src_key).await?;
        let sidecar = match refresh {
            Some(write) => Sidecar {
                content_type: write.content_type.clone(),
                metadata: write.metadata.clone(),
                created_at: Utc::now(),
            },
            None => {
                let source = self.read_sidecar(src_key).await?;
                Sidecar {
                    content_type: source
                        .as_ref()
                        .map(|s| s.content_type.clone())
                        .unwrap_or_default(),
                    metadata: source.map(|s| s.metadata).unwrap_or_default(),
                    created_at: Utc::now(),
                }
            }
        };
        self.write_atomic(&self.object_path(dst_key)?, &bytes).await?;
        self.write_sidecar(dst_key, &sidecar).await
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, Result<ObjectAttrs, ObjectStoreError>> {
        stream::once(async move {
            let root = self.root.clone();
            let owned_prefix = prefix.to_string();
            let keys = tokio::task::spawn_blocking(move || collect_keys(&root, &owned_prefix))
                .await
                .map_err(|err| ObjectStoreError::Other(anyhow!("listing task failed: {err}")))
                .and_then(|keys| keys);
            match keys {
                // keys deleted since the walk are skipped
                Ok(keys) => stream::iter(keys)
                    .then(move |key| async move { self.stat(&key).await })
                    .filter(|entry| {
                        futures_util::future::ready(
                            !matches!(entry, Err(err) if err.is_not_found()),
                        )
                    })
                    .boxed(),
                Err(err) => stream::iter(vec![Err(err)]).boxed(),
            }
        })
        .flatten()
        .boxed()
    }
}

// Keys under `prefix`, sorted bytewise like a bucket listing. The walk
// starts at the deepest directory the prefix names.
fn collect_keys(root: &Path, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
    let mut start_dir = root.to_path_buf();
    if let Some(idx) = prefix.rfind('/') {
        for component in Path::new(&prefix[..idx]).components() {
            match component {
                Component::Normal(part) => start_dir.push(part),
                Component::CurDir | Component::RootDir => continue,
                _ => return Ok(Vec::new()),
            }
        }
    }
    if !start_dir.is_dir() {
        return Ok(Vec::new());
    }
    let sidecar_root = root.join(SIDECAR_DIR);
    let mut keys = Vec::new();
    let walker = WalkDir::new(&start_dir)
        .into_iter()
        .filter_entry(|entry| entry.path() != sidecar_root);
    for entry in walker {
        let entry = entry.context("failed to walk storage root")?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let key = rel.to_string_lossy().replace('\\', "/");
        if key.starts_with(prefix) {
            keys.push(key);
        }
    }
    keys.sort();
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;
    use tempfile::TempDir;

    async fn store() -> (TempDir, FsObjectStore) {
        let temp = TempDir::new().unwrap();
        let store = FsObjectStore::new(temp.path().join("objects")).await.unwrap();
        (temp, store)
    }

    fn write(content_type: &str) -> ObjectWrite {
        ObjectWrite {
            content_type: content_type.to_string(),
            ..ObjectWrite::default()
        }
    }

    #[tokio::test]
    async fn put_then_stat_reports_sidecar_attributes() {
        let (_temp, store) = store().await;
        let mut w = write("text/plain");
        w.metadata.insert("original_name".into(), "a b.txt".into());
        let attrs = store.put("test/a.txt", b"hello".to_vec(), &w).await.unwrap();
        assert_eq!(attrs.size, 5);
        assert_eq!(attrs.content_type.as_deref(), Some("text/plain"));
        assert_eq!(attrs.metadata.get("original_name").unwrap(), "a b.txt");
        assert_eq!(store.get("test/a.txt").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn missing_objects_are_typed_not_found() {
        let (_temp, store) = store().await;
        assert!(store.get("nope").await.unwrap_err().is_not_found());
        assert!(store.stat("nope").await.unwrap_err().is_not_found());
        assert!(store.delete("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn keys_cannot_escape_root() {
        let (_temp, store) = store().await;
        let err = store
            .put("../outside", Vec::new(), &write("text/plain"))
            .await
            .unwrap_err();
        assert!(!err.is_not_found());
        assert!(store.get(".meta/x.json").await.is_err());
    }

    #[tokio::test]
    async fn list_walks_sorted_and_skips_sidecars() {
        let (_temp, store) = store().await;
        for key in ["test/b.txt", "test/a/1.txt", "test/a.txt", "other/c.txt"] {
            store.put(key, b"x".to_vec(), &write("text/plain")).await.unwrap();
        }
        let keys: Vec<String> = store
            .list("test/")
            .map_ok(|attrs| attrs.key)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(keys, ["test/a.txt", "test/a/1.txt", "test/b.txt"]);

        let keys: Vec<String> = store
            .list("test/a")
            .map_ok(|attrs| attrs.key)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(keys, ["test/a.txt", "test/a/1.txt"]);
    }

    #[tokio::test]
    async fn copy_and_delete() {
        let (_temp, store) = store().await;
        store
            .put("src.bin", vec![1, 2, 3], &write("application/octet-stream"))
            .await
            .unwrap();
        store
            .copy("src.bin", "dst.bin", Some(&write("application/zip")))
            .await
            .unwrap();
        store.delete("src.bin").await.unwrap();

        assert!(store.stat("src.bin").await.unwrap_err().is_not_found());
        let attrs = store.stat("dst.bin").await.unwrap();
        assert_eq!(attrs.content_type.as_deref(), Some("application/zip"));
        assert_eq!(store.get("dst.bin").await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn directory_keys_never_resolve_to_objects() {
        let (_temp, store) = store().await;
        store
            .put("test/dir/a.txt", b"x".to_vec(), &write("text/plain"))
            .await
            .unwrap();

        let err = store
            .put("test/dir/", b"x".to_vec(), &write("text/plain"))
            .await
            .unwrap_err();
        assert!(!err.is_not_found());
        assert!(store.stat("test/dir/").await.unwrap_err().is_not_found());
        assert!(store.get("test/dir/").await.unwrap_err().is_not_found());
        assert!(store.delete("test/dir/").await.unwrap_err().is_not_found());
        assert!(store.stat("test/dir").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn file_in_parent_position_is_not_found() {
        let (_temp, store) = store().await;
        store
            .put("test/plain", b"x".to_vec(), &write("text/plain"))
            .await
            .unwrap();

        assert!(store.stat("test/plain/a.txt").await.unwrap_err().is_not_found());
        assert!(store.get("test/plain/a.txt").await.unwrap_err().is_not_found());
        assert!(store.delete("test/plain/a.txt").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn tmp_suffixed_keys_are_ordinary_objects() {
        let (_temp, store) = store().await;
        let key = format!("test/x.{}.tmp", Uuid::new_v4());
        store.put(&key, b"x".to_vec(), &write("text/plain")).await.unwrap();
        store.put("test/y.txt", b"y".to_vec(), &write("text/plain")).await.unwrap();

        let keys: Vec<String> = store
            .list("test/")
            .map_ok(|attrs| attrs.key)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(keys, [key.as_str(), "test/y.txt"]);
        assert!(store.root().join(".meta/.tmp").is_dir());
    }

    #[tokio::test]
    async fn list_skips_objects_deleted_mid_walk() {
        let (_temp, store) = store().await;
        for key in ["test/1.txt", "test/2.txt", "test/3.txt"] {
            store.put(key, b"x".to_vec(), &write("text/plain")).await.unwrap();
        }

        let mut listing = store.list("test/");
        let first = listing.next().await.unwrap().unwrap();
        assert_eq!(first.key, "test/1.txt");
        store.delete("test/2.txt").await.unwrap();
        let rest: Vec<String> = listing.map_ok(|attrs| attrs.key).try_collect().await.unwrap();
        assert_eq!(rest, ["test/3.txt"]);
    }
}
