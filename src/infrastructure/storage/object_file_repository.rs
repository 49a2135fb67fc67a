use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use futures_util::StreamExt;

use crate::application::ports::file_repository::FileRepository;
use crate::application::ports::object_store::{
    CREATED_AT_METADATA, Metadata, ObjectAttrs, ObjectStore, ObjectStoreError, ObjectWrite,
};
use crate::domain::files::content_type;
use crate::domain::files::errors::FileError;
use crate::domain::files::file::{
    CreateFileRequest, File, FileData, FileQuery, UpdateFileRequest, non_empty,
};

pub const ORIGINAL_NAME_METADATA: &str = "original_name";
pub const UPDATED_AT_METADATA: &str = "updated_at";
/// Written on the new object of a rename; lets a reconciliation job pair it
/// with a leftover old key.
pub const RENAMED_FROM_METADATA: &str = "renamed_from";

/// Where a rename stands. The backend has no atomic rename, so a rename
/// passes through a window where both keys hold live objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenamePhase {
    /// Nothing written under the new key; the old object is untouched.
    Pending { old_key: String, new_key: String },
    /// New key written, old key still live.
    DualExistence { old_key: String, new_key: String },
    /// Old key removed.
    Completed { new_key: String },
}

impl RenamePhase {
    fn start(old_key: &str, new_key: &str) -> Self {
        RenamePhase::Pending {
            old_key: old_key.to_string(),
            new_key: new_key.to_string(),
        }
    }

    fn written(self) -> Self {
        match self {
            RenamePhase::Pending { old_key, new_key } => {
                RenamePhase::DualExistence { old_key, new_key }
            }
            other => other,
        }
    }

    fn completed(self) -> Self {
        match self {
            RenamePhase::DualExistence { new_key, .. } | RenamePhase::Pending { new_key, .. } => {
                RenamePhase::Completed { new_key }
            }
            other => other,
        }
    }

    fn into_partial_failure(self, source: ObjectStoreError) -> FileError {
        match self {
            RenamePhase::Pending { old_key, new_key }
            | RenamePhase::DualExistence { old_key, new_key } => FileError::PartialRename {
                old_key,
                new_key,
                source: source.into(),
            },
            RenamePhase::Completed { new_key } => FileError::backend("rename", &new_key, source),
        }
    }
}

/// File repository over a flat object store. Physical keys are
/// `folder/name`, or the bare name when no folder is configured.
pub struct ObjectStorageFileRepository {
    store: Arc<dyn ObjectStore>,
    folder: String,
}

impl ObjectStorageFileRepository {
    pub fn new(store: Arc<dyn ObjectStore>, folder: &str) -> Self {
        Self {
            store,
            folder: folder.trim_matches('/').to_string(),
        }
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn object_key(&self, name: &str) -> String {
        if self.folder.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.folder, name)
        }
    }

    fn folder_prefix(&self) -> String {
        if self.folder.is_empty() {
            String::new()
        } else {
            format!("{}/", self.folder)
        }
    }

    pub fn id_from_key(&self, key: &str) -> String {
        if self.folder.is_empty() {
            return key.to_string();
        }
        let prefix = self.folder_prefix();
        match key.strip_prefix(&prefix) {
            Some(rest) if !rest.is_empty() => rest.to_string(),
            _ => key.to_string(),
        }
    }

    fn file_from_attrs(&self, attrs: ObjectAttrs) -> File {
        let id = self.id_from_key(&attrs.key);
        let name = attrs
            .metadata
            .get(ORIGINAL_NAME_METADATA)
            .cloned()
            .unwrap_or_else(|| id.clone());
        File {
            id,
            name,
            path: attrs.key,
            size: attrs.size,
            content_type: attrs
                .content_type
                .unwrap_or_else(|| content_type::DEFAULT_CONTENT_TYPE.to_string()),
            created_at: attrs.created_at,
            updated_at: attrs.updated_at,
        }
    }

    async fn stat_existing(&self, key: &str) -> Result<ObjectAttrs, FileError> {
        match self.store.stat(key).await {
            Ok(attrs) => Ok(attrs),
            Err(err) if err.is_not_found() => Err(FileError::NotFound),
            Err(err) => Err(FileError::backend("stat", key, err)),
        }
    }
}

fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl FileRepository for ObjectStorageFileRepository {
    async fn create(&self, req: CreateFileRequest) -> Result<File, FileError> {
        let key = self.object_key(&req.name);
        let content_type = non_empty(req.content_type.as_deref())
            .unwrap_or_else(|| content_type::resolve(&req.name))
            .to_string();
        let mut metadata = Metadata::new();
        metadata.insert(ORIGINAL_NAME_METADATA.to_string(), req.name.clone());
        metadata.insert(CREATED_AT_METADATA.to_string(), timestamp_now());
        let write = ObjectWrite {
            content_type,
            metadata,
        };

        let attrs = self
            .store
            .put(&key, req.content, &write)
            .await
            .map_err(|err| FileError::backend("put", &key, err))?;
        tracing::debug!(key = %key, size = attrs.size, "file_created");
        Ok(self.file_from_attrs(attrs))
    }

    async fn get_by_id(&self, id: &str) -> Result<File, FileError> {
        let attrs = self.stat_existing(&self.object_key(id)).await?;
        Ok(self.file_from_attrs(attrs))
    }

    async fn get_content(&self, id: &str) -> Result<FileData, FileError> {
        let key = self.object_key(id);
        let attrs = self.stat_existing(&key).await?;
        let content = match self.store.get(&key).await {
            Ok(bytes) => bytes,
            Err(err) if err.is_not_found() => return Err(FileError::NotFound),
            Err(err) => return Err(FileError::backend("get", &key, err)),
        };
        Ok(FileData {
            file: self.file_from_attrs(attrs),
            content,
        })
    }

    async fn list(&self, query: &FileQuery) -> Result<Vec<File>, FileError> {
        let prefix = match non_empty(query.prefix.as_deref()) {
            Some(sub) => self.object_key(sub),
            None => self.folder_prefix(),
        };

        // offset and limit are emulated over the cursor: O(offset + limit)
        let mut collected: Vec<ObjectAttrs> = Vec::new();
        let mut skipped: i64 = 0;
        {
            let mut entries = self.store.list(&prefix);
            while let Some(entry) = entries.next().await {
                let attrs = entry.map_err(|err| FileError::backend("list", &prefix, err))?;
                if attrs.is_directory_marker() {
                    continue;
                }
                if skipped < query.offset {
                    skipped += 1;
                    continue;
                }
                collected.push(attrs);
                if query.limit > 0 && collected.len() as i64 >= query.limit {
                    break;
                }
            }
        }

        let mut files = Vec::with_capacity(collected.len());
        for attrs in collected {
            let attrs = if attrs.partial {
                match self.store.stat(&attrs.key).await {
                    Ok(full) => full,
                    Err(err) if err.is_not_found() => {
                        tracing::debug!(key = %attrs.key, "listed_object_vanished");
                        continue;
                    }
                    Err(err) => return Err(FileError::backend("stat", &attrs.key, err)),
                }
            } else {
                attrs
            };
            files.push(self.file_from_attrs(attrs));
        }
        Ok(files)
    }

    async fn update(&self, id: &str, req: UpdateFileRequest) -> Result<File, FileError> {
        let old_key = self.object_key(id);
        let current = self.stat_existing(&old_key).await?;

        let new_name = non_empty(req.name.as_deref());
        let rename_to = new_name.filter(|name| *name != id);
        let mut phase = rename_to.map(|name| RenamePhase::start(&old_key, &self.object_key(name)));
        let target_key = rename_to
            .map(|name| self.object_key(name))
            .unwrap_or_else(|| old_key.clone());

        let mut metadata = current.metadata.clone();
        metadata.insert(UPDATED_AT_METADATA.to_string(), timestamp_now());
        if let Some(name) = new_name {
            metadata.insert(ORIGINAL_NAME_METADATA.to_string(), name.to_string());
        }
        if phase.is_some() {
            metadata.insert(RENAMED_FROM_METADATA.to_string(), old_key.clone());
        }

        if let Some(content) = req.content {
            let content_type = non_empty(req.content_type.as_deref())
                .map(str::to_string)
                .or_else(|| current.content_type.clone())
                .unwrap_or_else(|| content_type::resolve(new_name.unwrap_or(id)).to_string());
            let write = ObjectWrite {
                content_type,
                metadata,
            };
            if let Err(err) = self.store.put(&target_key, content, &write).await {
                tracing::warn!(key = %target_key, ?phase, error = ?err, "file_update_write_failed");
                return Err(FileError::backend("put", &target_key, err));
            }
        } else if phase.is_some() {
            let write = ObjectWrite {
                content_type: current
                    .content_type
                    .clone()
                    .unwrap_or_else(|| content_type::DEFAULT_CONTENT_TYPE.to_string()),
                metadata,
            };
            if let Err(err) = self.store.copy(&old_key, &target_key, Some(&write)).await {
                tracing::warn!(src = %old_key, dst = %target_key, ?phase, error = ?err, "file_rename_copy_failed");
                if err.is_not_found() {
                    return Err(FileError::NotFound);
                }
                return Err(FileError::backend("copy", &old_key, err));
            }
        }

        if let Some(pending) = phase.take() {
            let written = pending.written();
            if let Err(err) = self.store.delete(&old_key).await {
                tracing::error!(
                    old_key = %old_key,
                    new_key = %target_key,
                    error = ?err,
                    "file_rename_dual_existence"
                );
                return Err(written.into_partial_failure(err));
            }
            phase = Some(written.completed());
        }

        let attrs = self
            .store
            .stat(&target_key)
            .await
            .map_err(|err| FileError::backend("stat", &target_key, err))?;
        tracing::debug!(key = %target_key, ?phase, "file_updated");
        Ok(self.file_from_attrs(attrs))
    }

    async fn delete(&self, id: &str) -> Result<(), FileError> {
        let key = self.object_key(id);
        match self.store.delete(&key).await {
            Ok(()) => {
                tracing::debug!(key = %key, "file_deleted");
                Ok(())
            }
            Err(err) if err.is_not_found() => Err(FileError::NotFound),
            Err(err) => Err(FileError::backend("delete", &key, err)),
        }
    }

    async fn exists(&self, id: &str) -> Result<bool, FileError> {
        let key = self.object_key(id);
        match self.store.stat(&key).await {
            Ok(_) => Ok(true),
            Err(err) if err.looks_not_found() => Ok(false),
            Err(err) => Err(FileError::backend("exists", &key, err)),
        }
    }
}
