use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use tokio::sync::RwLock;

use crate::application::ports::object_store::{
    ObjectAttrs, ObjectStore, ObjectStoreError, ObjectWrite,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOp {
    Put,
    Get,
    Stat,
    Delete,
    Copy,
}

struct StoredObject {
    bytes: Vec<u8>,
    attrs: ObjectAttrs,
}

/// Process-local object store ordered by key. Each object gets a fresh
/// creation time when written, as a new generation does on a real bucket.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    faults: Mutex<Vec<(FaultOp, String)>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call of `op` fail with a transport error.
    pub fn fail_next(&self, op: FaultOp) {
        self.fail_next_with(op, &format!("injected {op:?} failure"));
    }

    pub fn fail_next_with(&self, op: FaultOp, message: &str) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.push((op, message.to_string()));
        }
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    fn take_fault(&self, op: FaultOp) -> Result<(), ObjectStoreError> {
        let Ok(mut faults) = self.faults.lock() else {
            return Ok(());
        };
        match faults.iter().position(|(pending, _)| *pending == op) {
            Some(idx) => {
                let (_, message) = faults.remove(idx);
                Err(ObjectStoreError::Other(anyhow!(message)))
            }
            None => Ok(()),
        }
    }
}

fn build_attrs(key: &str, size: usize, write: &ObjectWrite) -> ObjectAttrs {
    let now = Utc::now();
    ObjectAttrs {
        key: key.to_string(),
        size: size as i64,
        content_type: Some(write.content_type.clone()),
        created_at: now,
        updated_at: now,
        metadata: write.metadata.clone(),
        partial: false,
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        write: &ObjectWrite,
    ) -> Result<ObjectAttrs, ObjectStoreError> {
        self.take_fault(FaultOp::Put)?;
        let attrs = build_attrs(key, bytes.len(), write);
        let mut objects = self.objects.write().await;
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                attrs: attrs.clone(),
            },
        );
        Ok(attrs)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        self.take_fault(FaultOp::Get)?;
        let objects = self.objects.read().await;
        objects
            .get(key)
            .map(|obj| obj.bytes.clone())
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))
    }

    async fn stat(&self, key: &str) -> Result<ObjectAttrs, ObjectStoreError> {
        self.take_fault(FaultOp::Stat)?;
        let objects = self.objects.read().await;
        objects
            .get(key)
            .map(|obj| obj.attrs.clone())
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.take_fault(FaultOp::Delete)?;
        let mut objects = self.objects.write().await;
        objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))
    }

    async fn copy(
        &self,
        src_key: &str,
        dst_key: &str,
        refresh: Option<&ObjectWrite>,
    ) -> Result<(), ObjectStoreError> {
        self.take_fault(FaultOp::Copy)?;
        let mut objects = self.objects.write().await;
        let source = objects
            .get(src_key)
            .ok_or_else(|| ObjectStoreError::NotFound(src_key.to_string()))?;
        let bytes = source.bytes.clone();
        let write = match refresh {
            Some(write) => write.clone(),
            None => ObjectWrite {
                content_type: source.attrs.content_type.clone().unwrap_or_default(),
                metadata: source.attrs.metadata.clone(),
            },
        };
        let attrs = build_attrs(dst_key, bytes.len(), &write);
        objects.insert(dst_key.to_string(), StoredObject { bytes, attrs });
        Ok(())
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, Result<ObjectAttrs, ObjectStoreError>> {
        stream::once(async move {
            let objects = self.objects.read().await;
            let page: Vec<Result<ObjectAttrs, ObjectStoreError>> = objects
                .range(prefix.to_string()..)
                .take_while(|(key, _)| key.starts_with(prefix))
                .map(|(_, obj)| Ok(obj.attrs.clone()))
                .collect();
            stream::iter(page)
        })
        .flatten()
        .boxed()
    }
}
