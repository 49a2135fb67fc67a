use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;

/// Sidecar metadata attached to an object.
pub type Metadata = BTreeMap<String, String>;

/// Sidecar entry holding the creation time, for backends that only report a
/// last-modified time.
pub const CREATED_AT_METADATA: &str = "created_at";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectAttrs {
    pub key: String,
    pub size: i64,
    pub content_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: Metadata,
    /// Set on listing entries when the backend could not report content type
    /// or metadata; a `stat` on the key returns the full attributes.
    pub partial: bool,
}

impl ObjectAttrs {
    pub fn is_directory_marker(&self) -> bool {
        self.key.ends_with('/')
    }
}

/// Content type and metadata written with an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectWrite {
    pub content_type: String,
    pub metadata: Metadata,
}

#[derive(thiserror::Error, Debug)]
pub enum ObjectStoreError {
    #[error("object {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ObjectStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ObjectStoreError::NotFound(_))
    }

    /// Typed not-found, or a transport error whose message carries a 404 /
    /// not-found marker because the client never mapped it to a typed error.
    pub fn looks_not_found(&self) -> bool {
        match self {
            ObjectStoreError::NotFound(_) => true,
            ObjectStoreError::Other(err) => err.chain().any(|cause| {
                let text = cause.to_string().to_ascii_lowercase();
                text.contains("404")
                    || text.contains("not found")
                    || text.contains("notfound")
                    || text.contains("nosuchkey")
            }),
        }
    }
}

/// Black-box object storage capability. Keys are full physical keys.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes the object and returns the attributes the backend reports for it.
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        write: &ObjectWrite,
    ) -> Result<ObjectAttrs, ObjectStoreError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError>;
    async fn stat(&self, key: &str) -> Result<ObjectAttrs, ObjectStoreError>;
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
    /// Copies `src_key` to `dst_key`. With `refresh` the copy gets the given
    /// content type and metadata instead of the source's.
    async fn copy(
        &self,
        src_key: &str,
        dst_key: &str,
        refresh: Option<&ObjectWrite>,
    ) -> Result<(), ObjectStoreError>;
    /// Forward cursor over every object whose key starts with `prefix`, in
    /// backend order. The end of the stream is the end of the listing.
    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, Result<ObjectAttrs, ObjectStoreError>>;
}
