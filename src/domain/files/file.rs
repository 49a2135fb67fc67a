/// A stored file as seen by callers. `id` is recomputed from `path` on every
/// read, so it always reflects the current physical location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub id: String,
    pub name: String,
    pub path: String,
    pub size: i64,
    pub content_type: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct FileData {
    pub file: File,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct CreateFileRequest {
    pub name: String,
    pub content: Vec<u8>,
    pub content_type: Option<String>,
}

// name: rename when it differs from the current id; content_type only matters with content
#[derive(Debug, Clone, Default)]
pub struct UpdateFileRequest {
    pub name: Option<String>,
    pub content: Option<Vec<u8>>,
    pub content_type: Option<String>,
}

pub const DEFAULT_LIST_LIMIT: i64 = 100;
pub const MAX_LIST_LIMIT: i64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileQuery {
    /// Sub-path relative to the configured folder.
    pub prefix: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for FileQuery {
    fn default() -> Self {
        Self {
            prefix: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
