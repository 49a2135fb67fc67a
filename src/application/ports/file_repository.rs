use async_trait::async_trait;

use crate::domain::files::errors::FileError;
use crate::domain::files::file::{CreateFileRequest, File, FileData, FileQuery, UpdateFileRequest};

/// Storage contract the file use cases depend on. Ids are logical names;
/// implementations own the mapping to physical keys.
#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn create(&self, req: CreateFileRequest) -> Result<File, FileError>;
    async fn get_by_id(&self, id: &str) -> Result<File, FileError>;
    async fn get_content(&self, id: &str) -> Result<FileData, FileError>;
    async fn list(&self, query: &FileQuery) -> Result<Vec<File>, FileError>;
    async fn update(&self, id: &str, req: UpdateFileRequest) -> Result<File, FileError>;
    async fn delete(&self, id: &str) -> Result<(), FileError>;
    async fn exists(&self, id: &str) -> Result<bool, FileError>;
}
