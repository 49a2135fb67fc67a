use crate::application::ports::file_repository::FileRepository;
use crate::domain::files::errors::FileError;
use crate::domain::files::naming::require_id;

pub struct DeleteFile<'a, R: FileRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: FileRepository + ?Sized> DeleteFile<'a, R> {
    pub async fn execute(&self, id: &str) -> Result<(), FileError> {
        require_id(id)?;
        self.repo.delete(id).await.map_err(|err| {
            if !err.is_client_error() {
                tracing::error!(error = ?err, id = %id, "delete_file_failed");
            }
            err.context("failed to delete file")
        })
    }
}
