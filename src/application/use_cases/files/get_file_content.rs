use crate::application::ports::file_repository::FileRepository;
use crate::domain::files::errors::FileError;
use crate::domain::files::file::FileData;
use crate::domain::files::naming::require_id;

pub struct GetFileContent<'a, R: FileRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: FileRepository + ?Sized> GetFileContent<'a, R> {
    pub async fn execute(&self, id: &str) -> Result<FileData, FileError> {
        require_id(id)?;
        self.repo
            .get_content(id)
            .await
            .map_err(|err| err.context("failed to get file content"))
    }
}
