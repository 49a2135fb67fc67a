use crate::application::ports::file_repository::FileRepository;
use crate::domain::files::errors::FileError;
use crate::domain::files::file::File;
use crate::domain::files::naming::require_id;

pub struct GetFile<'a, R: FileRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: FileRepository + ?Sized> GetFile<'a, R> {
    pub async fn execute(&self, id: &str) -> Result<File, FileError> {
        require_id(id)?;
        self.repo
            .get_by_id(id)
            .await
            .map_err(|err| err.context("failed to get file"))
    }
}
