use crate::application::ports::file_repository::FileRepository;
use crate::domain::files::content_type;
use crate::domain::files::errors::FileError;
use crate::domain::files::file::{CreateFileRequest, File, non_empty};
use crate::domain::files::naming::validate_file_name;

pub struct CreateFile<'a, R: FileRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: FileRepository + ?Sized> CreateFile<'a, R> {
    pub async fn execute(&self, mut req: CreateFileRequest) -> Result<File, FileError> {
        validate_file_name(&req.name)?;
        if non_empty(req.content_type.as_deref()).is_none() {
            req.content_type = Some(content_type::resolve(&req.name).to_string());
        }

        // check-then-write: two concurrent creates of one name can both pass
        if self
            .repo
            .exists(&req.name)
            .await
            .map_err(|err| err.context("failed to check file existence"))?
        {
            return Err(FileError::AlreadyExists);
        }

        let name = req.name.clone();
        self.repo.create(req).await.map_err(|err| {
            tracing::error!(error = ?err, name = %name, "create_file_failed");
            err.context("failed to create file")
        })
    }
}
