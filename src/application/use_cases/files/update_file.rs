use crate::application::ports::file_repository::FileRepository;
use crate::domain::files::content_type;
use crate::domain::files::errors::FileError;
use crate::domain::files::file::{File, UpdateFileRequest, non_empty};
use crate::domain::files::naming::{require_id, validate_file_name};

pub struct UpdateFile<'a, R: FileRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: FileRepository + ?Sized> UpdateFile<'a, R> {
    pub async fn execute(&self, id: &str, mut req: UpdateFileRequest) -> Result<File, FileError> {
        require_id(id)?;
        let new_name = non_empty(req.name.as_deref()).map(str::to_string);
        if let Some(name) = new_name.as_deref() {
            validate_file_name(name)?;
            // a rename must not clobber another file
            if name != id
                && self
                    .repo
                    .exists(name)
                    .await
                    .map_err(|err| err.context("failed to check rename target"))?
            {
                return Err(FileError::AlreadyExists);
            }
        }

        if req.content.is_some() && non_empty(req.content_type.as_deref()).is_none() {
            let resolved = match new_name.as_deref() {
                Some(name) => content_type::resolve(name),
                None => {
                    let current = self
                        .repo
                        .get_by_id(id)
                        .await
                        .map_err(|err| err.context("failed to load file for update"))?;
                    content_type::resolve(&current.name)
                }
            };
            req.content_type = Some(resolved.to_string());
        }

        self.repo.update(id, req).await.map_err(|err| {
            // dual existence is already logged with both keys by the repository
            if !err.is_client_error() && !matches!(err, FileError::PartialRename { .. }) {
                tracing::error!(error = ?err, id = %id, "update_file_failed");
            }
            err.context("failed to update file")
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::files::file::CreateFileRequest;
    use crate::infrastructure::storage::ObjectStorageFileRepository;
    use crate::infrastructure::storage::memory::MemoryObjectStore;

    async fn seeded(names: &[&str]) -> ObjectStorageFileRepository {
        let repo = ObjectStorageFileRepository::new(Arc::new(MemoryObjectStore::new()), "test");
        for name in names {
            repo.create(CreateFileRequest {
                name: name.to_string(),
                content: b"data".to_vec(),
                content_type: None,
            })
            .await
            .unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn rename_moves_file_and_keeps_bytes() {
        let repo = seeded(&["a.txt"]).await;
        let file = UpdateFile { repo: &repo }
            .execute(
                "a.txt",
                UpdateFileRequest {
                    name: Some("b.txt".into()),
                    ..UpdateFileRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(file.id, "b.txt");
        assert!(matches!(
            repo.get_by_id("a.txt").await.unwrap_err(),
            FileError::NotFound
        ));
        assert_eq!(repo.get_content("b.txt").await.unwrap().content, b"data");
    }

    #[tokio::test]
    async fn content_type_follows_new_name() {
        let repo = seeded(&["notes.txt"]).await;
        let file = UpdateFile { repo: &repo }
            .execute(
                "notes.txt",
                UpdateFileRequest {
                    name: Some("notes.json".into()),
                    content: Some(b"{}".to_vec()),
                    content_type: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(file.content_type, "application/json");
    }

    #[tokio::test]
    async fn content_type_falls_back_to_existing_name() {
        let repo = seeded(&["page.html"]).await;
        let file = UpdateFile { repo: &repo }
            .execute(
                "page.html",
                UpdateFileRequest {
                    content: Some(b"<p>".to_vec()),
                    ..UpdateFileRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(file.content_type, "text/html");
    }

    #[tokio::test]
    async fn rename_onto_existing_file_is_rejected() {
        let repo = seeded(&["a.txt", "b.txt"]).await;
        let err = UpdateFile { repo: &repo }
            .execute(
                "a.txt",
                UpdateFileRequest {
                    name: Some("b.txt".into()),
                    ..UpdateFileRequest::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::AlreadyExists));
        assert!(repo.exists("a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn invalid_new_name_and_empty_id() {
        let repo = seeded(&["a.txt"]).await;
        let uc = UpdateFile { repo: &repo };
        let bad_name = UpdateFileRequest {
            name: Some("a|b".into()),
            ..UpdateFileRequest::default()
        };
        assert!(matches!(
            uc.execute("a.txt", bad_name).await.unwrap_err(),
            FileError::InvalidName
        ));
        assert!(matches!(
            uc.execute("", UpdateFileRequest::default()).await.unwrap_err(),
            FileError::InvalidName
        ));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let repo = seeded(&[]).await;
        let err = UpdateFile { repo: &repo }
            .execute(
                "ghost.txt",
                UpdateFileRequest {
                    content: Some(b"x".to_vec()),
                    ..UpdateFileRequest::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::NotFound));
    }
}
