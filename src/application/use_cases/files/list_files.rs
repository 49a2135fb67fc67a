use crate::application::ports::file_repository::FileRepository;
use crate::domain::files::errors::FileError;
use crate::domain::files::file::{DEFAULT_LIST_LIMIT, File, FileQuery, MAX_LIST_LIMIT};

pub struct ListFiles<'a, R: FileRepository + ?Sized> {
    pub repo: &'a R,
}

/// Non-positive limits fall back to the default; larger ones are capped.
pub fn clamp_limit(limit: i64) -> i64 {
    if limit <= 0 {
        DEFAULT_LIST_LIMIT
    } else {
        limit.min(MAX_LIST_LIMIT)
    }
}

impl<'a, R: FileRepository + ?Sized> ListFiles<'a, R> {
    pub async fn execute(&self, mut query: FileQuery) -> Result<Vec<File>, FileError> {
        query.limit = clamp_limit(query.limit);
        self.repo
            .list(&query)
            .await
            .map_err(|err| err.context("failed to list files"))
    }
}
