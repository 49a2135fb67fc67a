#[derive(thiserror::Error, Debug)]
pub enum FileError {
    #[error("invalid file name")]
    InvalidName,
    #[error("file already exists")]
    AlreadyExists,
    #[error("file not found")]
    NotFound,
    #[error("{op} failed for {key}")]
    Backend {
        op: &'static str,
        key: String,
        #[source]
        source: anyhow::Error,
    },
    /// The new object was written but the old one could not be removed; both
    /// keys are live and need reconciling by an operator.
    #[error("rename from {old_key} to {new_key} left both objects in place")]
    PartialRename {
        old_key: String,
        new_key: String,
        #[source]
        source: anyhow::Error,
    },
}

impl FileError {
    pub fn backend(op: &'static str, key: &str, source: impl Into<anyhow::Error>) -> Self {
        FileError::Backend {
            op,
            key: key.to_string(),
            source: source.into(),
        }
    }

    /// Client-correctable errors (bad input, collisions, missing targets).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FileError::InvalidName | FileError::AlreadyExists | FileError::NotFound
        )
    }

    /// Wraps backend failures with an outer message; typed errors pass through.
    pub fn context(self, what: &'static str) -> Self {
        match self {
            FileError::Backend { op, key, source } => FileError::Backend {
                op,
                key,
                source: source.context(what),
            },
            FileError::PartialRename {
                old_key,
                new_key,
                source,
            } => FileError::PartialRename {
                old_key,
                new_key,
                source: source.context(what),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_typed_errors() {
        let err = FileError::NotFound.context("failed to get file");
        assert!(matches!(err, FileError::NotFound));
        assert!(err.is_client_error());
    }

    #[test]
    fn context_wraps_backend_source() {
        let err = FileError::backend("put", "test/a.txt", anyhow::anyhow!("connection reset"))
            .context("failed to create file");
        assert!(!err.is_client_error());
        match err {
            FileError::Backend { op, key, source } => {
                assert_eq!(op, "put");
                assert_eq!(key, "test/a.txt");
                assert_eq!(source.to_string(), "failed to create file");
                assert_eq!(source.root_cause().to_string(), "connection reset");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
