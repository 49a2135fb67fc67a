#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;

use trus3_api::application::ports::file_repository::FileRepository;
use trus3_api::bootstrap::app_context::{AppContext, AppServices};
use trus3_api::bootstrap::config::{Config, StorageBackend};
use trus3_api::infrastructure::storage::ObjectStorageFileRepository;
use trus3_api::infrastructure::storage::fs::FsObjectStore;
use trus3_api::infrastructure::storage::memory::MemoryObjectStore;

pub const BOUNDARY: &str = "trus3-test-boundary";

pub fn memory_repo() -> (Arc<MemoryObjectStore>, Arc<ObjectStorageFileRepository>) {
    let store = Arc::new(MemoryObjectStore::new());
    let repo = Arc::new(ObjectStorageFileRepository::new(store.clone(), "test"));
    (store, repo)
}

pub async fn fs_repo() -> (TempDir, Arc<ObjectStorageFileRepository>) {
    let temp = TempDir::new().expect("tempdir");
    let store = FsObjectStore::new(temp.path().join("storage"))
        .await
        .expect("fs store");
    let repo = Arc::new(ObjectStorageFileRepository::new(Arc::new(store), "test"));
    (temp, repo)
}

pub fn test_config() -> Config {
    Config {
        storage_backend: StorageBackend::Memory,
        ..Config::default()
    }
}

pub fn test_app(cfg: Config) -> (Router, Arc<MemoryObjectStore>) {
    let (store, repo) = memory_repo();
    let file_repo: Arc<dyn FileRepository> = repo;
    let ctx = AppContext::new(cfg, AppServices::new(file_repo, None));
    (trus3_api::presentation::http::build_router(ctx), store)
}

pub enum Part<'a> {
    Text {
        name: &'a str,
        value: &'a str,
    },
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: Option<&'a str>,
        data: &'a [u8],
    },
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n"
                    )
                    .as_bytes(),
                );
                if let Some(ct) = content_type {
                    body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
                }
                body.extend_from_slice(b"\r\n");
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
