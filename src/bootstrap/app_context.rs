use std::sync::Arc;

use crate::application::ports::file_repository::FileRepository;
use crate::bootstrap::config::Config;
use crate::infrastructure::db::PgPool;

#[derive(Clone)]
pub struct AppContext {
    pub cfg: Config,
    services: Arc<AppServices>,
}

/// Handles built once in `main` and shared by every request.
#[derive(Clone)]
pub struct AppServices {
    file_repo: Arc<dyn FileRepository>,
    db_pool: Option<PgPool>,
}

impl AppServices {
    pub fn new(file_repo: Arc<dyn FileRepository>, db_pool: Option<PgPool>) -> Self {
        Self { file_repo, db_pool }
    }
}

impl AppContext {
    pub fn new(cfg: Config, services: AppServices) -> Self {
        Self {
            cfg,
            services: Arc::new(services),
        }
    }

    pub fn file_repo(&self) -> Arc<dyn FileRepository> {
        self.services.file_repo.clone()
    }

    pub fn db_pool(&self) -> Option<PgPool> {
        self.services.db_pool.clone()
    }
}
