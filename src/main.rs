use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use tracing::{error, info};

use trus3_api::application::ports::file_repository::FileRepository;
use trus3_api::application::ports::object_store::ObjectStore;
use trus3_api::bootstrap::app_context::{AppContext, AppServices};
use trus3_api::bootstrap::config::{Config, StorageBackend};
use trus3_api::infrastructure::storage::ObjectStorageFileRepository;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
        paths(
            trus3_api::presentation::http::files::upload_file,
            trus3_api::presentation::http::files::list_files,
            trus3_api::presentation::http::files::get_file,
            trus3_api::presentation::http::files::download_file,
            trus3_api::presentation::http::files::update_file,
            trus3_api::presentation::http::files::delete_file,
            trus3_api::presentation::http::health::health,
        ),
        components(schemas(
            trus3_api::presentation::http::files::FileResponse,
            trus3_api::presentation::http::files::FileListResponse,
            trus3_api::presentation::http::files::MessageResponse,
            trus3_api::presentation::http::files::UploadFileMultipart,
            trus3_api::presentation::http::files::UpdateFileMultipart,
            trus3_api::presentation::http::error::ErrorResponse,
            trus3_api::presentation::http::health::HealthResp,
        )),
        tags(
            (name = "Files", description = "File storage"),
            (name = "Health", description = "System health checks")
        )
    )]
struct ApiDoc;

async fn build_object_store(cfg: &Config) -> anyhow::Result<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match cfg.storage_backend {
        StorageBackend::S3 => {
            Arc::new(trus3_api::infrastructure::storage::s3::S3ObjectStore::new(cfg).await?)
        }
        StorageBackend::Filesystem => Arc::new(
            trus3_api::infrastructure::storage::fs::FsObjectStore::new(&cfg.storage_root).await?,
        ),
        StorageBackend::Memory => {
            tracing::warn!("memory_storage_backend_contents_are_lost_on_exit");
            Arc::new(trus3_api::infrastructure::storage::memory::MemoryObjectStore::new())
        }
    };
    Ok(store)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = ?e, "ctrl_c_handler_failed");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = ?e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown_signal_received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "trus3_api=debug,tower_http=info,axum=info".into()),
        )
        .init();

    let cfg = Config::from_env()?;
    info!(
        backend = ?cfg.storage_backend,
        bucket = %cfg.storage_bucket,
        folder = %cfg.storage_folder,
        production = cfg.is_production,
        "Starting TRu-S3 file API"
    );

    // Database (optional)
    let pool = match cfg.database_url.as_deref() {
        Some(url) => Some(
            trus3_api::infrastructure::db::connect_pool(
                url,
                cfg.db_max_connections,
                cfg.db_connect_retries,
            )
            .await?,
        ),
        None => {
            info!("database_disabled_no_url");
            None
        }
    };

    let store = build_object_store(&cfg).await?;
    let file_repo: Arc<dyn FileRepository> =
        Arc::new(ObjectStorageFileRepository::new(store, &cfg.storage_folder));

    let services = AppServices::new(file_repo, pool.clone());
    let ctx = AppContext::new(cfg.clone(), services);

    let app = trus3_api::presentation::http::build_router(ctx)
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()));

    let api_addr = SocketAddr::from(([0, 0, 0, 0], cfg.api_port));
    info!(%api_addr, "HTTP API listening");
    let listener = tokio::net::TcpListener::bind(api_addr).await?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(pool) = pool {
        pool.close().await;
        info!("database_pool_closed");
    }

    match served {
        Ok(()) => {
            info!("server_stopped");
            Ok(())
        }
        Err(e) => {
            error!(?e, "API server failed");
            Err(e.into())
        }
    }
}
