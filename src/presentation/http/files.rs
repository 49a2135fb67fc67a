use axum::{
    Json, Router,
    extract::{Multipart, Path as AxumPath, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::application::use_cases::files::create_file::CreateFile;
use crate::application::use_cases::files::delete_file::DeleteFile;
use crate::application::use_cases::files::get_file::GetFile;
use crate::application::use_cases::files::get_file_content::GetFileContent;
use crate::application::use_cases::files::list_files::ListFiles;
use crate::application::use_cases::files::update_file::UpdateFile;
use crate::bootstrap::app_context::AppContext;
use crate::domain::files::content_type::DEFAULT_CONTENT_TYPE;
use crate::domain::files::file::{
    CreateFileRequest, DEFAULT_LIST_LIMIT, File, FileQuery, UpdateFileRequest,
};
use crate::presentation::http::error::ApiError;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileResponse {
    pub id: String,
    pub name: String,
    pub path: String,
    pub size: i64,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<File> for FileResponse {
    fn from(f: File) -> Self {
        Self {
            id: f.id,
            name: f.name,
            path: f.path,
            size: f.size,
            content_type: f.content_type,
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileListResponse {
    pub files: Vec<FileResponse>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadFileMultipart {
    /// File to upload; its filename becomes the file id
    #[schema(value_type = String, format = Binary)]
    file: String,
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UpdateFileMultipart {
    /// New name; renames the file when it differs from the id
    name: Option<String>,
    /// Replacement content
    #[schema(value_type = Option<String>, format = Binary)]
    file: Option<String>,
}

// limit/offset stay strings so bad numbers get a JSON 400 instead of the extractor rejection
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFilesQuery {
    /// Sub-path under the storage folder
    pub prefix: Option<String>,
    /// Page size (default 100, capped at 1000)
    #[param(value_type = Option<i64>)]
    pub limit: Option<String>,
    /// Number of matches to skip
    #[param(value_type = Option<i64>)]
    pub offset: Option<String>,
}

fn parse_number(raw: Option<&str>, default: i64, field: &str) -> Result<i64, ApiError> {
    match raw {
        None => Ok(default),
        Some(s) => s
            .trim()
            .parse()
            .map_err(|_| ApiError::bad_request(format!("Invalid {field} parameter"))),
    }
}

impl ListFilesQuery {
    pub fn into_file_query(self) -> Result<FileQuery, ApiError> {
        Ok(FileQuery {
            limit: parse_number(self.limit.as_deref(), DEFAULT_LIST_LIMIT, "limit")?,
            offset: parse_number(self.offset.as_deref(), 0, "offset")?,
            prefix: self.prefix,
        })
    }
}

struct FilePart {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct FileForm {
    name: Option<String>,
    file: Option<FilePart>,
}

async fn read_form(multipart: &mut Multipart, max_bytes: usize) -> Result<FileForm, ApiError> {
    let mut form = FileForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(ApiError::from_multipart)?
    {
        let field_name = field.name().map(|s| s.to_string());
        match field_name.as_deref() {
            Some("name") if form.name.is_none() => {
                form.name = Some(field.text().await.map_err(ApiError::from_multipart)?);
            }
            Some("file") if form.file.is_none() => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(ApiError::from_multipart)?;
                // Enforce configured max upload size (additional safety besides DefaultBodyLimit)
                if data.len() > max_bytes {
                    return Err(ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "File too large"));
                }
                form.file = Some(FilePart {
                    file_name,
                    content_type,
                    bytes: data.to_vec(),
                });
            }
            _ => { /* ignore additional fields */ }
        }
    }
    Ok(form)
}

fn content_disposition(name: &str) -> HeaderValue {
    let base = name.rsplit('/').next().unwrap_or(name);
    let plain = base
        .chars()
        .all(|c| (c.is_ascii_graphic() && c != '"') || c == ' ');
    let value = if plain {
        format!("attachment; filename=\"{base}\"")
    } else {
        format!("attachment; filename*=UTF-8''{}", urlencoding::encode(base))
    };
    HeaderValue::from_str(&value).unwrap_or(HeaderValue::from_static("attachment"))
}

/// POST /api/v1/files (multipart/form-data)
#[utoipa::path(
    post,
    path = "/api/v1/files",
    tag = "Files",
    request_body(
        content = UploadFileMultipart,
        content_type = "multipart/form-data",
    ),
    responses(
        (status = 201, description = "File created", body = FileResponse),
        (status = 400, description = "Missing file or invalid name", body = crate::presentation::http::error::ErrorResponse),
        (status = 409, description = "File already exists", body = crate::presentation::http::error::ErrorResponse),
        (status = 413, description = "Upload too large", body = crate::presentation::http::error::ErrorResponse)
    )
)]
pub async fn upload_file(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileResponse>), ApiError> {
    let form = read_form(&mut multipart, ctx.cfg.upload_max_bytes).await?;
    let part = form
        .file
        .ok_or_else(|| ApiError::bad_request("No file provided"))?;

    let repo = ctx.file_repo();
    let uc = CreateFile {
        repo: repo.as_ref(),
    };
    let file = uc
        .execute(CreateFileRequest {
            name: part.file_name.unwrap_or_default(),
            content: part.bytes,
            content_type: part.content_type,
        })
        .await
        .map_err(|err| ApiError::from_file_error(err, "Failed to create file"))?;
    Ok((StatusCode::CREATED, Json(file.into())))
}

/// GET /api/v1/files
#[utoipa::path(
    get,
    path = "/api/v1/files",
    tag = "Files",
    params(ListFilesQuery),
    responses(
        (status = 200, body = FileListResponse),
        (status = 400, description = "Unparsable limit or offset", body = crate::presentation::http::error::ErrorResponse)
    )
)]
pub async fn list_files(
    State(ctx): State<AppContext>,
    Query(q): Query<ListFilesQuery>,
) -> Result<Json<FileListResponse>, ApiError> {
    let query = q.into_file_query()?;
    let repo = ctx.file_repo();
    let uc = ListFiles {
        repo: repo.as_ref(),
    };
    let files = uc
        .execute(query)
        .await
        .map_err(|err| ApiError::from_file_error(err, "Failed to list files"))?;
    let files: Vec<FileResponse> = files.into_iter().map(Into::into).collect();
    Ok(Json(FileListResponse {
        count: files.len(),
        files,
    }))
}

/// GET /api/v1/files/{id}
#[utoipa::path(
    get,
    path = "/api/v1/files/{id}",
    tag = "Files",
    params(("id" = String, Path, description = "File id (percent-encode nested paths)")),
    responses(
        (status = 200, body = FileResponse),
        (status = 404, description = "File not found", body = crate::presentation::http::error::ErrorResponse)
    )
)]
pub async fn get_file(
    State(ctx): State<AppContext>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<FileResponse>, ApiError> {
    let repo = ctx.file_repo();
    let uc = GetFile {
        repo: repo.as_ref(),
    };
    let file = uc
        .execute(&id)
        .await
        .map_err(|err| ApiError::from_file_error(err, "Failed to get file"))?;
    Ok(Json(file.into()))
}

/// GET /api/v1/files/{id}/download -> bytes
#[utoipa::path(
    get,
    path = "/api/v1/files/{id}/download",
    tag = "Files",
    params(("id" = String, Path, description = "File id (percent-encode nested paths)")),
    responses(
        (status = 200, description = "OK", body = Vec<u8>, content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = crate::presentation::http::error::ErrorResponse)
    )
)]
pub async fn download_file(
    State(ctx): State<AppContext>,
    AxumPath(id): AxumPath<String>,
) -> Result<Response, ApiError> {
    let repo = ctx.file_repo();
    let uc = GetFileContent {
        repo: repo.as_ref(),
    };
    let data = uc
        .execute(&id)
        .await
        .map_err(|err| ApiError::from_file_error(err, "Failed to get file content"))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&data.file.content_type)
            .unwrap_or(HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
    );
    headers.insert(header::CONTENT_DISPOSITION, content_disposition(&data.file.name));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(data.content.len()));
    headers.insert(
        header::HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    Ok((headers, data.content).into_response())
}

/// PUT /api/v1/files/{id} (multipart/form-data)
#[utoipa::path(
    put,
    path = "/api/v1/files/{id}",
    tag = "Files",
    params(("id" = String, Path, description = "File id (percent-encode nested paths)")),
    request_body(
        content = UpdateFileMultipart,
        content_type = "multipart/form-data",
    ),
    responses(
        (status = 200, body = FileResponse),
        (status = 400, description = "Invalid name", body = crate::presentation::http::error::ErrorResponse),
        (status = 404, description = "File not found", body = crate::presentation::http::error::ErrorResponse),
        (status = 409, description = "Rename target exists", body = crate::presentation::http::error::ErrorResponse)
    )
)]
pub async fn update_file(
    State(ctx): State<AppContext>,
    AxumPath(id): AxumPath<String>,
    mut multipart: Multipart,
) -> Result<Json<FileResponse>, ApiError> {
    let form = read_form(&mut multipart, ctx.cfg.upload_max_bytes).await?;
    let mut req = UpdateFileRequest {
        name: form.name,
        ..UpdateFileRequest::default()
    };
    if let Some(part) = form.file {
        req.content = Some(part.bytes);
        req.content_type = part.content_type;
    }

    let repo = ctx.file_repo();
    let uc = UpdateFile {
        repo: repo.as_ref(),
    };
    let file = uc
        .execute(&id, req)
        .await
        .map_err(|err| ApiError::from_file_error(err, "Failed to update file"))?;
    Ok(Json(file.into()))
}

/// DELETE /api/v1/files/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/files/{id}",
    tag = "Files",
    params(("id" = String, Path, description = "File id (percent-encode nested paths)")),
    responses(
        (status = 200, body = MessageResponse),
        (status = 404, description = "File not found", body = crate::presentation::http::error::ErrorResponse)
    )
)]
pub async fn delete_file(
    State(ctx): State<AppContext>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let repo = ctx.file_repo();
    let uc = DeleteFile {
        repo: repo.as_ref(),
    };
    uc.execute(&id)
        .await
        .map_err(|err| ApiError::from_file_error(err, "Failed to delete file"))?;
    Ok(Json(MessageResponse {
        message: "File deleted successfully".into(),
    }))
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/files", get(list_files).post(upload_file))
        .route(
            "/files/:id",
            get(get_file).put(update_file).delete(delete_file),
        )
        .route("/files/:id/download", get(download_file))
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_responses_reference_shared_schema() {
        use utoipa::Path;

        let item = __path_upload_file::path_item(None);
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("#/components/schemas/ErrorResponse"));
        assert!(json.contains("\"409\""));
    }

    #[test]
    fn list_query_defaults_and_rejects_garbage() {
        let q = ListFilesQuery::default().into_file_query().unwrap();
        assert_eq!(q.limit, 100);
        assert_eq!(q.offset, 0);

        let bad = ListFilesQuery {
            limit: Some("ten".into()),
            ..ListFilesQuery::default()
        };
        let err = bad.into_file_query().unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid limit parameter");
    }

    #[test]
    fn disposition_uses_base_name_and_encodes_non_ascii() {
        assert_eq!(
            content_disposition("docs/report.txt"),
            "attachment; filename=\"report.txt\""
        );
        assert_eq!(
            content_disposition("résumé.pdf"),
            "attachment; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"
        );
    }
}
