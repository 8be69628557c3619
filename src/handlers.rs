use crate::{
    AppState,
    auth::AdminSession,
    error::{AppError, AppResult, ErrorBody},
    models::{
        Document, Gallery, LoginRequest, LoginResponse, LogoutResponse, Resource, SessionInfo,
        UploadResponse,
    },
    repository::{RepositoryState, StoreError},
    session::SessionGuard,
};
use axum::{
    Json,
    body::Bytes,
    extract::{
        Multipart, Path, State,
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use uuid::Uuid;

// --- Resource Handlers ---
//
// One generic set of CRUD handlers serves every `Resource`. Which of them require a
// session is decided by the router (see `routes`), not here.

fn encode_body<R: Resource>(body: &R) -> AppResult<Value> {
    serde_json::to_value(body)
        .map_err(|e| AppError::Store(StoreError::Corrupt(format!("{}: {e}", R::COLLECTION))))
}

/// list_documents
///
/// Lists every document of the resource's collection, newest first.
pub async fn list_documents<R: Resource>(
    State(repo): State<RepositoryState>,
) -> AppResult<Json<Vec<Document<R>>>> {
    let docs = repo
        .list(R::COLLECTION)
        .await?
        .into_iter()
        .map(Document::from_raw)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(docs))
}

/// get_document
///
/// Fetches a single document by id; `NotFound` if it does not exist.
pub async fn get_document<R: Resource>(
    State(repo): State<RepositoryState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<Document<R>>> {
    let Path(id) = id?;
    let raw = repo.get(R::COLLECTION, id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(Document::from_raw(raw)?))
}

/// create_document
///
/// Validates the payload against the resource schema and stores it as a new document.
pub async fn create_document<R: Resource>(
    State(repo): State<RepositoryState>,
    payload: Result<Json<R>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Document<R>>)> {
    let Json(body) = payload?;
    body.validate()?;

    let raw = repo.insert(R::COLLECTION, encode_body(&body)?).await?;
    tracing::info!(collection = R::COLLECTION, id = %raw.id, "document created");

    Ok((StatusCode::CREATED, Json(Document::from_raw(raw)?)))
}

/// update_document
///
/// Replaces the body of an existing document with a validated payload.
pub async fn update_document<R: Resource>(
    State(repo): State<RepositoryState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<R>, JsonRejection>,
) -> AppResult<Json<Document<R>>> {
    let Path(id) = id?;
    let Json(body) = payload?;
    body.validate()?;

    let raw = repo
        .replace(R::COLLECTION, id, encode_body(&body)?)
        .await?
        .ok_or(AppError::NotFound)?;
    tracing::info!(collection = R::COLLECTION, %id, "document updated");

    Ok(Json(Document::from_raw(raw)?))
}

/// delete_document
///
/// Removes a document; `204` on success, `NotFound` if it was already gone.
pub async fn delete_document<R: Resource>(
    State(repo): State<RepositoryState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(id) = id?;
    if repo.delete(R::COLLECTION, id).await? {
        tracing::info!(collection = R::COLLECTION, %id, "document deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

// --- Session Handlers ---

/// login
///
/// [Public Route] Exchanges the admin credentials for a session cookie.
///
/// Neither the request body nor anything derived from the password is logged.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 500, description = "Signing secret or credentials not configured", body = ErrorBody)
    )
)]
pub async fn login(
    State(sessions): State<SessionGuard>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(req) = payload?;
    if req.email.trim().is_empty() {
        return Err(AppError::missing_field("email"));
    }
    if req.password.is_empty() {
        return Err(AppError::missing_field("password"));
    }

    let issued = sessions.issue(&req.email, &req.password).inspect_err(|e| {
        if matches!(e, AppError::InvalidCredentials) {
            tracing::warn!("rejected admin sign-in attempt");
        }
    })?;

    tracing::info!(admin = %issued.claims.email, "admin signed in");
    let body = LoginResponse {
        success: true,
        email: issued.claims.email,
    };
    Ok(([(header::SET_COOKIE, issued.cookie)], Json(body)).into_response())
}

/// logout
///
/// [Public Route] Clears the session cookie. Always succeeds.
#[utoipa::path(
    post,
    path = "/api/logout",
    responses((status = 200, description = "Session cookie cleared", body = LogoutResponse))
)]
pub async fn logout(State(sessions): State<SessionGuard>) -> Response {
    (
        [(header::SET_COOKIE, sessions.revoke())],
        Json(LogoutResponse { success: true }),
    )
        .into_response()
}

/// session_info
///
/// [Authenticated Route] Reports who is signed in and when the session expires.
#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Current session", body = SessionInfo),
        (status = 401, description = "No valid session", body = ErrorBody)
    )
)]
pub async fn session_info(session: AdminSession) -> Json<SessionInfo> {
    Json(SessionInfo {
        email: session.email,
        expires_at: session.expires_at,
    })
}

// --- Upload Handler ---

/// Largest accepted upload body.
pub const UPLOAD_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Raster image types accepted by the upload. SVG is excluded: it can carry script and
/// would be served as-is from the public bucket.
pub const ALLOWED_IMAGE_TYPES: [&str; 5] = [
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "image/avif",
];

struct UploadedFile {
    file_name: String,
    content_type: String,
    bytes: Bytes,
}

/// upload_image
///
/// [Authenticated Route] Accepts a multipart `file` part (plus an optional `caption`),
/// forwards the image to object storage, records it as a gallery document, and returns the
/// public URL.
///
/// The object upload and the document insert are separate steps; if the insert fails the
/// stored object is left behind.
#[utoipa::path(
    post,
    path = "/api/upload",
    responses(
        (status = 201, description = "Image stored and recorded in the gallery"),
        (status = 400, description = "Missing or non-image file", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 502, description = "Object storage rejected the upload", body = ErrorBody)
    )
)]
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let mut multipart = multipart.map_err(|e| AppError::Validation(e.body_text()))?;

    let mut file: Option<UploadedFile> = None;
    let mut caption: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") if file.is_none() => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            Some("caption") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                caption = Some(text.trim().to_string()).filter(|c| !c.is_empty());
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::missing_field("file"))?;
    if file.bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if !ALLOWED_IMAGE_TYPES.contains(&file.content_type.to_ascii_lowercase().as_str()) {
        return Err(AppError::Validation(format!(
            "Unsupported file type: {}",
            file.content_type
        )));
    }

    let object_key = format!("gallery/{}.{}", Uuid::new_v4(), file_extension(&file.file_name));
    let url = state
        .storage
        .upload_object(&object_key, file.bytes, &file.content_type)
        .await
        .map_err(AppError::Storage)?;

    let entry = Gallery {
        image_url: url.clone(),
        caption,
    };
    let raw = state
        .repo
        .insert(Gallery::COLLECTION, encode_body(&entry)?)
        .await?;
    tracing::info!(id = %raw.id, key = %object_key, "image uploaded");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url,
            document: Document::from_raw(raw)?,
        }),
    ))
}

/// Lowercased alphanumeric extension of the client's file name, `bin` if there is none.
fn file_extension(file_name: &str) -> String {
    std::path::Path::new(file_name)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(|ext| {
            ext.chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "bin".to_string())
}
