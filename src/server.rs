//! HTTP API surface.
//!
//! Thin dispatch onto the store, the sync manager and the processing
//! collaborator; no logic of its own beyond translating errors into
//! status codes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    serve, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::db::{Database, NewPhoto, Photo, PhotoFilter, StoreError, Tag};
use crate::processing::{keyword_search, ImageProcessor, SearchEntry};
use crate::sync::{SyncManager, SyncService, TaskId, TaskState, UnknownService};

// App state
pub struct AppState {
    pub db: Database,
    pub sync: Mutex<SyncManager>,
    pub processor: Box<dyn ImageProcessor>,
    pub max_tags: usize,
}

// Request structs
#[derive(Debug, Default, Deserialize)]
pub struct PhotoQuery {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    /// Comma-separated tag names; a photo must carry all of them.
    pub tags: Option<String>,
    pub location: Option<String>,
    pub camera_model: Option<String>,
}

impl PhotoQuery {
    fn into_filter(self) -> PhotoFilter {
        let tags = self
            .tags
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        PhotoFilter {
            date_from: self.date_from,
            date_to: self.date_to,
            tags,
            location: self.location,
            camera_model: self.camera_model,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TagUpdate {
    #[serde(default)]
    pub add_tags: Option<Vec<String>>,
    #[serde(default)]
    pub remove_tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CloudSyncRequest {
    pub service: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

// Response structs
#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    pub task_id: u64,
    pub service: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error type every handler funnels into; renders as a JSON body with
/// the matching status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self {
                status: StatusCode::NOT_FOUND,
                message: err.to_string(),
            },
            StoreError::AlreadyExists { .. } => Self {
                status: StatusCode::CONFLICT,
                message: err.to_string(),
            },
            StoreError::Storage(_) | StoreError::Io(_) => {
                error!("store failure: {err}");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "internal storage error".to_string(),
                }
            }
        }
    }
}

impl From<UnknownService> for ApiError {
    fn from(err: UnknownService) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: err.to_string(),
        }
    }
}

// Handlers

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Welcome to the photonav API" }))
}

async fn list_photos(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PhotoQuery>,
) -> Result<Json<Vec<Photo>>, ApiError> {
    let photos = state.db.list_photos(&query.into_filter())?;
    Ok(Json(photos))
}

async fn create_photo(
    State(state): State<Arc<AppState>>,
    Json(new_photo): Json<NewPhoto>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let id = state.db.insert_photo(&new_photo)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "message": format!("photo {id} created") })),
    ))
}

async fn get_photo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Photo>, ApiError> {
    let photo = state
        .db
        .get_photo(id)?
        .ok_or_else(|| ApiError::not_found(format!("photo {id} not found")))?;
    Ok(Json(photo))
}

async fn update_photo_tags(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(update): Json<TagUpdate>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let add = update.add_tags.unwrap_or_default();
    let remove = update.remove_tags.unwrap_or_default();
    state.db.update_photo_tags(id, &add, &remove)?;
    Ok(Json(json!({ "message": format!("tags for photo {id} updated") })))
}

async fn delete_photo_tags(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(tags_to_delete): Json<Vec<String>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.db.update_photo_tags(id, &[], &tags_to_delete)?;
    Ok(Json(json!({ "message": format!("tags removed from photo {id}") })))
}

async fn list_tags(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.db.list_tags()?))
}

async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.db.delete_tag(id)?;
    Ok(Json(json!({ "message": format!("tag {id} deleted") })))
}

async fn trigger_sync(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CloudSyncRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    // Reject unknown services before anything is scheduled.
    let service: SyncService = request.service.parse()?;
    let task_id = state.sync_manager().start(service);
    info!("scheduled {} sync as task {}", service.display_name(), task_id.0);
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": format!("{} sync started in the background", service.display_name()),
            "task_id": task_id.0,
        })),
    ))
}

async fn sync_status(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<u64>,
) -> Result<Json<SyncStatusResponse>, ApiError> {
    let (service, task_state) = state
        .sync_manager()
        .status(TaskId(task_id))
        .ok_or_else(|| ApiError::not_found(format!("sync task {task_id} not found")))?;

    let (state_name, task_error) = match task_state {
        TaskState::Running => ("running", None),
        TaskState::Completed => ("completed", None),
        TaskState::Failed(e) => ("failed", Some(e)),
    };
    Ok(Json(SyncStatusResponse {
        task_id,
        service: service.display_name().to_string(),
        state: state_name.to_string(),
        error: task_error,
    }))
}

async fn process_photo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let photo = state
        .db
        .get_photo(id)?
        .ok_or_else(|| ApiError::not_found(format!("photo {id} not found")))?;

    let image_path = std::path::Path::new(&photo.path);
    let tags = state.processor.auto_tag(image_path, state.max_tags);
    let extracted_text = state.processor.extract_text(image_path);
    state.db.attach_processing(id, &tags, &extracted_text)?;

    Ok(Json(json!({
        "message": format!("photo {id} processed with {} backend", state.processor.backend_name()),
        "tags_added": tags,
        "text_extracted": !extracted_text.is_empty(),
    })))
}

async fn search_photos(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let entries: Vec<SearchEntry> = state
        .db
        .list_photos(&PhotoFilter::default())?
        .into_iter()
        .map(|photo| SearchEntry {
            path: photo.path,
            tags: photo.tags,
            extracted_text: photo.extracted_text.unwrap_or_default(),
        })
        .collect();
    Ok(Json(keyword_search(&query.q, &entries)))
}

impl AppState {
    fn sync_manager(&self) -> std::sync::MutexGuard<'_, SyncManager> {
        self.sync.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/photos", get(list_photos).post(create_photo))
        .route("/photos/search", get(search_photos))
        .route("/photos/:id", get(get_photo))
        .route("/photos/:id/tags", put(update_photo_tags).delete(delete_photo_tags))
        .route("/photos/:id/process", post(process_photo))
        .route("/tags", get(list_tags))
        .route("/tags/:id", delete(delete_tag))
        .route("/cloud/sync", post(trigger_sync))
        .route("/cloud/sync/:task_id", get(sync_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct Server {
    state: Arc<AppState>,
    addr: SocketAddr,
}

impl Server {
    pub fn new(state: Arc<AppState>, addr: SocketAddr) -> Self {
        Server { state, addr }
    }

    pub async fn start(self) -> Result<(), std::io::Error> {
        let app = router(self.state);

        info!("Starting server on {}", self.addr);
        serve(
            TcpListener::bind(self.addr).await?,
            app.into_make_service(),
        )
        .await
    }
}
