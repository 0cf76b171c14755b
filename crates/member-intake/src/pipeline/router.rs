use crate::error::AppError;
use crate::pipeline::domain::{UploadJobId, UploadSnapshot, UploadStatus};
use crate::pipeline::queue::UploadQueue;
use crate::pipeline::report::UploadReport;
use crate::pipeline::source::CsvRowSource;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;
use uuid::Uuid;

/// Upload submission payload. The spreadsheet travels inline as CSV text;
/// `declared_rows` lets the caller opt into a better priority tier.
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub owner: String,
    pub csv: String,
    #[serde(default)]
    pub declared_rows: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct UploadAccepted {
    pub job_id: UploadJobId,
    pub status: UploadStatus,
}

/// JSON routes over the upload queue.
pub fn upload_router(queue: Arc<UploadQueue>) -> Router {
    Router::new()
        .route("/api/v1/uploads", post(submit_upload))
        .route(
            "/api/v1/uploads/:id",
            get(upload_status).delete(cancel_upload),
        )
        .route("/api/v1/uploads/:id/report", get(upload_report))
        .with_state(queue)
}

async fn submit_upload(
    State(queue): State<Arc<UploadQueue>>,
    Json(payload): Json<UploadRequest>,
) -> Result<(StatusCode, Json<UploadAccepted>), AppError> {
    let source = CsvRowSource::new(Cursor::new(payload.csv.into_bytes()));
    let job_id = queue.submit(payload.owner, Box::new(source), payload.declared_rows);

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadAccepted {
            job_id,
            status: UploadStatus::Pending,
        }),
    ))
}

async fn upload_status(
    State(queue): State<Arc<UploadQueue>>,
    Path(id): Path<Uuid>,
) -> Result<Json<UploadSnapshot>, AppError> {
    let snapshot = queue.status(UploadJobId(id))?;
    Ok(Json(snapshot))
}

async fn cancel_upload(
    State(queue): State<Arc<UploadQueue>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let cancelled = queue.cancel(UploadJobId(id))?;
    Ok(Json(json!({ "cancelled": cancelled })))
}

async fn upload_report(
    State(queue): State<Arc<UploadQueue>>,
    Path(id): Path<Uuid>,
) -> Result<Json<UploadReport>, AppError> {
    let report = queue.report(UploadJobId(id))?;
    Ok(Json(report.as_ref().clone()))
}
