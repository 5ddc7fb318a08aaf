//! Anchor API endpoints
//!
//! Create, read, edit and delete anchors, import exported sets, and restore
//! anchors against freshly rendered page text.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::anchors::{
    import_batch, parse_import_request, render_page_html, restore, restore_page, AnnotationType,
    CapturedSelection, ImportReport, MatchResult, PageRestoration, PayloadUpdate, Rect,
    TextAnchor,
};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the anchors router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_anchor))
        .route("/import", post(import_anchors))
        .route(
            "/:id",
            get(get_anchor).patch(update_anchor).delete(delete_anchor),
        )
        .route("/:id/restore", post(restore_anchor))
        .route("/document/:document_id", get(list_document_anchors))
        .route("/document/:document_id/page/:page", get(list_page_anchors))
        .route(
            "/document/:document_id/page/:page/restore",
            post(restore_page_anchors),
        )
}

/// Request body for creating an anchor from a captured selection
#[derive(Debug, Deserialize)]
pub struct CreateAnchorRequest {
    #[serde(rename = "documentId")]
    pub document_id: String,
    #[serde(rename = "pageNumber")]
    pub page_number: u32,
    #[serde(rename = "selectedText")]
    pub selected_text: String,
    #[serde(rename = "startOffset", default)]
    pub start_offset: usize,
    #[serde(rename = "endOffset", default)]
    pub end_offset: usize,
    #[serde(rename = "boundingRect", default)]
    pub bounding_rect: Rect,
    #[serde(rename = "annotationType")]
    pub annotation_type: String,
    pub note: Option<String>,
    pub color: Option<String>,
}

/// Rendered text of one page
#[derive(Debug, Deserialize)]
pub struct RestoreRequest {
    pub nodes: Vec<String>,
    /// Also return highlighted HTML markup
    #[serde(default)]
    pub render: bool,
}

#[derive(Debug, Serialize)]
pub struct AnchorResponse {
    pub anchor: TextAnchor,
}

#[derive(Debug, Serialize)]
pub struct AnchorsListResponse {
    pub anchors: Vec<TextAnchor>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub data: ImportReport,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PageRestoreResponse {
    #[serde(flatten)]
    pub restoration: PageRestoration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// Create an anchor from a captured selection
async fn create_anchor(
    State(state): State<AppState>,
    Json(req): Json<CreateAnchorRequest>,
) -> Result<(StatusCode, Json<AnchorResponse>)> {
    let text = req.selected_text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("selectedText must not be empty".to_string()));
    }
    if req.document_id.trim().is_empty() {
        return Err(AppError::BadRequest("documentId must not be empty".to_string()));
    }
    if req.page_number == 0 {
        return Err(AppError::BadRequest("pageNumber must be positive".to_string()));
    }
    if req.annotation_type.trim().is_empty() {
        return Err(AppError::BadRequest("annotationType must not be empty".to_string()));
    }

    let captured = CapturedSelection {
        text: text.to_string(),
        page_number: req.page_number,
        start_offset: req.start_offset,
        end_offset: req.end_offset,
        bounding_rect: req.bounding_rect,
    };
    let mut anchor = TextAnchor::from_capture(
        &req.document_id,
        AnnotationType::new(req.annotation_type),
        captured,
    );
    anchor.payload.note = req.note;
    anchor.payload.color = req.color;

    state.store().save(&anchor).await?;
    tracing::info!(anchor_id = %anchor.id, document_id = %anchor.document_id, "Anchor created");

    Ok((StatusCode::CREATED, Json(AnchorResponse { anchor })))
}

async fn fetch(state: &AppState, id: &str) -> Result<TextAnchor> {
    state
        .store()
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Anchor not found: {}", id)))
}

/// Get a single anchor
async fn get_anchor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AnchorResponse>> {
    let anchor = fetch(&state, &id).await?;
    Ok(Json(AnchorResponse { anchor }))
}

/// Edit an anchor's note or color
async fn update_anchor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<PayloadUpdate>,
) -> Result<Json<AnchorResponse>> {
    let mut anchor = fetch(&state, &id).await?;
    anchor.apply_update(update);
    state.store().save(&anchor).await?;
    Ok(Json(AnchorResponse { anchor }))
}

/// Delete an anchor
async fn delete_anchor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if state.store().delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Anchor not found: {}", id)))
    }
}

/// List anchors of a document
async fn list_document_anchors(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<AnchorsListResponse>> {
    let anchors = state.store().list_by_document(&document_id).await?;
    let total = anchors.len();
    Ok(Json(AnchorsListResponse { anchors, total }))
}

/// List anchors captured on one page
async fn list_page_anchors(
    State(state): State<AppState>,
    Path((document_id, page)): Path<(String, u32)>,
) -> Result<Json<AnchorsListResponse>> {
    let anchors = state.store().list_for_page(&document_id, page).await?;
    let total = anchors.len();
    Ok(Json(AnchorsListResponse { anchors, total }))
}

/// Import an exported anchor set into one document
async fn import_anchors(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<ImportResponse>)> {
    let (document_id, records) =
        parse_import_request(body).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let report = import_batch(state.store(), &document_id, records).await;
    let success = report.success();

    let (status, message) = if success {
        (
            StatusCode::OK,
            format!("Imported {} annotations", report.success_count),
        )
    } else {
        (
            StatusCode::MULTI_STATUS,
            format!(
                "Imported {} of {} annotations, {} failed",
                report.success_count, report.total_annotations, report.error_count
            ),
        )
    };

    Ok((
        status,
        Json(ImportResponse {
            success,
            data: report,
            message,
        }),
    ))
}

/// Restore one anchor against the supplied page text
async fn restore_anchor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RestoreRequest>,
) -> Result<Json<MatchResult>> {
    let anchor = fetch(&state, &id).await?;
    Ok(Json(restore(&anchor, &req.nodes)))
}

/// Restore every anchor of a page and optionally render highlight markup
async fn restore_page_anchors(
    State(state): State<AppState>,
    Path((document_id, page)): Path<(String, u32)>,
    Json(req): Json<RestoreRequest>,
) -> Result<Json<PageRestoreResponse>> {
    let anchors = state.store().list_for_page(&document_id, page).await?;
    let restoration = restore_page(&anchors, &req.nodes);

    let html = req
        .render
        .then(|| render_page_html(&req.nodes, &restoration, state.highlight()));

    Ok(Json(PageRestoreResponse { restoration, html }))
}
