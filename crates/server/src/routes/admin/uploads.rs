//! Image uploads for product photos, category images and banners.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};

use crate::error::{AppError, Result};
use crate::response::ApiResponse;
use crate::services::StoredObject;
use crate::services::storage::{check_image, new_object_key};
use crate::state::AppState;

/// `POST /api/admin/uploads` - multipart with a `file` part and an optional
/// `folder` text part (sent before the file).
pub async fn upload(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<StoredObject>> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let mut folder: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "folder" => folder = Some(field.text().await?),
            "file" => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let content = field.bytes().await?;
                let extension = check_image(&content_type, content.len())?;
                let key = new_object_key(folder.as_deref(), extension);

                let stored = state.storage().put(&key, &content, &content_type).await?;
                tracing::info!(key = %stored.key, size = stored.size, "File uploaded");
                return Ok(ApiResponse::created(stored).with_message("File uploaded"));
            }
            _ => {}
        }
    }

    Err(AppError::BadRequest("No file provided".to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request, http::StatusCode, routing::post};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::state::test_state;

    async fn post_upload(content_type: &str, body: &'static str) -> (StatusCode, serde_json::Value) {
        let router: Router = Router::new()
            .route("/uploads", post(upload))
            .with_state(test_state("test"));
        let response = router
            .oneshot(
                Request::post("/uploads")
                    .header("content-type", content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_non_multipart_body_uses_envelope() {
        let (status, body) = post_upload("application/json", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_missing_file_part() {
        let (status, body) = post_upload(
            "multipart/form-data; boundary=b",
            "--b\r\nContent-Disposition: form-data; name=\"folder\"\r\n\r\nbanners\r\n--b--\r\n",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No file provided");
    }

    #[tokio::test]
    async fn test_rejects_non_images_before_storing() {
        let (status, body) = post_upload(
            "multipart/form-data; boundary=b",
            "--b\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
             Content-Type: text/plain\r\n\r\nhello\r\n--b--\r\n",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }
}
