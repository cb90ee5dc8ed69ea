// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::Platform;
use crate::domain::repositories::video_repository::VideoRepository;
use crate::presentation::errors::AppError;
use axum::body::Body;
use axum::extract::{Extension, Path};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::info;

/// 下载已就绪视频的产物文件
///
/// 以附件形式流式返回磁盘上的文件。记录缺失、已软删除、
/// 尚无产物路径或文件不在磁盘上时一律返回 404。
pub async fn download_video<V: VideoRepository>(
    Extension(video_repo): Extension<Arc<V>>,
    Path((platform, video_id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let platform = Platform::from_str(&platform)
        .map_err(|_| AppError::validation(format!("unsupported platform: {platform}")))?;
    let video = video_repo
        .find(platform, &video_id)
        .await?
        .filter(|v| !v.deleted)
        .ok_or_else(AppError::not_found)?;
    let path = video.download_path.ok_or_else(AppError::not_found)?;

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::not_found());
        }
        Err(e) => return Err(e.into()),
    };

    let filename = std::path::Path::new(&path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| video_id.clone());
    info!(platform = %platform, video_id = %video_id, path = %path, "serving downloaded file");

    let response = Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from_stream(ReaderStream::new(file)))?;
    Ok(response)
}

/// 软删除视频
///
/// 只打删除标记，不移除记录也不触碰已下载的文件；历史
/// 任务的进度统计保持不变。
pub async fn delete_video<V: VideoRepository>(
    Extension(video_repo): Extension<Arc<V>>,
    Path((platform, video_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let platform = Platform::from_str(&platform)
        .map_err(|_| AppError::validation(format!("unsupported platform: {platform}")))?;
    video_repo.soft_delete(platform, &video_id).await?;
    info!(platform = %platform, video_id = %video_id, "video soft-deleted");
    Ok(Json(json!({ "ok": true })))
}

/// 去重接口占位
///
/// 逐视频的唯一性标记尚未上线
pub async fn unique_video(
    Path((_platform, _video_id)): Path<(String, String)>,
) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(json!({
            "error": {
                "code": "NOT_IMPLEMENTED",
                "message": "Uniqueness is not implemented yet",
            }
        })),
    )
}
