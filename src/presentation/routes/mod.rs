// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::infrastructure::repositories::{MemoryTaskRepository, MemoryVideoRepository};
use crate::presentation::handlers::{task_handler, video_handler};
use axum::{
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

/// 创建应用路由
///
/// # 返回值
///
/// 返回配置好的路由；仓库与队列注册表由调用方通过
/// Extension 注入
pub fn routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version))
        .route(
            "/v1/tasks/{platform}",
            post(task_handler::create_task::<MemoryTaskRepository>),
        )
        .route(
            "/v1/tasks/{task_id}/status",
            get(task_handler::get_task::<MemoryTaskRepository, MemoryVideoRepository>),
        )
        .route(
            "/v1/tasks/{task_id}/logs",
            get(task_handler::get_task_logs::<MemoryTaskRepository>),
        )
        .route(
            "/v1/videos/{platform}/{video_id}",
            delete(video_handler::delete_video::<MemoryVideoRepository>),
        )
        .route(
            "/v1/videos/{platform}/{video_id}/download",
            get(video_handler::download_video::<MemoryVideoRepository>),
        )
        .route(
            "/v1/videos/{platform}/{video_id}/unique",
            post(video_handler::unique_video),
        )
        .layer(TraceLayer::new_for_http())
}

/// 健康检查
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// 版本信息
async fn version() -> Json<serde_json::Value> {
    Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
}
