// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{Platform, Task, TaskLogLevel, TaskMode, TaskQuery};
use crate::domain::repositories::task_repository::TaskRepository;
use crate::domain::repositories::video_repository::VideoRepository;
use crate::domain::services::task_log;
use crate::presentation::errors::AppError;
use crate::queue::{Job, JobPayload, JobQueue, QueueRegistry, SearchJobData};
use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::Json;
use metrics::counter;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// 日志查询接口最多返回的条目数
const LOG_RESPONSE_LIMIT: usize = 100;

/// 创建任务请求体
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub mode: TaskMode,
    pub keywords: Option<String>,
    #[serde(rename = "regionName")]
    pub region_name: Option<String>,
    #[serde(rename = "regionCode")]
    pub region_code: Option<String>,
    pub count: u32,
}

fn parse_platform(raw: &str) -> Result<Platform, AppError> {
    Platform::from_str(raw)
        .map_err(|_| AppError::validation(format!("unsupported platform: {raw}")))
}

/// 创建批量获取任务
///
/// 校验请求、以 `queued` 状态落库并入队搜索作业。搜索作业
/// 不设重试：业务性失败会直接把任务置为 `error`。
pub async fn create_task<T: TaskRepository>(
    Extension(task_repo): Extension<Arc<T>>,
    Extension(registry): Extension<QueueRegistry>,
    Path(platform): Path<String>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let platform = parse_platform(&platform)?;

    if !(1..=100).contains(&request.count) {
        return Err(AppError::validation("count must be between 1 and 100"));
    }
    if request.mode == TaskMode::Search
        && request
            .keywords
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .is_empty()
    {
        return Err(AppError::validation("keywords are required for search mode"));
    }

    let task = Task::new(
        platform,
        request.mode,
        TaskQuery {
            keywords: request.keywords.clone(),
            region_name: request.region_name,
            region_code: request.region_code.clone(),
            count: request.count,
        },
    );
    let task = task_repo.create(&task).await?;

    // 搜索作业不重试：所在队列的策略即为不重试
    let job = Job::new(JobPayload::Search(SearchJobData {
        task_id: task.task_id,
        mode: task.mode,
        keywords: request.keywords,
        region_code: request.region_code,
        count: request.count,
    }));
    registry.pair(platform).search.enqueue(job).await?;

    counter!("tasks_created_total", "platform" => platform.to_string()).increment(1);
    info!(task_id = %task.task_id, platform = %platform, mode = %task.mode, "task created");
    task_log::append(
        task_repo.as_ref(),
        task.task_id,
        TaskLogLevel::Info,
        format!("Task created: {} {} on {platform}", task.mode, task.query.count),
    )
    .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "taskId": task.task_id,
            "platform": platform.to_string(),
            "status": task.status.to_string(),
        })),
    ))
}

/// 查询任务详情
///
/// 返回任务状态、进度、错误信息与该任务发现的视频列表。
pub async fn get_task<T: TaskRepository, V: VideoRepository>(
    Extension(task_repo): Extension<Arc<T>>,
    Extension(video_repo): Extension<Arc<V>>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let task = task_repo
        .find_by_id(task_id)
        .await?
        .ok_or_else(AppError::not_found)?;
    let videos = video_repo.list_by_task(task_id, false).await?;

    Ok(Json(json!({
        "taskId": task.task_id,
        "platform": task.platform.to_string(),
        "mode": task.mode.to_string(),
        "status": task.status.to_string(),
        "progress": task.progress,
        "errorMessages": task.error_messages,
        "query": task.query,
        "createdAt": task.created_at,
        "updatedAt": task.updated_at,
        "videos": videos,
    })))
}

/// 查询任务日志
///
/// 返回最近的日志条目，最多 100 条。
pub async fn get_task_logs<T: TaskRepository>(
    Extension(task_repo): Extension<Arc<T>>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let task = task_repo
        .find_by_id(task_id)
        .await?
        .ok_or_else(AppError::not_found)?;

    let start = task.logs.len().saturating_sub(LOG_RESPONSE_LIMIT);
    Ok(Json(json!({
        "taskId": task.task_id,
        "logs": &task.logs[start..],
    })))
}
