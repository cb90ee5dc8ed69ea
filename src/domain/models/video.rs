// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::Platform;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 视频下载状态枚举
///
/// 终态为 `Ready` 与 `Error`，到达终态后不再有工作器驱动的转换。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    /// 已发现，尚未调度下载
    #[default]
    Found,
    /// 下载作业已入队或执行中
    Downloading,
    /// 下载完成，`download_path` 已写入
    Ready,
    /// 下载失败，`error` 已写入
    Error,
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VideoStatus::Found => write!(f, "found"),
            VideoStatus::Downloading => write!(f, "downloading"),
            VideoStatus::Ready => write!(f, "ready"),
            VideoStatus::Error => write!(f, "error"),
        }
    }
}

/// 视频记录实体
///
/// 系统为一个外部视频保留的记账条目，以 (platform,
/// platform_video_id) 为全局唯一键。`task_id` 记录首个发现该
/// 视频的任务，仅在插入时写入一次。用户删除只打软删除标记，
/// 不做物理删除。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    /// 来源平台
    pub platform: Platform,
    /// 平台侧视频ID
    pub platform_video_id: String,
    /// 首个发现该视频的任务ID（插入时一次性写入）
    pub task_id: Uuid,
    pub title: Option<String>,
    pub author: Option<String>,
    pub views: Option<u64>,
    pub likes: Option<u64>,
    pub duration_sec: Option<u32>,
    pub preview_url: Option<String>,
    pub source_url: Option<String>,
    /// 下载产物路径，仅在 status=Ready 时写入
    pub download_path: Option<String>,
    pub status: VideoStatus,
    /// 失败信息，仅在 status=Error 时写入
    pub error: Option<String>,
    /// 软删除标记
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 视频记录 upsert 字段集
///
/// 搜索工作器在发现视频时提交的可合并字段；键字段与
/// `task_id` 不在其中，由 upsert 原语单独处理。
#[derive(Debug, Clone, Default)]
pub struct VideoUpsert {
    pub title: Option<String>,
    pub author: Option<String>,
    pub views: Option<u64>,
    pub likes: Option<u64>,
    pub duration_sec: Option<u32>,
    pub preview_url: Option<String>,
    pub source_url: Option<String>,
    pub status: VideoStatus,
}
