// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{Platform, TaskMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 搜索作业载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchJobData {
    pub task_id: Uuid,
    pub mode: TaskMode,
    pub keywords: Option<String>,
    pub region_code: Option<String>,
    pub count: u32,
}

/// 下载作业载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadJobData {
    pub task_id: Uuid,
    pub platform: Platform,
    pub platform_video_id: String,
    pub source_url: String,
}

/// 作业种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Search,
    Download,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Search => write!(f, "search"),
            JobKind::Download => write!(f, "download"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JobPayload {
    Search(SearchJobData),
    Download(DownloadJobData),
}

/// 队列中的一个作业
///
/// `attempt_count` 记录已经失败过的投递次数；首次投递为0。
/// 重试上限由承载作业的队列的重试策略决定，不随作业携带。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub payload: JobPayload,
    pub attempt_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(payload: JobPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            attempt_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> JobKind {
        match &self.payload {
            JobPayload::Search(_) => JobKind::Search,
            JobPayload::Download(_) => JobKind::Download,
        }
    }
}
