// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 任务日志最多保留的条目数，超出部分从头部裁剪
pub const TASK_LOG_CAPACITY: usize = 200;

/// 内容平台枚举
///
/// 系统支持的固定平台集合，每个平台拥有独立的适配器
/// 和一对搜索/下载队列。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// YouTube（官方数据API）
    Youtube,
    /// TikTok（抓取微服务）
    Tiktok,
    /// Instagram（抓取微服务）
    Instagram,
}

impl Platform {
    /// 所有受支持的平台
    pub const ALL: [Platform; 3] = [Platform::Youtube, Platform::Tiktok, Platform::Instagram];
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Platform::Youtube => write!(f, "youtube"),
            Platform::Tiktok => write!(f, "tiktok"),
            Platform::Instagram => write!(f, "instagram"),
        }
    }
}

impl FromStr for Platform {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "youtube" => Ok(Platform::Youtube),
            "tiktok" => Ok(Platform::Tiktok),
            "instagram" => Ok(Platform::Instagram),
            _ => Err(()),
        }
    }
}

/// 任务模式枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskMode {
    /// 关键词搜索
    Search,
    /// 热门趋势
    Trends,
}

impl fmt::Display for TaskMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskMode::Search => write!(f, "search"),
            TaskMode::Trends => write!(f, "trends"),
        }
    }
}

/// 任务状态枚举
///
/// 状态转换遵循以下流程：
/// Queued → Searching → Downloading/Completed/Error，
/// Downloading → Completed。Completed 与 Error 为终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// 已入队，搜索作业尚未被认领
    #[default]
    Queued,
    /// 搜索中，搜索工作器已认领作业
    Searching,
    /// 下载中，搜索已完成且有待下载的视频
    Downloading,
    /// 已完成
    Completed,
    /// 已失败（搜索不可恢复失败或停滞超时）
    Error,
}

impl TaskStatus {
    /// 判断是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskStatus::Queued => write!(f, "queued"),
            TaskStatus::Searching => write!(f, "searching"),
            TaskStatus::Downloading => write!(f, "downloading"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Error => write!(f, "error"),
        }
    }
}

/// 任务进度计数
///
/// 计数器单调不减；`total` 在搜索完成时一次性固定，
/// 此后由下载工作器基于视频存储重新聚合 `downloaded`，
/// 而不是盲目递增。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgress {
    /// 搜索返回的视频数量
    pub found: u32,
    /// 已到达终态 ready 的视频数量
    pub downloaded: u32,
    /// 批次总量，搜索完成后固定不变
    pub total: u32,
}

/// 任务日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskLogLevel {
    Info,
    Warn,
    Error,
}

/// 任务日志条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskLogEntry {
    pub level: TaskLogLevel,
    pub message: String,
    pub ts: DateTime<Utc>,
}

/// 任务查询参数
///
/// `keywords` 在 search 模式下使用；`region_code` 在 trends
/// 模式下选择地区；`region_name` 仅用于展示。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskQuery {
    pub keywords: Option<String>,
    pub region_name: Option<String>,
    pub region_code: Option<String>,
    pub count: u32,
}

/// 领域错误类型
#[derive(Error, Debug)]
pub enum DomainError {
    /// 无效的状态转换，当任务状态转换不符合业务规则时发生
    #[error("Invalid state transition")]
    InvalidStateTransition,

    /// 验证错误，当输入数据不符合领域规则时发生
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// 任务实体
///
/// 表示一次用户发起的批量获取请求。由请求处理器以 `queued`
/// 状态创建；搜索阶段的状态转换由唯一一个搜索工作器驱动，
/// 下载阶段的进度由任意数量的下载工作器重新聚合。任务不会
/// 被删除，只会到达终态。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// 任务唯一标识符（对调用方可见）
    pub task_id: Uuid,
    /// 目标平台
    pub platform: Platform,
    /// 任务模式
    pub mode: TaskMode,
    /// 查询参数
    pub query: TaskQuery,
    /// 任务状态
    pub status: TaskStatus,
    /// 进度计数
    pub progress: TaskProgress,
    /// 追加式的失败信息列表
    pub error_messages: Vec<String>,
    /// 有界追加日志（最多保留 TASK_LOG_CAPACITY 条）
    pub logs: Vec<TaskLogEntry>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 最后更新时间
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// 创建一个新的任务
    ///
    /// # 参数
    ///
    /// * `platform` - 目标平台
    /// * `mode` - 任务模式
    /// * `query` - 查询参数
    ///
    /// # 返回值
    ///
    /// 返回状态为 `Queued`、进度清零的新任务实例
    pub fn new(platform: Platform, mode: TaskMode, query: TaskQuery) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            platform,
            mode,
            query,
            status: TaskStatus::Queued,
            progress: TaskProgress::default(),
            error_messages: Vec::new(),
            logs: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// 进入搜索阶段
    ///
    /// 由认领搜索作业的工作器调用。允许从 `Queued` 或
    /// `Searching`（at-least-once 重投递）进入。
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 转换成功
    /// * `Err(DomainError)` - 状态转换失败
    pub fn begin_search(&mut self) -> Result<(), DomainError> {
        match self.status {
            TaskStatus::Queued | TaskStatus::Searching => {
                self.status = TaskStatus::Searching;
                self.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 搜索成功收尾
    ///
    /// 固定 `total`，并依据结果数量与下载开关决定后续状态：
    /// 有结果且下载开启则进入 `Downloading`，否则直接 `Completed`。
    ///
    /// # 参数
    ///
    /// * `found` - 搜索返回的视频数量
    /// * `downloads_enabled` - 下载是否开启
    pub fn complete_search(&mut self, found: u32, downloads_enabled: bool) {
        self.progress = TaskProgress {
            found,
            downloaded: if downloads_enabled { 0 } else { found },
            total: found,
        };
        self.status = if found > 0 && downloads_enabled {
            TaskStatus::Downloading
        } else {
            TaskStatus::Completed
        };
        self.updated_at = Utc::now();
    }

    /// 搜索不可恢复失败
    ///
    /// 记录失败信息并将任务置为终态 `Error`。
    pub fn fail_search(&mut self, message: impl Into<String>) {
        self.status = TaskStatus::Error;
        self.error_messages.push(message.into());
        self.updated_at = Utc::now();
    }

    /// 停滞超时失败
    ///
    /// 由停滞清扫器调用，仅允许从 `Downloading` 进入 `Error`。
    pub fn fail_stalled(&mut self, message: impl Into<String>) -> Result<(), DomainError> {
        match self.status {
            TaskStatus::Downloading => {
                self.status = TaskStatus::Error;
                self.error_messages.push(message.into());
                self.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 写入重新聚合的进度
    ///
    /// 计数值由调用方基于视频存储重新聚合得到，而非递增，
    /// 因此对下载作业的乱序与重复投递是幂等的。当
    /// `downloaded >= total` 时任务收敛到 `Completed`。
    ///
    /// # 返回值
    ///
    /// 如果本次写入使任务到达 `Completed` 则返回 `true`
    pub fn record_progress(&mut self, downloaded: u32, total: u32) -> bool {
        self.progress.downloaded = downloaded;
        self.progress.total = total;
        self.updated_at = Utc::now();
        if self.status == TaskStatus::Downloading && downloaded >= total {
            self.status = TaskStatus::Completed;
            return true;
        }
        false
    }

    /// 追加一条有界日志
    ///
    /// 超出容量时从头部裁剪，保留最近 TASK_LOG_CAPACITY 条。
    pub fn push_log(&mut self, level: TaskLogLevel, message: impl Into<String>) {
        self.logs.push(TaskLogEntry {
            level,
            message: message.into(),
            ts: Utc::now(),
        });
        if self.logs.len() > TASK_LOG_CAPACITY {
            let excess = self.logs.len() - TASK_LOG_CAPACITY;
            self.logs.drain(..excess);
        }
    }
}
