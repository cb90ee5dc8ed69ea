// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{Task, TaskLogLevel, TaskStatus};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 存储错误
    #[error("Storage error: {0}")]
    Storage(String),

    /// 记录未找到
    #[error("Record not found")]
    NotFound,
}

/// 任务仓库特质
///
/// 定义任务数据访问接口。任何具备原子 upsert 与简单等值
/// 查询能力的持久存储都可以实现它。
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// 创建新任务
    async fn create(&self, task: &Task) -> Result<Task, RepositoryError>;

    /// 根据ID查找任务
    async fn find_by_id(&self, task_id: Uuid) -> Result<Option<Task>, RepositoryError>;

    /// 整体覆写任务
    ///
    /// 进度字段始终由调用方重新聚合后覆写，而非递增，
    /// 因此并发覆写不会产生丢失更新问题。
    async fn update(&self, task: &Task) -> Result<Task, RepositoryError>;

    /// 追加一条有界任务日志
    ///
    /// 在存储侧的条目锁下完成追加与裁剪，容忍多工作器交错。
    async fn append_log(
        &self,
        task_id: Uuid,
        level: TaskLogLevel,
        message: &str,
    ) -> Result<(), RepositoryError>;

    /// 查找停滞任务
    ///
    /// 返回处于给定状态且自最后更新起超过 `older_than` 的任务。
    async fn find_stalled(
        &self,
        status: TaskStatus,
        older_than: chrono::Duration,
    ) -> Result<Vec<Task>, RepositoryError>;
}
