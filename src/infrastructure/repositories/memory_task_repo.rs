// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{Task, TaskLogLevel, TaskStatus};
use crate::domain::repositories::task_repository::{RepositoryError, TaskRepository};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

/// 内存任务仓库
///
/// 所有写操作在 DashMap 条目锁下完成，`append_log` 的追加
/// 与裁剪因此容忍多工作器交错。进程外持久化属于外部协作者，
/// 由相同特质的其他实现承担。
#[derive(Default)]
pub struct MemoryTaskRepository {
    tasks: DashMap<Uuid, Task>,
}

impl MemoryTaskRepository {
    /// 创建空的内存任务仓库
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for MemoryTaskRepository {
    async fn create(&self, task: &Task) -> Result<Task, RepositoryError> {
        self.tasks.insert(task.task_id, task.clone());
        Ok(task.clone())
    }

    async fn find_by_id(&self, task_id: Uuid) -> Result<Option<Task>, RepositoryError> {
        Ok(self.tasks.get(&task_id).map(|t| t.clone()))
    }

    async fn update(&self, task: &Task) -> Result<Task, RepositoryError> {
        match self.tasks.get_mut(&task.task_id) {
            Some(mut entry) => {
                // 日志由 append_log 在条目锁下维护，覆写时保留
                // 较长的一侧，避免吞掉并发追加的条目
                let mut updated = task.clone();
                if entry.logs.len() > updated.logs.len() {
                    updated.logs = entry.logs.clone();
                }
                if entry.error_messages.len() > updated.error_messages.len() {
                    updated.error_messages = entry.error_messages.clone();
                }
                // 终态不可回退，进度计数单调不减：持有过期快照的
                // 下载工作器不得把已完成的任务拉回下载中
                if entry.status.is_terminal() {
                    updated.status = entry.status;
                }
                if entry.progress.downloaded > updated.progress.downloaded {
                    updated.progress.downloaded = entry.progress.downloaded;
                }
                *entry = updated.clone();
                Ok(updated)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn append_log(
        &self,
        task_id: Uuid,
        level: TaskLogLevel,
        message: &str,
    ) -> Result<(), RepositoryError> {
        match self.tasks.get_mut(&task_id) {
            Some(mut entry) => {
                entry.push_log(level, message);
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn find_stalled(
        &self,
        status: TaskStatus,
        older_than: chrono::Duration,
    ) -> Result<Vec<Task>, RepositoryError> {
        let cutoff = Utc::now() - older_than;
        Ok(self
            .tasks
            .iter()
            .filter(|t| t.status == status && t.updated_at < cutoff)
            .map(|t| t.clone())
            .collect())
    }
}
