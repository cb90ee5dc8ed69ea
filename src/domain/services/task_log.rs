// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::TaskLogLevel;
use crate::domain::repositories::task_repository::TaskRepository;
use tracing::debug;
use uuid::Uuid;

/// 尽力而为地追加任务日志
///
/// 任务日志属于可观测性信息，追加失败绝不允许使作业失败：
/// 错误在调用点吞掉，只降级为 debug 级别的进程日志。
///
/// # 参数
///
/// * `repo` - 任务仓库
/// * `task_id` - 任务ID
/// * `level` - 日志级别
/// * `message` - 日志内容
pub async fn append<T: TaskRepository + ?Sized>(
    repo: &T,
    task_id: Uuid,
    level: TaskLogLevel,
    message: impl Into<String>,
) {
    let message = message.into();
    if let Err(e) = repo.append_log(task_id, level, &message).await {
        // 可观测性失败不是业务失败
        debug!("Failed to append task log for {}: {}", task_id, e);
    }
}
