// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{TaskLogLevel, TaskStatus};
use crate::domain::repositories::task_repository::TaskRepository;
use crate::domain::services::task_log;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// 停滞任务清扫器
///
/// 周期性扫描长期停留在下载中的任务并把它们置为失败。
/// 仅在配置了停滞超时后启动；超时值过小会误伤仍在重试
/// 退避中的任务，由运维自行权衡。
pub struct StallWorker<T> {
    task_repo: Arc<T>,
    stall_timeout: chrono::Duration,
}

impl<T: TaskRepository> StallWorker<T> {
    pub fn new(task_repo: Arc<T>, stall_timeout_secs: u64) -> Self {
        Self {
            task_repo,
            stall_timeout: chrono::Duration::seconds(stall_timeout_secs as i64),
        }
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            self.sweep().await;
        }
    }

    async fn sweep(&self) {
        let stalled = match self
            .task_repo
            .find_stalled(TaskStatus::Downloading, self.stall_timeout)
            .await
        {
            Ok(tasks) => tasks,
            Err(e) => {
                error!("stall sweep failed to query tasks: {e}");
                return;
            }
        };

        for mut task in stalled {
            let task_id = task.task_id;
            warn!(task_id = %task_id, "task stalled in downloading, failing it");
            if task.fail_stalled("Task stalled: no download progress within timeout").is_err() {
                continue;
            }
            if let Err(e) = self.task_repo.update(&task).await {
                error!(task_id = %task_id, "failed to persist stalled task: {e}");
                continue;
            }
            task_log::append(
                self.task_repo.as_ref(),
                task_id,
                TaskLogLevel::Error,
                "Task stalled: no download progress within timeout",
            )
            .await;
            info!(task_id = %task_id, "stalled task failed");
        }
    }
}
