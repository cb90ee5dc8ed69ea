// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::job_queue::{JobQueue, MemoryJobQueue};
use crate::domain::models::task::Platform;
use crate::utils::RetryPolicy;
use std::collections::HashMap;
use std::sync::Arc;

/// 一个平台的搜索/下载队列对
#[derive(Clone)]
pub struct QueuePair {
    pub search: Arc<dyn JobQueue>,
    pub download: Arc<dyn JobQueue>,
}

/// 平台队列注册表
///
/// 消费方通过注册表按平台取队列，不关心队列的具体实现；
/// 测试可以用任意 `JobQueue` 实现替换默认的内存队列。
#[derive(Clone)]
pub struct QueueRegistry {
    queues: HashMap<Platform, QueuePair>,
}

impl QueueRegistry {
    /// 为所有平台创建内存队列
    pub fn in_memory(download_retry: RetryPolicy) -> Self {
        let mut queues = HashMap::new();
        for platform in Platform::ALL {
            queues.insert(
                platform,
                QueuePair {
                    search: Arc::new(MemoryJobQueue::new(
                        format!("{platform}-search"),
                        RetryPolicy::none(),
                    )),
                    download: Arc::new(MemoryJobQueue::new(
                        format!("{platform}-download"),
                        download_retry.clone(),
                    )),
                },
            );
        }
        Self { queues }
    }

    /// 用外部提供的队列组装注册表
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Platform, QueuePair)>) -> Self {
        Self {
            queues: pairs.into_iter().collect(),
        }
    }

    pub fn pair(&self, platform: Platform) -> &QueuePair {
        // 构造函数保证每个平台都有队列对
        self.queues
            .get(&platform)
            .unwrap_or_else(|| panic!("no queue pair registered for platform {platform}"))
    }

    /// 关闭全部队列
    pub async fn close_all(&self) {
        for pair in self.queues.values() {
            pair.search.close().await;
            pair.download.close().await;
        }
    }
}
