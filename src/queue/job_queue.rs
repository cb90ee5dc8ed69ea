// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::job::Job;
use crate::utils::RetryPolicy;
use metrics::{counter, gauge};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use tracing::debug;
use uuid::Uuid;

/// 队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    /// 队列已关闭，不再接受新作业
    #[error("Queue is closed")]
    Closed,

    /// 底层存储失败
    #[error("Queue storage error: {0}")]
    Storage(String),
}

/// 失败作业的重试裁决
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// 已按退避时间安排重投
    Scheduled { attempt: u32, delay: Duration },
    /// 重试耗尽，作业死亡
    Dead,
}

/// 作业队列特质
///
/// 搜索与下载作业共用同一接口；重试语义由 `nack` 承载，
/// 成功消费无需回执。
#[async_trait::async_trait]
pub trait JobQueue: Send + Sync {
    /// 入队一个作业，返回作业ID
    async fn enqueue(&self, job: Job) -> Result<Uuid, QueueError>;

    /// 取出下一个作业
    ///
    /// 队列为空时异步等待；队列关闭且排空后返回 `None`。
    async fn dequeue(&self) -> Option<Job>;

    /// 报告作业处理失败
    ///
    /// 根据重试策略决定安排重投还是宣告死亡。
    async fn nack(&self, job: Job) -> Result<RetryOutcome, QueueError>;

    /// 关闭队列，唤醒所有等待的消费者
    async fn close(&self);

    /// 当前排队深度
    async fn depth(&self) -> usize;
}

#[async_trait::async_trait]
impl<T: JobQueue + ?Sized> JobQueue for Arc<T> {
    async fn enqueue(&self, job: Job) -> Result<Uuid, QueueError> {
        (**self).enqueue(job).await
    }

    async fn dequeue(&self) -> Option<Job> {
        (**self).dequeue().await
    }

    async fn nack(&self, job: Job) -> Result<RetryOutcome, QueueError> {
        (**self).nack(job).await
    }

    async fn close(&self) {
        (**self).close().await
    }

    async fn depth(&self) -> usize {
        (**self).depth().await
    }
}

struct Inner {
    name: String,
    jobs: Mutex<VecDeque<Job>>,
    notify: Notify,
    closed: AtomicBool,
    retry_policy: RetryPolicy,
}

/// 内存作业队列
///
/// 进程内的 FIFO 队列，克隆句柄共享同一底层状态。重投通过
/// 分离的延迟任务实现，不阻塞失败上报方。
#[derive(Clone)]
pub struct MemoryJobQueue {
    inner: Arc<Inner>,
}

impl MemoryJobQueue {
    pub fn new(name: impl Into<String>, retry_policy: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                jobs: Mutex::new(VecDeque::new()),
                notify: Notify::new(),
                closed: AtomicBool::new(false),
                retry_policy,
            }),
        }
    }

    async fn push(&self, job: Job) {
        let depth = {
            let mut jobs = self.inner.jobs.lock().await;
            jobs.push_back(job);
            jobs.len()
        };
        gauge!("queue_depth", "queue" => self.inner.name.clone()).set(depth as f64);
        self.inner.notify.notify_one();
    }
}

#[async_trait::async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: Job) -> Result<Uuid, QueueError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }
        let id = job.id;
        debug!(queue = %self.inner.name, job_id = %id, kind = %job.kind(), "job enqueued");
        self.push(job).await;
        Ok(id)
    }

    async fn dequeue(&self) -> Option<Job> {
        loop {
            {
                let mut jobs = self.inner.jobs.lock().await;
                if let Some(job) = jobs.pop_front() {
                    gauge!("queue_depth", "queue" => self.inner.name.clone())
                        .set(jobs.len() as f64);
                    return Some(job);
                }
            }
            if self.inner.closed.load(Ordering::Acquire) {
                return None;
            }
            self.inner.notify.notified().await;
        }
    }

    async fn nack(&self, mut job: Job) -> Result<RetryOutcome, QueueError> {
        if !self.inner.retry_policy.should_retry(job.attempt_count) {
            counter!("jobs_dead_total", "queue" => self.inner.name.clone()).increment(1);
            return Ok(RetryOutcome::Dead);
        }
        job.attempt_count += 1;
        let attempt = job.attempt_count;
        let delay = self.inner.retry_policy.calculate_backoff(attempt);
        counter!("jobs_retried_total", "queue" => self.inner.name.clone()).increment(1);
        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if queue.inner.closed.load(Ordering::Acquire) {
                return;
            }
            queue.push(job).await;
        });
        Ok(RetryOutcome::Scheduled { attempt, delay })
    }

    async fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    async fn depth(&self) -> usize {
        self.inner.jobs.lock().await.len()
    }
}
