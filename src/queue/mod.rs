// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 作业队列模块
//!
//! 每个平台一对先进先出队列：搜索作业不重试，下载作业按
//! 指数退避重试。注册表把平台映射到队列对，供工作器与
//! 接入层共享。

pub mod job;
pub mod job_queue;
pub mod registry;

pub use job::{DownloadJobData, Job, JobKind, JobPayload, SearchJobData};
pub use job_queue::{JobQueue, MemoryJobQueue, QueueError, RetryOutcome};
pub use registry::{QueuePair, QueueRegistry};
