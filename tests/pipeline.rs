// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 端到端流水线测试
//!
//! 用内存仓库、脚本化适配器与假下载器把搜索/下载工作器
//! 接成完整流水线，验证任务从入队到收敛的全过程。

use async_trait::async_trait;
use harvestrs::adapters::{AdapterError, PlatformAdapter, VideoDescriptor};
use harvestrs::domain::models::task::{Platform, Task, TaskMode, TaskQuery, TaskStatus};
use harvestrs::domain::models::video::VideoStatus;
use harvestrs::domain::repositories::task_repository::TaskRepository;
use harvestrs::domain::repositories::video_repository::VideoRepository;
use harvestrs::infrastructure::downloader::{DownloadError, Downloader};
use harvestrs::infrastructure::repositories::{MemoryTaskRepository, MemoryVideoRepository};
use harvestrs::queue::{Job, JobPayload, JobQueue, MemoryJobQueue, SearchJobData};
use harvestrs::utils::RetryPolicy;
use harvestrs::workers::{DownloadWorker, SearchWorker};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// 返回固定结果集的适配器
struct StubAdapter {
    videos: Vec<VideoDescriptor>,
    fail: bool,
}

impl StubAdapter {
    fn with_videos(count: usize) -> Self {
        let videos = (0..count)
            .map(|i| VideoDescriptor {
                platform_video_id: format!("vid{i}"),
                title: Some(format!("Video {i}")),
                author: Some("author".to_string()),
                views: Some(1_000 + i as u64),
                likes: None,
                duration_sec: Some(120),
                preview_url: None,
                source_url: format!("https://example.com/watch/{i}"),
            })
            .collect();
        Self {
            videos,
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            videos: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl PlatformAdapter for StubAdapter {
    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    async fn fetch_trending(
        &self,
        _region_code: Option<&str>,
        _count: u32,
    ) -> Result<Vec<VideoDescriptor>, AdapterError> {
        if self.fail {
            Err(AdapterError::Api("upstream rejected the request".into()))
        } else {
            Ok(self.videos.clone())
        }
    }

    async fn search(
        &self,
        _query: &str,
        region_code: Option<&str>,
        count: u32,
    ) -> Result<Vec<VideoDescriptor>, AdapterError> {
        self.fetch_trending(region_code, count).await
    }
}

/// 前 `failures` 次调用失败的下载器
struct FlakyDownloader {
    failures: AtomicU32,
}

impl FlakyDownloader {
    fn reliable() -> Self {
        Self {
            failures: AtomicU32::new(0),
        }
    }

    fn failing_first(failures: u32) -> Self {
        Self {
            failures: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl Downloader for FlakyDownloader {
    async fn download(
        &self,
        _source_url: &str,
        output_dir: &Path,
        base_name: &str,
    ) -> Result<PathBuf, DownloadError> {
        let claimed_failure = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if claimed_failure {
            return Err(DownloadError::ToolFailed {
                code: 1,
                stderr: "simulated network failure".to_string(),
            });
        }
        Ok(output_dir.join(format!("{base_name}.mp4")))
    }
}

struct Pipeline {
    task_repo: Arc<MemoryTaskRepository>,
    video_repo: Arc<MemoryVideoRepository>,
    search_queue: MemoryJobQueue,
    download_queue: MemoryJobQueue,
}

impl Pipeline {
    /// 拉起一组搜索/下载工作器并返回句柄
    fn start(adapter: StubAdapter, downloader: FlakyDownloader, downloads_enabled: bool) -> Self {
        let task_repo = Arc::new(MemoryTaskRepository::new());
        let video_repo = Arc::new(MemoryVideoRepository::new());
        let fast_retry = RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
            enable_jitter: false,
        };
        let search_queue = MemoryJobQueue::new("search", RetryPolicy::none());
        let download_queue = MemoryJobQueue::new("download", fast_retry);

        let adapter: Arc<dyn PlatformAdapter> = Arc::new(adapter);
        let downloader: Arc<dyn Downloader> = Arc::new(downloader);

        for _ in 0..2 {
            let worker = SearchWorker::new(
                task_repo.clone(),
                video_repo.clone(),
                adapter.clone(),
                Arc::new(search_queue.clone()),
                Arc::new(download_queue.clone()),
                downloads_enabled,
            );
            tokio::spawn(worker.run());
        }
        for _ in 0..3 {
            let worker = DownloadWorker::new(
                task_repo.clone(),
                video_repo.clone(),
                downloader.clone(),
                Arc::new(download_queue.clone()),
                PathBuf::from("/tmp/harvestrs-test"),
                downloads_enabled,
                false,
            );
            tokio::spawn(worker.run());
        }

        Self {
            task_repo,
            video_repo,
            search_queue,
            download_queue,
        }
    }

    /// 创建任务并入队搜索作业
    async fn submit(&self, count: u32) -> Uuid {
        let task = Task::new(
            Platform::Youtube,
            TaskMode::Trends,
            TaskQuery {
                count,
                ..Default::default()
            },
        );
        let task = self.task_repo.create(&task).await.unwrap();
        self.search_queue
            .enqueue(Job::new(JobPayload::Search(SearchJobData {
                task_id: task.task_id,
                mode: TaskMode::Trends,
                keywords: None,
                region_code: None,
                count,
            })))
            .await
            .unwrap();
        task.task_id
    }

    /// 轮询直到任务到达终态
    async fn wait_terminal(&self, task_id: Uuid) -> Task {
        for _ in 0..500 {
            let task = self
                .task_repo
                .find_by_id(task_id)
                .await
                .unwrap()
                .expect("task must exist");
            if task.status.is_terminal() {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {task_id} did not reach a terminal state in time");
    }
}

#[tokio::test]
async fn full_pipeline_downloads_all_videos() {
    let pipeline = Pipeline::start(
        StubAdapter::with_videos(5),
        FlakyDownloader::reliable(),
        true,
    );

    let task_id = pipeline.submit(5).await;
    let task = pipeline.wait_terminal(task_id).await;

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.progress.found, 5);
    assert_eq!(task.progress.downloaded, 5);
    assert_eq!(task.progress.total, 5);
    assert!(task.error_messages.is_empty());

    let ready = pipeline
        .video_repo
        .count_by_status(task_id, VideoStatus::Ready)
        .await
        .unwrap();
    assert_eq!(ready, 5);

    let videos = pipeline.video_repo.list_by_task(task_id, false).await.unwrap();
    assert_eq!(videos.len(), 5);
    for video in &videos {
        assert_eq!(video.task_id, task_id);
        assert!(video.download_path.is_some());
    }

    assert!(task
        .logs
        .iter()
        .any(|l| l.message.contains("Task completed")));
}

#[tokio::test]
async fn search_failure_terminates_task_without_records() {
    let pipeline = Pipeline::start(StubAdapter::failing(), FlakyDownloader::reliable(), true);

    let task_id = pipeline.submit(5).await;
    let task = pipeline.wait_terminal(task_id).await;

    assert_eq!(task.status, TaskStatus::Error);
    assert!(!task.error_messages.is_empty());
    assert!(task.error_messages[0].contains("upstream rejected"));
    assert_eq!(task.progress.total, 0);
    assert_eq!(
        pipeline.video_repo.count_by_task(task_id).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn downloads_disabled_is_metadata_only() {
    let pipeline = Pipeline::start(
        StubAdapter::with_videos(3),
        FlakyDownloader::reliable(),
        false,
    );

    let task_id = pipeline.submit(3).await;
    let task = pipeline.wait_terminal(task_id).await;

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.progress.found, 3);
    assert_eq!(task.progress.downloaded, 3);
    assert_eq!(task.progress.total, 3);
    assert_eq!(pipeline.download_queue.depth().await, 0);

    let videos = pipeline.video_repo.list_by_task(task_id, false).await.unwrap();
    assert_eq!(videos.len(), 3);
    for video in &videos {
        assert_eq!(video.status, VideoStatus::Ready);
        // 元数据模式不产生下载产物
        assert!(video.download_path.is_none());
    }
}

#[tokio::test]
async fn transient_download_failures_are_retried_to_completion() {
    // 前两次下载调用失败，之后恢复；重试策略允许3次
    let pipeline = Pipeline::start(
        StubAdapter::with_videos(2),
        FlakyDownloader::failing_first(2),
        true,
    );

    let task_id = pipeline.submit(2).await;
    let task = pipeline.wait_terminal(task_id).await;

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.progress.downloaded, 2);
    assert!(task
        .logs
        .iter()
        .any(|l| l.message.contains("retry")));
}

#[tokio::test]
async fn soft_delete_preserves_task_counters() {
    let pipeline = Pipeline::start(
        StubAdapter::with_videos(2),
        FlakyDownloader::reliable(),
        true,
    );

    let task_id = pipeline.submit(2).await;
    let task = pipeline.wait_terminal(task_id).await;
    assert_eq!(task.status, TaskStatus::Completed);

    pipeline
        .video_repo
        .soft_delete(Platform::Youtube, "vid0")
        .await
        .unwrap();

    // 历史进度不因删除而回退
    let task = pipeline
        .task_repo
        .find_by_id(task_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(task.progress.downloaded, 2);
    assert_eq!(
        pipeline
            .video_repo
            .count_by_status(task_id, VideoStatus::Ready)
            .await
            .unwrap(),
        2
    );
    // 默认列表隐藏已删除记录
    let visible = pipeline.video_repo.list_by_task(task_id, false).await.unwrap();
    assert_eq!(visible.len(), 1);
}
