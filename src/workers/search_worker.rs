// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::adapters::{PlatformAdapter, VideoDescriptor};
use crate::domain::models::task::{Task, TaskLogLevel, TaskMode, TaskStatus};
use crate::domain::models::video::{VideoStatus, VideoUpsert};
use crate::domain::repositories::task_repository::TaskRepository;
use crate::domain::repositories::video_repository::VideoRepository;
use crate::domain::services::task_log;
use crate::queue::{DownloadJobData, Job, JobPayload, JobQueue, SearchJobData};
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 搜索工作器
///
/// 消费某个平台的搜索队列：认领任务、调用平台适配器、落库
/// 视频记录并为每条结果派发下载作业。搜索失败是业务性终态，
/// 不做重试。
pub struct SearchWorker<T, V> {
    task_repo: Arc<T>,
    video_repo: Arc<V>,
    adapter: Arc<dyn PlatformAdapter>,
    search_queue: Arc<dyn JobQueue>,
    download_queue: Arc<dyn JobQueue>,
    downloads_enabled: bool,
}

impl<T, V> SearchWorker<T, V>
where
    T: TaskRepository,
    V: VideoRepository,
{
    pub fn new(
        task_repo: Arc<T>,
        video_repo: Arc<V>,
        adapter: Arc<dyn PlatformAdapter>,
        search_queue: Arc<dyn JobQueue>,
        download_queue: Arc<dyn JobQueue>,
        downloads_enabled: bool,
    ) -> Self {
        Self {
            task_repo,
            video_repo,
            adapter,
            search_queue,
            download_queue,
            downloads_enabled,
        }
    }

    /// 消费循环，队列关闭并排空后返回
    pub async fn run(self) {
        while let Some(job) = self.search_queue.dequeue().await {
            let data = match job.payload {
                JobPayload::Search(data) => data,
                other => {
                    warn!(job_id = %job.id, "search queue delivered non-search payload: {other:?}");
                    continue;
                }
            };
            if self.process(data).await {
                counter!("jobs_completed_total", "kind" => "search").increment(1);
            }
        }
    }

    /// 处理一个搜索作业
    ///
    /// # 返回值
    ///
    /// 搜索成功收尾返回 `true`；作业被丢弃或任务进入
    /// 错误态返回 `false`
    async fn process(&self, data: SearchJobData) -> bool {
        let task_id = data.task_id;
        let mut task = match self.task_repo.find_by_id(task_id).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                warn!(task_id = %task_id, "search job references unknown task, dropping");
                return false;
            }
            Err(e) => {
                error!(task_id = %task_id, "failed to load task: {e}");
                return false;
            }
        };

        // at-least-once 重投递：任务已越过搜索阶段时静默丢弃，
        // 避免重复搜索改写已经固定的 total
        if !matches!(task.status, TaskStatus::Queued | TaskStatus::Searching) {
            debug!(task_id = %task_id, status = %task.status, "task already past search, dropping job");
            return false;
        }

        if task.begin_search().is_err() {
            return false;
        }
        if let Err(e) = self.task_repo.update(&task).await {
            error!(task_id = %task_id, "failed to mark task searching: {e}");
            return false;
        }

        let platform = self.adapter.platform();
        info!(task_id = %task_id, platform = %platform, mode = %data.mode, "starting search");
        task_log::append(
            self.task_repo.as_ref(),
            task_id,
            TaskLogLevel::Info,
            format!(
                "Search started: mode={} keywords={} region={} count={}",
                data.mode,
                data.keywords.as_deref().unwrap_or(""),
                data.region_code.as_deref().unwrap_or("US"),
                data.count
            ),
        )
        .await;

        let result = match data.mode {
            TaskMode::Trends => {
                self.adapter
                    .fetch_trending(data.region_code.as_deref(), data.count)
                    .await
            }
            TaskMode::Search => {
                let keywords = data.keywords.as_deref().unwrap_or_default();
                self.adapter
                    .search(keywords, data.region_code.as_deref(), data.count)
                    .await
            }
        };

        let videos = match result {
            Ok(videos) => videos,
            Err(e) => {
                error!(task_id = %task_id, platform = %platform, "search failed: {e}");
                task.fail_search(e.to_string());
                if let Err(update_err) = self.task_repo.update(&task).await {
                    error!(task_id = %task_id, "failed to persist search failure: {update_err}");
                }
                task_log::append(
                    self.task_repo.as_ref(),
                    task_id,
                    TaskLogLevel::Error,
                    &format!("Search failed: {e}"),
                )
                .await;
                return false;
            }
        };

        let found = videos.len() as u32;
        task.complete_search(found, self.downloads_enabled);
        if let Err(e) = self.task_repo.update(&task).await {
            error!(task_id = %task_id, "failed to persist search result: {e}");
            return false;
        }

        if found == 0 {
            task_log::append(
                self.task_repo.as_ref(),
                task_id,
                TaskLogLevel::Warn,
                "Search returned no results",
            )
            .await;
            return true;
        }

        let mut stored = 0u32;
        for descriptor in videos {
            if let Err(e) = self.store_and_dispatch(&task, descriptor).await {
                // 单条失败不拖垮整个批次
                warn!(task_id = %task_id, "failed to register video: {e}");
            } else {
                stored += 1;
            }
        }

        let message = if self.downloads_enabled {
            format!("Search completed: found {found} videos, {stored} queued for download")
        } else {
            format!("Search completed: found {found} videos (downloads disabled, metadata only)")
        };
        info!(task_id = %task_id, found = found, stored = stored, "search finished");
        task_log::append(self.task_repo.as_ref(), task_id, TaskLogLevel::Info, &message).await;
        true
    }

    /// 落库一条视频并在需要时派发下载作业
    async fn store_and_dispatch(
        &self,
        task: &Task,
        descriptor: VideoDescriptor,
    ) -> anyhow::Result<()> {
        let platform = task.platform;
        let status = if self.downloads_enabled {
            VideoStatus::Downloading
        } else {
            VideoStatus::Ready
        };
        let fields = VideoUpsert {
            title: descriptor.title,
            author: descriptor.author,
            views: descriptor.views,
            likes: descriptor.likes,
            duration_sec: descriptor.duration_sec,
            preview_url: descriptor.preview_url,
            source_url: Some(descriptor.source_url.clone()),
            status,
        };
        self.video_repo
            .upsert(platform, &descriptor.platform_video_id, task.task_id, fields)
            .await?;

        if self.downloads_enabled {
            let job = Job::new(JobPayload::Download(DownloadJobData {
                task_id: task.task_id,
                platform,
                platform_video_id: descriptor.platform_video_id.clone(),
                source_url: descriptor.source_url,
            }));
            self.download_queue.enqueue(job).await?;
            task_log::append(
                self.task_repo.as_ref(),
                task.task_id,
                TaskLogLevel::Info,
                format!("Download of {} enqueued", descriptor.platform_video_id),
            )
            .await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::AdapterError;
    use crate::domain::models::task::{Platform, TaskQuery};
    use crate::infrastructure::repositories::{MemoryTaskRepository, MemoryVideoRepository};
    use crate::queue::MemoryJobQueue;
    use crate::utils::RetryPolicy;
    use async_trait::async_trait;

    /// 按预置脚本应答的适配器
    struct ScriptedAdapter {
        platform: Platform,
        result: std::sync::Mutex<Option<Result<Vec<VideoDescriptor>, AdapterError>>>,
    }

    impl ScriptedAdapter {
        fn ok(count: usize) -> Self {
            let videos = (0..count)
                .map(|i| VideoDescriptor {
                    platform_video_id: format!("vid{i}"),
                    title: Some(format!("Video {i}")),
                    author: None,
                    views: Some(100),
                    likes: None,
                    duration_sec: Some(60),
                    preview_url: None,
                    source_url: format!("https://example.com/{i}"),
                })
                .collect();
            Self {
                platform: Platform::Youtube,
                result: std::sync::Mutex::new(Some(Ok(videos))),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                platform: Platform::Youtube,
                result: std::sync::Mutex::new(Some(Err(AdapterError::Api(message.to_string())))),
            }
        }
    }

    #[async_trait]
    impl PlatformAdapter for ScriptedAdapter {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn fetch_trending(
            &self,
            _region_code: Option<&str>,
            _count: u32,
        ) -> Result<Vec<VideoDescriptor>, AdapterError> {
            self.result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(Vec::new()))
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

    struct Fixture {
        task_repo: Arc<MemoryTaskRepository>,
        video_repo: Arc<MemoryVideoRepository>,
        download_queue: MemoryJobQueue,
        processed: bool,
    }

    async fn run_search(
        adapter: ScriptedAdapter,
        downloads_enabled: bool,
    ) -> (Task, Fixture) {
        let task_repo = Arc::new(MemoryTaskRepository::new());
        let video_repo = Arc::new(MemoryVideoRepository::new());
        let download_queue = MemoryJobQueue::new("dl", RetryPolicy::none());

        let task = Task::new(
            Platform::Youtube,
            TaskMode::Trends,
            TaskQuery {
                count: 5,
                ..Default::default()
            },
        );
        task_repo.create(&task).await.unwrap();

        let worker = SearchWorker::new(
            task_repo.clone(),
            video_repo.clone(),
            Arc::new(adapter),
            Arc::new(MemoryJobQueue::new("search", RetryPolicy::none())),
            Arc::new(download_queue.clone()),
            downloads_enabled,
        );
        let processed = worker
            .process(SearchJobData {
                task_id: task.task_id,
                mode: TaskMode::Trends,
                keywords: None,
                region_code: None,
                count: 5,
            })
            .await;

        let task = task_repo.find_by_id(task.task_id).await.unwrap().unwrap();
        (
            task,
            Fixture {
                task_repo,
                video_repo,
                download_queue,
                processed,
            },
        )
    }

    #[tokio::test]
    async fn test_successful_search_dispatches_downloads() {
        let (task, fx) = run_search(ScriptedAdapter::ok(3), true).await;

        assert_eq!(task.status, TaskStatus::Downloading);
        assert_eq!(task.progress.found, 3);
        assert_eq!(task.progress.total, 3);
        assert_eq!(task.progress.downloaded, 0);
        assert_eq!(fx.download_queue.depth().await, 3);
        assert_eq!(fx.video_repo.count_by_task(task.task_id).await.unwrap(), 3);
        assert!(fx.processed);

        // 任务日志覆盖搜索全程：开始、逐条入队、收尾
        assert!(task
            .logs
            .iter()
            .any(|l| l.message.contains("Search started")));
        assert!(task
            .logs
            .iter()
            .any(|l| l.message.contains("Download of vid0 enqueued")));
        assert!(task
            .logs
            .iter()
            .any(|l| l.message.contains("Search completed")));
    }

    #[tokio::test]
    async fn test_downloads_disabled_completes_immediately() {
        let (task, fx) = run_search(ScriptedAdapter::ok(3), false).await;

        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress.downloaded, 3);
        assert_eq!(fx.download_queue.depth().await, 0);
        assert_eq!(
            fx.video_repo
                .count_by_status(task.task_id, VideoStatus::Ready)
                .await
                .unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn test_search_failure_is_terminal() {
        let (task, fx) = run_search(ScriptedAdapter::failing("quota exceeded"), true).await;

        assert_eq!(task.status, TaskStatus::Error);
        assert_eq!(task.error_messages.len(), 1);
        assert!(task.error_messages[0].contains("quota exceeded"));
        assert_eq!(task.progress.total, 0);
        assert_eq!(fx.download_queue.depth().await, 0);
        assert_eq!(fx.video_repo.count_by_task(task.task_id).await.unwrap(), 0);
        // 失败收尾不算作业成功
        assert!(!fx.processed);
    }

    #[tokio::test]
    async fn test_zero_results_completes_with_warning() {
        let (task, _fx) = run_search(ScriptedAdapter::ok(0), true).await;

        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress.total, 0);
        assert!(task
            .logs
            .iter()
            .any(|l| l.message.contains("no results")));
    }

    #[tokio::test]
    async fn test_redelivery_after_terminal_is_dropped() {
        let (task, fx) = run_search(ScriptedAdapter::ok(2), true).await;
        assert_eq!(task.progress.total, 2);

        // 再次投递同一搜索作业：任务已在下载阶段，total 不得改变
        let worker = SearchWorker::new(
            fx.task_repo.clone(),
            fx.video_repo.clone(),
            Arc::new(ScriptedAdapter::ok(7)),
            Arc::new(MemoryJobQueue::new("search", RetryPolicy::none())),
            Arc::new(fx.download_queue.clone()),
            true,
        );
        let processed = worker
            .process(SearchJobData {
                task_id: task.task_id,
                mode: TaskMode::Trends,
                keywords: None,
                region_code: None,
                count: 5,
            })
            .await;
        assert!(!processed);

        let task = fx
            .task_repo
            .find_by_id(task.task_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.progress.total, 2);
        assert_eq!(fx.download_queue.depth().await, 2);
    }

    #[tokio::test]
    async fn test_unknown_task_is_dropped() {
        let task_repo = Arc::new(MemoryTaskRepository::new());
        let video_repo = Arc::new(MemoryVideoRepository::new());
        let worker = SearchWorker::new(
            task_repo,
            video_repo.clone(),
            Arc::new(ScriptedAdapter::ok(2)),
            Arc::new(MemoryJobQueue::new("search", RetryPolicy::none())),
            Arc::new(MemoryJobQueue::new("dl", RetryPolicy::none())),
            true,
        );
        let processed = worker
            .process(SearchJobData {
                task_id: uuid::Uuid::new_v4(),
                mode: TaskMode::Trends,
                keywords: None,
                region_code: None,
                count: 5,
            })
            .await;
        assert!(!processed);
        // 不落库任何视频
        assert!(video_repo
            .list_by_task(uuid::Uuid::new_v4(), true)
            .await
            .unwrap()
            .is_empty());
    }
}
