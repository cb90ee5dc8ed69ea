// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::TaskLogLevel;
use crate::domain::models::video::VideoStatus;
use crate::domain::repositories::task_repository::TaskRepository;
use crate::domain::repositories::video_repository::VideoRepository;
use crate::domain::services::task_log;
use crate::infrastructure::downloader::Downloader;
use crate::queue::{DownloadJobData, Job, JobPayload, JobQueue, RetryOutcome};
use metrics::{counter, histogram};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// 下载工作器
///
/// 消费某个平台的下载队列：调用下载器取回视频文件、更新视频
/// 记录，并基于视频存储重新聚合任务进度。重试由队列承载，
/// 重试耗尽后视频进入错误态，任务进度照常收敛。
pub struct DownloadWorker<T, V> {
    task_repo: Arc<T>,
    video_repo: Arc<V>,
    downloader: Arc<dyn Downloader>,
    download_queue: Arc<dyn JobQueue>,
    downloads_dir: PathBuf,
    downloads_enabled: bool,
    count_errors_toward_completion: bool,
}

impl<T, V> DownloadWorker<T, V>
where
    T: TaskRepository,
    V: VideoRepository,
{
    pub fn new(
        task_repo: Arc<T>,
        video_repo: Arc<V>,
        downloader: Arc<dyn Downloader>,
        download_queue: Arc<dyn JobQueue>,
        downloads_dir: PathBuf,
        downloads_enabled: bool,
        count_errors_toward_completion: bool,
    ) -> Self {
        Self {
            task_repo,
            video_repo,
            downloader,
            download_queue,
            downloads_dir,
            downloads_enabled,
            count_errors_toward_completion,
        }
    }

    /// 消费循环，队列关闭并排空后返回
    pub async fn run(self) {
        while let Some(job) = self.download_queue.dequeue().await {
            self.process(job).await;
        }
    }

    async fn process(&self, job: Job) {
        let data = match &job.payload {
            JobPayload::Download(data) => data.clone(),
            other => {
                warn!(job_id = %job.id, "download queue delivered non-download payload: {other:?}");
                return;
            }
        };

        if !self.downloads_enabled {
            // 配置热切换的兜底：禁用下载后残留的作业直接丢弃
            warn!(task_id = %data.task_id, "downloads disabled, dropping download job");
            return;
        }

        let video = match self
            .video_repo
            .find(data.platform, &data.platform_video_id)
            .await
        {
            Ok(Some(video)) => video,
            Ok(None) => {
                error!(
                    task_id = %data.task_id,
                    video_id = %data.platform_video_id,
                    "download job references unknown video, dropping"
                );
                task_log::append(
                    self.task_repo.as_ref(),
                    data.task_id,
                    TaskLogLevel::Error,
                    format!("Video {} not found in storage", data.platform_video_id),
                )
                .await;
                return;
            }
            Err(e) => {
                error!(task_id = %data.task_id, "failed to load video record: {e}");
                return;
            }
        };

        // 重复投递：已下载完成的视频直接走聚合收敛
        if video.status == VideoStatus::Ready {
            debug!(video_id = %data.platform_video_id, "video already ready, recomputing progress only");
            self.recompute_progress(&data).await;
            return;
        }

        let output_dir = self
            .downloads_dir
            .join(data.platform.to_string())
            .join(data.task_id.to_string());
        let started = Instant::now();
        let result = self
            .downloader
            .download(&data.source_url, &output_dir, &data.platform_video_id)
            .await;
        histogram!("download_duration_seconds", "platform" => data.platform.to_string())
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(path) => {
                info!(
                    task_id = %data.task_id,
                    video_id = %data.platform_video_id,
                    path = %path.display(),
                    "download succeeded"
                );
                if let Err(e) = self
                    .video_repo
                    .mark_ready(
                        data.platform,
                        &data.platform_video_id,
                        &path.to_string_lossy(),
                    )
                    .await
                {
                    error!(video_id = %data.platform_video_id, "failed to mark video ready: {e}");
                    return;
                }
                counter!("jobs_completed_total", "kind" => "download").increment(1);
                task_log::append(
                    self.task_repo.as_ref(),
                    data.task_id,
                    TaskLogLevel::Info,
                    format!("Downloaded video {}", data.platform_video_id),
                )
                .await;
                self.recompute_progress(&data).await;
            }
            Err(e) => {
                let message = e.to_string();
                warn!(
                    task_id = %data.task_id,
                    video_id = %data.platform_video_id,
                    attempt = job.attempt_count,
                    "download failed: {message}"
                );
                match self.download_queue.nack(job).await {
                    Ok(RetryOutcome::Scheduled { attempt, delay }) => {
                        task_log::append(
                            self.task_repo.as_ref(),
                            data.task_id,
                            TaskLogLevel::Warn,
                            format!(
                                "Download of {} failed, retry {} scheduled in {}s: {message}",
                                data.platform_video_id,
                                attempt,
                                delay.as_secs()
                            ),
                        )
                        .await;
                    }
                    Ok(RetryOutcome::Dead) => {
                        if let Err(mark_err) = self
                            .video_repo
                            .mark_error(data.platform, &data.platform_video_id, &message)
                            .await
                        {
                            error!(
                                video_id = %data.platform_video_id,
                                "failed to mark video errored: {mark_err}"
                            );
                        }
                        task_log::append(
                            self.task_repo.as_ref(),
                            data.task_id,
                            TaskLogLevel::Error,
                            format!(
                                "Download of {} failed permanently: {message}",
                                data.platform_video_id
                            ),
                        )
                        .await;
                        self.recompute_progress(&data).await;
                    }
                    Err(nack_err) => {
                        error!(task_id = %data.task_id, "failed to nack download job: {nack_err}");
                    }
                }
            }
        }
    }

    /// 基于视频存储重新聚合任务进度
    ///
    /// 计数始终整体重算后覆写，对乱序与重复投递幂等。
    async fn recompute_progress(&self, data: &DownloadJobData) {
        let task_id = data.task_id;
        let mut task = match self.task_repo.find_by_id(task_id).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                warn!(task_id = %task_id, "task disappeared during progress recompute");
                return;
            }
            Err(e) => {
                error!(task_id = %task_id, "failed to load task for recompute: {e}");
                return;
            }
        };

        let ready = match self
            .video_repo
            .count_by_status(task_id, VideoStatus::Ready)
            .await
        {
            Ok(n) => n,
            Err(e) => {
                error!(task_id = %task_id, "failed to count ready videos: {e}");
                return;
            }
        };
        let errored = if self.count_errors_toward_completion {
            match self
                .video_repo
                .count_by_status(task_id, VideoStatus::Error)
                .await
            {
                Ok(n) => n,
                Err(e) => {
                    error!(task_id = %task_id, "failed to count errored videos: {e}");
                    return;
                }
            }
        } else {
            0
        };
        let downloaded = (ready + errored) as u32;

        // total 在搜索完成时固定；极端情况下缺失时退回存量统计
        let total = if task.progress.total > 0 {
            task.progress.total
        } else {
            match self.video_repo.count_by_task(task_id).await {
                Ok(n) => n as u32,
                Err(e) => {
                    error!(task_id = %task_id, "failed to count task videos: {e}");
                    return;
                }
            }
        };

        let completed = task.record_progress(downloaded, total);
        if let Err(e) = self.task_repo.update(&task).await {
            error!(task_id = %task_id, "failed to persist recomputed progress: {e}");
            return;
        }
        if completed {
            info!(task_id = %task_id, downloaded = downloaded, total = total, "task completed");
            task_log::append(
                self.task_repo.as_ref(),
                task_id,
                TaskLogLevel::Info,
                format!("Task completed: {downloaded}/{total} videos downloaded"),
            )
            .await;
        }
    }
}
