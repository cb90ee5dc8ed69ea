// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::adapters::PlatformAdapter;
use crate::config::Settings;
use crate::domain::models::task::Platform;
use crate::domain::repositories::task_repository::TaskRepository;
use crate::domain::repositories::video_repository::VideoRepository;
use crate::infrastructure::downloader::Downloader;
use crate::queue::QueueRegistry;
use crate::workers::download_worker::DownloadWorker;
use crate::workers::search_worker::SearchWorker;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// 工作管理器
///
/// 为每个平台启动一组搜索工作器与下载工作器，并负责
/// 收到关闭信号后的优雅退出：先关闭队列让工作器排空退出，
/// 拖延者被强制中止。
pub struct WorkerManager<T, V>
where
    T: TaskRepository + 'static,
    V: VideoRepository + 'static,
{
    task_repo: Arc<T>,
    video_repo: Arc<V>,
    adapters: HashMap<Platform, Arc<dyn PlatformAdapter>>,
    registry: QueueRegistry,
    downloader: Arc<dyn Downloader>,
    settings: Settings,
    handles: Vec<JoinHandle<()>>,
}

impl<T, V> WorkerManager<T, V>
where
    T: TaskRepository + Send + Sync,
    V: VideoRepository + Send + Sync,
{
    pub fn new(
        task_repo: Arc<T>,
        video_repo: Arc<V>,
        adapters: HashMap<Platform, Arc<dyn PlatformAdapter>>,
        registry: QueueRegistry,
        downloader: Arc<dyn Downloader>,
        settings: Settings,
    ) -> Self {
        Self {
            task_repo,
            video_repo,
            adapters,
            registry,
            downloader,
            settings,
            handles: Vec::new(),
        }
    }

    /// 启动所有平台的工作器池
    pub fn start_workers(&mut self) {
        for platform in Platform::ALL {
            let Some(adapter) = self.adapters.get(&platform) else {
                warn!(platform = %platform, "no adapter configured, skipping platform");
                continue;
            };
            let pair = self.registry.pair(platform).clone();

            for _ in 0..self.settings.workers.search_concurrency {
                let worker = SearchWorker::new(
                    self.task_repo.clone(),
                    self.video_repo.clone(),
                    adapter.clone(),
                    pair.search.clone(),
                    pair.download.clone(),
                    self.settings.downloads.enabled,
                );
                self.handles.push(tokio::spawn(worker.run()));
            }

            for _ in 0..self.settings.workers.download_concurrency {
                let worker = DownloadWorker::new(
                    self.task_repo.clone(),
                    self.video_repo.clone(),
                    self.downloader.clone(),
                    pair.download.clone(),
                    PathBuf::from(&self.settings.downloads.dir),
                    self.settings.downloads.enabled,
                    self.settings.completion.count_errors,
                );
                self.handles.push(tokio::spawn(worker.run()));
            }

            info!(
                platform = %platform,
                search = self.settings.workers.search_concurrency,
                download = self.settings.workers.download_concurrency,
                "workers started"
            );
        }
    }

    /// 等待关闭信号并关闭工作进程
    ///
    /// 关闭队列后工作器会在排空当前作业后自行退出
    pub async fn wait_for_shutdown(&mut self) {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }

        info!("Shutting down workers...");
        self.registry.close_all().await;
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    error!("worker task ended abnormally: {e}");
                }
            }
        }

        info!("Workers shut down successfully");
    }
}
