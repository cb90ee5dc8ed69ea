// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::Extension;
use harvestrs::adapters::{PlatformAdapter, ScraperAdapter, YouTubeAdapter};
use harvestrs::config::settings::Settings;
use harvestrs::domain::models::task::Platform;
use harvestrs::infrastructure::downloader::YtDlpDownloader;
use harvestrs::infrastructure::repositories::{MemoryTaskRepository, MemoryVideoRepository};
use harvestrs::presentation::routes;
use harvestrs::queue::QueueRegistry;
use harvestrs::utils::telemetry;
use harvestrs::workers::manager::WorkerManager;
use harvestrs::workers::stall_worker::StallWorker;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting harvestrs...");

    // Initialize Prometheus Metrics
    telemetry::init_metrics();

    // 2. Load configuration
    let settings = Settings::new()?;
    info!("Configuration loaded");

    // 3. Initialize repositories
    let task_repo = Arc::new(MemoryTaskRepository::new());
    let video_repo = Arc::new(MemoryVideoRepository::new());

    // 4. Initialize platform adapters
    let http_client = reqwest::Client::new();
    let mut adapters: HashMap<Platform, Arc<dyn PlatformAdapter>> = HashMap::new();
    adapters.insert(
        Platform::Youtube,
        Arc::new(YouTubeAdapter::new(
            http_client.clone(),
            settings.youtube.api_key.clone(),
            settings.youtube.api_base.clone(),
        )),
    );
    adapters.insert(
        Platform::Tiktok,
        Arc::new(ScraperAdapter::tiktok(
            http_client.clone(),
            settings.scrapers.tiktok_url.clone(),
        )),
    );
    adapters.insert(
        Platform::Instagram,
        Arc::new(ScraperAdapter::instagram(
            http_client,
            settings.scrapers.instagram_url.clone(),
        )),
    );

    // 5. Initialize queues and downloader
    let registry = QueueRegistry::in_memory(settings.download_retry_policy());
    let downloader = Arc::new(YtDlpDownloader::new(settings.downloads.ytdlp_bin.clone()));

    // 6. Start Workers
    let mut worker_manager = WorkerManager::new(
        task_repo.clone(),
        video_repo.clone(),
        adapters,
        registry.clone(),
        downloader,
        settings.clone(),
    );
    worker_manager.start_workers();

    if let Some(timeout_secs) = settings.task.stall_timeout_secs {
        info!(timeout_secs = timeout_secs, "stall sweeper enabled");
        let stall_worker = StallWorker::new(task_repo.clone(), timeout_secs);
        tokio::spawn(async move {
            stall_worker.run().await;
        });
    }

    // 7. Start HTTP server
    let app = routes::routes()
        .layer(Extension(task_repo))
        .layer(Extension(video_repo))
        .layer(Extension(registry));

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            worker_manager.wait_for_shutdown().await;
        })
        .await?;
    info!("Server stopped");

    Ok(())
}
