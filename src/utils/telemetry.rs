// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,harvestrs=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// 初始化指标系统
///
/// 安装 Prometheus 记录器并登记应用指标的描述
pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    builder
        .install()
        .expect("failed to install Prometheus recorder");

    describe_gauge!("queue_depth", "Number of jobs currently waiting in a queue");
    describe_counter!("jobs_completed_total", "Total number of jobs processed to completion");
    describe_counter!("jobs_retried_total", "Total number of job retries scheduled");
    describe_counter!("jobs_dead_total", "Total number of jobs dropped after retry exhaustion");
    describe_counter!("tasks_created_total", "Total number of harvest tasks created");
    describe_histogram!(
        "download_duration_seconds",
        "Duration of individual video downloads in seconds"
    );
}
