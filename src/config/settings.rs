// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含服务器、下载、平台接入、工作器与重试等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 下载配置
    pub downloads: DownloadSettings,
    /// YouTube接入配置
    pub youtube: YouTubeSettings,
    /// 抓取微服务配置
    pub scrapers: ScraperSettings,
    /// 工作器并发配置
    pub workers: WorkerSettings,
    /// 下载重试配置
    pub retry: RetrySettings,
    /// 任务完成判定配置
    pub completion: CompletionSettings,
    /// 任务看护配置
    #[serde(default)]
    pub task: TaskSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 下载配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadSettings {
    /// 是否启用视频下载（关闭时任务只做元数据收集）
    pub enabled: bool,
    /// 下载文件根目录
    pub dir: String,
    /// yt-dlp 可执行文件路径
    pub ytdlp_bin: String,
}

/// YouTube接入配置
#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeSettings {
    /// YouTube Data API v3 密钥
    pub api_key: String,
    /// API基础地址
    pub api_base: String,
}

/// 抓取微服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperSettings {
    /// TikTok抓取服务地址
    pub tiktok_url: String,
    /// Instagram抓取服务地址
    pub instagram_url: String,
}

/// 工作器并发配置
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSettings {
    /// 每个平台的搜索工作器数量
    pub search_concurrency: u32,
    /// 每个平台的下载工作器数量
    pub download_concurrency: u32,
}

/// 下载重试配置
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// 下载作业最大重试次数
    pub download_max_retries: u32,
    /// 初始退避时间（秒）
    pub initial_backoff_secs: u64,
    /// 最大退避时间（秒）
    pub max_backoff_secs: u64,
}

/// 任务完成判定配置
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionSettings {
    /// 失败的下载是否计入完成进度
    pub count_errors: bool,
}

/// 任务看护配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskSettings {
    /// 下载中任务的停滞超时（秒），不设置则不看护
    pub stall_timeout_secs: Option<u64>,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 默认值 → 配置文件 → `HARVESTRS__` 环境变量，逐层覆盖
    ///
    /// # 返回值
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("downloads.enabled", true)?
            .set_default("downloads.dir", "./downloads")?
            .set_default("downloads.ytdlp_bin", "yt-dlp")?
            .set_default("youtube.api_key", "")?
            .set_default("youtube.api_base", "https://www.googleapis.com/youtube/v3")?
            .set_default("scrapers.tiktok_url", "http://localhost:8081")?
            .set_default("scrapers.instagram_url", "http://localhost:8082")?
            .set_default("workers.search_concurrency", 2)?
            .set_default("workers.download_concurrency", 3)?
            .set_default("retry.download_max_retries", 3)?
            .set_default("retry.initial_backoff_secs", 5)?
            .set_default("retry.max_backoff_secs", 300)?
            .set_default("completion.count_errors", false)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("HARVESTRS").separator("__"));

        builder.build()?.try_deserialize()
    }

    /// 由重试配置构造下载作业的重试策略
    pub fn download_retry_policy(&self) -> crate::utils::RetryPolicy {
        crate::utils::RetryPolicy {
            max_retries: self.retry.download_max_retries,
            initial_backoff: std::time::Duration::from_secs(self.retry.initial_backoff_secs),
            max_backoff: std::time::Duration::from_secs(self.retry.max_backoff_secs),
            ..crate::utils::RetryPolicy::download()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load() {
        let settings = Settings::new().expect("defaults should satisfy the schema");
        assert_eq!(settings.server.port, 3000);
        assert!(settings.downloads.enabled);
        assert_eq!(settings.workers.search_concurrency, 2);
        assert_eq!(settings.workers.download_concurrency, 3);
        assert_eq!(settings.retry.download_max_retries, 3);
        assert!(!settings.completion.count_errors);
        assert!(settings.task.stall_timeout_secs.is_none());
    }

    #[test]
    fn test_retry_policy_from_settings() {
        let settings = Settings::new().unwrap();
        let policy = settings.download_retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_backoff, std::time::Duration::from_secs(5));
    }
}
