// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::Platform;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 适配器错误类型
#[derive(Error, Debug)]
pub enum AdapterError {
    /// 平台API返回错误
    #[error("Platform API error: {0}")]
    Api(String),

    /// 网络/HTTP失败
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 缺少必需的API密钥
    #[error("{0} is missing")]
    MissingApiKey(&'static str),
}

/// 规范化的视频描述符
///
/// 各平台适配器把自己的响应映射到统一形状；除外部ID与
/// 源地址外的字段均为可选。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoDescriptor {
    pub platform_video_id: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub views: Option<u64>,
    pub likes: Option<u64>,
    pub duration_sec: Option<u32>,
    pub preview_url: Option<String>,
    pub source_url: String,
}

/// 平台搜索适配器特质
///
/// 薄 I/O 封装：零结果返回空序列而非错误，网络/API失败
/// 返回 `AdapterError`。返回的序列长度不超过请求的 `count`。
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// 适配器对应的平台
    fn platform(&self) -> Platform;

    /// 获取热门视频
    ///
    /// # 参数
    ///
    /// * `region_code` - 地区选择器（平台可忽略）
    /// * `count` - 期望的结果数量上限
    async fn fetch_trending(
        &self,
        region_code: Option<&str>,
        count: u32,
    ) -> Result<Vec<VideoDescriptor>, AdapterError>;

    /// 关键词搜索
    async fn search(
        &self,
        query: &str,
        region_code: Option<&str>,
        count: u32,
    ) -> Result<Vec<VideoDescriptor>, AdapterError>;
}
