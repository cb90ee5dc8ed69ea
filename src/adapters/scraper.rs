// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! TikTok / Instagram 抓取微服务适配器
//!
//! 两个平台共享同一个HTTP协议（`GET /trends`、`GET /search`），
//! 仅字段命名与热门获取方式有差异，因此共用一个实现。

use super::traits::{AdapterError, PlatformAdapter, VideoDescriptor};
use crate::domain::models::task::Platform;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Instagram 热门内容没有官方榜单，抓取服务用固定话题标签模拟
const INSTAGRAM_TRENDS_HASHTAG: &str = "viralreels";

/// 抓取微服务适配器
///
/// TikTok 与 Instagram 各自对应一个独立部署的抓取服务，
/// 由 `base_url` 区分实例。
pub struct ScraperAdapter {
    client: reqwest::Client,
    platform: Platform,
    base_url: String,
}

impl ScraperAdapter {
    pub fn tiktok(client: reqwest::Client, base_url: String) -> Self {
        Self::new(client, Platform::Tiktok, base_url)
    }

    pub fn instagram(client: reqwest::Client, base_url: String) -> Self {
        Self::new(client, Platform::Instagram, base_url)
    }

    fn new(client: reqwest::Client, platform: Platform, base_url: String) -> Self {
        Self {
            client,
            platform,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<VideoDescriptor>, AdapterError> {
        let url = format!("{}/{endpoint}", self.base_url);
        debug!(platform = %self.platform, url = %url, "calling scraper service");
        let resp = self.client.get(&url).query(params).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AdapterError::Api(format!(
                "{} scraper returned {status}: {body}",
                self.platform
            )));
        }
        let items: Vec<ScraperItem> = resp.json().await?;
        let platform = self.platform;
        Ok(items
            .into_iter()
            .map(|item| item.into_descriptor(platform))
            .collect())
    }
}

#[async_trait]
impl PlatformAdapter for ScraperAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch_trending(
        &self,
        _region_code: Option<&str>,
        count: u32,
    ) -> Result<Vec<VideoDescriptor>, AdapterError> {
        let mut params = vec![("count", count.to_string())];
        if self.platform == Platform::Instagram {
            params.push(("hashtag", INSTAGRAM_TRENDS_HASHTAG.to_string()));
        }
        self.fetch("trends", &params).await
    }

    async fn search(
        &self,
        query: &str,
        _region_code: Option<&str>,
        count: u32,
    ) -> Result<Vec<VideoDescriptor>, AdapterError> {
        self.fetch(
            "search",
            &[("q", query.to_string()), ("count", count.to_string())],
        )
        .await
    }
}

/// 抓取服务返回的条目
///
/// TikTok 用 `cover` 字段做预览图，Instagram 用 `thumbnail`；
/// 两者都可能缺标题。
#[derive(Debug, Deserialize)]
struct ScraperItem {
    id: String,
    url: String,
    title: Option<String>,
    author: Option<String>,
    views: Option<u64>,
    likes: Option<u64>,
    duration: Option<u32>,
    cover: Option<String>,
    thumbnail: Option<String>,
}

impl ScraperItem {
    fn into_descriptor(self, platform: Platform) -> VideoDescriptor {
        let preview_url = match platform {
            Platform::Tiktok => self.cover,
            _ => self.thumbnail,
        };
        VideoDescriptor {
            platform_video_id: self.id,
            title: self.title,
            author: self.author,
            views: self.views,
            likes: self.likes,
            duration_sec: self.duration,
            preview_url,
            source_url: self.url,
        }
    }
}
