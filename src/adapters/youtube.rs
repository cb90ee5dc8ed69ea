// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::traits::{AdapterError, PlatformAdapter, VideoDescriptor};
use crate::domain::models::task::Platform;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::debug;

const DEFAULT_REGION: &str = "US";
const MAX_RESULTS: u32 = 50;

/// YouTube Data API v3 适配器
///
/// 热门视频走 `videos?chart=mostPopular`；搜索先走 `search`
/// 取ID，再批量查 `videos` 补齐统计与时长。
pub struct YouTubeAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl YouTubeAdapter {
    pub fn new(client: reqwest::Client, api_key: String, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn ensure_key(&self) -> Result<(), AdapterError> {
        if self.api_key.is_empty() {
            return Err(AdapterError::MissingApiKey("YouTube API key"));
        }
        Ok(())
    }

    async fn fetch_videos(&self, params: &[(&str, String)]) -> Result<VideoListResponse, AdapterError> {
        let url = format!("{}/videos", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AdapterError::Api(format!(
                "YouTube videos endpoint returned {status}: {body}"
            )));
        }
        Ok(resp.json::<VideoListResponse>().await?)
    }

    fn to_descriptor(item: VideoItem) -> VideoDescriptor {
        let id = item.id;
        VideoDescriptor {
            source_url: format!("https://www.youtube.com/watch?v={id}"),
            title: item.snippet.as_ref().and_then(|s| s.title.clone()),
            author: item.snippet.as_ref().and_then(|s| s.channel_title.clone()),
            views: item
                .statistics
                .as_ref()
                .and_then(|s| s.view_count.as_deref())
                .and_then(|v| v.parse().ok()),
            likes: item
                .statistics
                .as_ref()
                .and_then(|s| s.like_count.as_deref())
                .and_then(|v| v.parse().ok()),
            duration_sec: item
                .content_details
                .as_ref()
                .and_then(|c| c.duration.as_deref())
                .and_then(parse_iso8601_duration),
            preview_url: item.snippet.and_then(|s| {
                s.thumbnails.and_then(|t| {
                    t.high
                        .or(t.medium)
                        .or(t.default)
                        .map(|thumb| thumb.url)
                })
            }),
            platform_video_id: id,
        }
    }
}

#[async_trait]
impl PlatformAdapter for YouTubeAdapter {
    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    async fn fetch_trending(
        &self,
        region_code: Option<&str>,
        count: u32,
    ) -> Result<Vec<VideoDescriptor>, AdapterError> {
        self.ensure_key()?;
        let region = region_code.unwrap_or(DEFAULT_REGION);
        let max = count.min(MAX_RESULTS);
        debug!(region = region, count = max, "fetching YouTube trending videos");
        let body = self
            .fetch_videos(&[
                ("part", "snippet,statistics,contentDetails".to_string()),
                ("chart", "mostPopular".to_string()),
                ("regionCode", region.to_string()),
                ("maxResults", max.to_string()),
            ])
            .await?;
        Ok(body.items.into_iter().map(Self::to_descriptor).collect())
    }

    async fn search(
        &self,
        query: &str,
        region_code: Option<&str>,
        count: u32,
    ) -> Result<Vec<VideoDescriptor>, AdapterError> {
        self.ensure_key()?;
        let max = count.min(MAX_RESULTS);
        let url = format!("{}/search", self.base_url);
        let mut params = vec![
            ("part", "id".to_string()),
            ("type", "video".to_string()),
            ("order", "viewCount".to_string()),
            ("q", query.to_string()),
            ("maxResults", max.to_string()),
        ];
        if let Some(region) = region_code {
            params.push(("regionCode", region.to_string()));
        }
        let resp = self
            .client
            .get(&url)
            .query(&params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AdapterError::Api(format!(
                "YouTube search endpoint returned {status}: {body}"
            )));
        }
        let search: SearchListResponse = resp.json().await?;
        let ids: Vec<String> = search
            .items
            .into_iter()
            .filter_map(|i| i.id.video_id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let body = self
            .fetch_videos(&[
                ("part", "snippet,statistics,contentDetails".to_string()),
                ("id", ids.join(",")),
            ])
            .await?;
        Ok(body.items.into_iter().map(Self::to_descriptor).collect())
    }
}

/// 解析 ISO 8601 时长（如 `PT1H2M3S`）为秒数
fn parse_iso8601_duration(raw: &str) -> Option<u32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$").expect("valid duration regex")
    });
    let caps = re.captures(raw)?;
    let num = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0)
    };
    Some(num(1) * 3600 + num(2) * 60 + num(3))
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: Option<Snippet>,
    statistics: Option<Statistics>,
    #[serde(rename = "contentDetails")]
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: Option<String>,
    #[serde(rename = "channelTitle")]
    channel_title: Option<String>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct Statistics {
    #[serde(rename = "viewCount")]
    view_count: Option<String>,
    #[serde(rename = "likeCount")]
    like_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}
