// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::Platform;
use crate::domain::models::video::{VideoRecord, VideoStatus, VideoUpsert};
use crate::domain::repositories::task_repository::RepositoryError;
use crate::domain::repositories::video_repository::VideoRepository;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

/// 内存视频仓库
///
/// 唯一键 (platform, platform_video_id) 直接作为 DashMap 的键；
/// `upsert` 走 entry API，对同一键的并发调用在分片锁下串行化，
/// 满足"原子 upsert 而非读后写"的契约。
#[derive(Default)]
pub struct MemoryVideoRepository {
    videos: DashMap<(Platform, String), VideoRecord>,
}

impl MemoryVideoRepository {
    /// 创建空的内存视频仓库
    pub fn new() -> Self {
        Self::default()
    }

    fn merge(record: &mut VideoRecord, fields: VideoUpsert) {
        if fields.title.is_some() {
            record.title = fields.title;
        }
        if fields.author.is_some() {
            record.author = fields.author;
        }
        if fields.views.is_some() {
            record.views = fields.views;
        }
        if fields.likes.is_some() {
            record.likes = fields.likes;
        }
        if fields.duration_sec.is_some() {
            record.duration_sec = fields.duration_sec;
        }
        if fields.preview_url.is_some() {
            record.preview_url = fields.preview_url;
        }
        if fields.source_url.is_some() {
            record.source_url = fields.source_url;
        }
        record.status = fields.status;
        record.updated_at = Utc::now();
    }
}

#[async_trait]
impl VideoRepository for MemoryVideoRepository {
    async fn upsert(
        &self,
        platform: Platform,
        platform_video_id: &str,
        task_id: Uuid,
        fields: VideoUpsert,
    ) -> Result<VideoRecord, RepositoryError> {
        let key = (platform, platform_video_id.to_string());
        let mut entry = self.videos.entry(key).or_insert_with(|| VideoRecord {
            platform,
            platform_video_id: platform_video_id.to_string(),
            // 仅插入时写入：重复发现不会改写归属任务
            task_id,
            title: None,
            author: None,
            views: None,
            likes: None,
            duration_sec: None,
            preview_url: None,
            source_url: None,
            download_path: None,
            status: VideoStatus::Found,
            error: None,
            deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        Self::merge(entry.value_mut(), fields);
        Ok(entry.clone())
    }

    async fn find(
        &self,
        platform: Platform,
        platform_video_id: &str,
    ) -> Result<Option<VideoRecord>, RepositoryError> {
        Ok(self
            .videos
            .get(&(platform, platform_video_id.to_string()))
            .map(|v| v.clone()))
    }

    async fn mark_ready(
        &self,
        platform: Platform,
        platform_video_id: &str,
        download_path: &str,
    ) -> Result<VideoRecord, RepositoryError> {
        match self
            .videos
            .get_mut(&(platform, platform_video_id.to_string()))
        {
            Some(mut entry) => {
                entry.status = VideoStatus::Ready;
                entry.download_path = Some(download_path.to_string());
                entry.error = None;
                entry.updated_at = Utc::now();
                Ok(entry.clone())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn mark_error(
        &self,
        platform: Platform,
        platform_video_id: &str,
        message: &str,
    ) -> Result<VideoRecord, RepositoryError> {
        match self
            .videos
            .get_mut(&(platform, platform_video_id.to_string()))
        {
            Some(mut entry) => {
                entry.status = VideoStatus::Error;
                entry.error = Some(message.to_string());
                entry.updated_at = Utc::now();
                Ok(entry.clone())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn count_by_status(
        &self,
        task_id: Uuid,
        status: VideoStatus,
    ) -> Result<u64, RepositoryError> {
        Ok(self
            .videos
            .iter()
            .filter(|v| v.task_id == task_id && v.status == status)
            .count() as u64)
    }

    async fn count_by_task(&self, task_id: Uuid) -> Result<u64, RepositoryError> {
        Ok(self.videos.iter().filter(|v| v.task_id == task_id).count() as u64)
    }

    async fn soft_delete(
        &self,
        platform: Platform,
        platform_video_id: &str,
    ) -> Result<(), RepositoryError> {
        match self
            .videos
            .get_mut(&(platform, platform_video_id.to_string()))
        {
            Some(mut entry) => {
                entry.deleted = true;
                entry.updated_at = Utc::now();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn list_by_task(
        &self,
        task_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<VideoRecord>, RepositoryError> {
        Ok(self
            .videos
            .iter()
            .filter(|v| v.task_id == task_id && (include_deleted || !v.deleted))
            .map(|v| v.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn fields(status: VideoStatus) -> VideoUpsert {
        VideoUpsert {
            title: Some("A title".into()),
            author: Some("someone".into()),
            views: Some(1000),
            source_url: Some("https://example.com/v/1".into()),
            status,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_merges() {
        let repo = MemoryVideoRepository::new();
        let first_task = Uuid::new_v4();
        let second_task = Uuid::new_v4();

        let inserted = repo
            .upsert(Platform::Youtube, "abc", first_task, fields(VideoStatus::Downloading))
            .await
            .unwrap();
        assert_eq!(inserted.task_id, first_task);
        assert_eq!(inserted.status, VideoStatus::Downloading);

        // 第二个任务再次发现同一视频：合并字段，归属任务不变
        let merged = repo
            .upsert(
                Platform::Youtube,
                "abc",
                second_task,
                VideoUpsert {
                    views: Some(2000),
                    status: VideoStatus::Downloading,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(merged.task_id, first_task);
        assert_eq!(merged.views, Some(2000));
        assert_eq!(merged.title, Some("A title".to_string()));

        assert_eq!(repo.count_by_task(first_task).await.unwrap(), 1);
        assert_eq!(repo.count_by_task(second_task).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_single_record() {
        let repo = Arc::new(MemoryVideoRepository::new());
        let task_id = Uuid::new_v4();

        let mut handles = Vec::new();
        for i in 0..32 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.upsert(
                    Platform::Tiktok,
                    "same-id",
                    task_id,
                    VideoUpsert {
                        views: Some(i),
                        status: VideoStatus::Downloading,
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(repo.count_by_task(task_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_ready_and_error() {
        let repo = MemoryVideoRepository::new();
        let task_id = Uuid::new_v4();
        repo.upsert(Platform::Instagram, "reel1", task_id, fields(VideoStatus::Downloading))
            .await
            .unwrap();

        let ready = repo
            .mark_ready(Platform::Instagram, "reel1", "/downloads/instagram/x/reel1.mp4")
            .await
            .unwrap();
        assert_eq!(ready.status, VideoStatus::Ready);
        assert!(ready.download_path.is_some());
        assert_eq!(repo.count_by_status(task_id, VideoStatus::Ready).await.unwrap(), 1);

        let failed = repo
            .mark_error(Platform::Instagram, "reel1", "tool exited 1")
            .await
            .unwrap();
        assert_eq!(failed.status, VideoStatus::Error);
        assert_eq!(failed.error, Some("tool exited 1".to_string()));

        assert!(matches!(
            repo.mark_ready(Platform::Instagram, "missing", "/x").await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_record() {
        let repo = MemoryVideoRepository::new();
        let task_id = Uuid::new_v4();
        repo.upsert(Platform::Youtube, "gone", task_id, fields(VideoStatus::Ready))
            .await
            .unwrap();

        repo.soft_delete(Platform::Youtube, "gone").await.unwrap();

        // 软删除不影响既有计数，只从默认列表中隐藏
        assert_eq!(repo.count_by_status(task_id, VideoStatus::Ready).await.unwrap(), 1);
        assert!(repo.list_by_task(task_id, false).await.unwrap().is_empty());
        assert_eq!(repo.list_by_task(task_id, true).await.unwrap().len(), 1);

        assert!(matches!(
            repo.soft_delete(Platform::Youtube, "missing").await,
            Err(RepositoryError::NotFound)
        ));
    }
}
