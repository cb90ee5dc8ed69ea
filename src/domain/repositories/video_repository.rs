// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::Platform;
use crate::domain::models::video::{VideoRecord, VideoStatus, VideoUpsert};
use crate::domain::repositories::task_repository::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 视频仓库特质
///
/// 以 (platform, platform_video_id) 为唯一键的幂等 CRUD。
/// `upsert` 必须是对唯一键原子的：来自不同工作器的并发
/// upsert 串行化，且绝不产生第二条记录。
#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// 原子 upsert
    ///
    /// 键不存在时插入新记录并写入 `task_id`（仅此一次）；
    /// 已存在时合并 `fields` 到现有记录，保留原 `task_id`。
    ///
    /// # 参数
    ///
    /// * `platform` - 来源平台
    /// * `platform_video_id` - 平台侧视频ID
    /// * `task_id` - 发现该视频的任务（仅插入时生效）
    /// * `fields` - 待合并的描述字段与状态
    ///
    /// # 返回值
    ///
    /// 返回 upsert 后的记录
    async fn upsert(
        &self,
        platform: Platform,
        platform_video_id: &str,
        task_id: Uuid,
        fields: VideoUpsert,
    ) -> Result<VideoRecord, RepositoryError>;

    /// 根据唯一键查找记录
    async fn find(
        &self,
        platform: Platform,
        platform_video_id: &str,
    ) -> Result<Option<VideoRecord>, RepositoryError>;

    /// 标记下载完成并写入产物路径
    async fn mark_ready(
        &self,
        platform: Platform,
        platform_video_id: &str,
        download_path: &str,
    ) -> Result<VideoRecord, RepositoryError>;

    /// 标记下载失败并写入错误信息
    async fn mark_error(
        &self,
        platform: Platform,
        platform_video_id: &str,
        message: &str,
    ) -> Result<VideoRecord, RepositoryError>;

    /// 统计某任务下处于给定状态的视频数量
    async fn count_by_status(
        &self,
        task_id: Uuid,
        status: VideoStatus,
    ) -> Result<u64, RepositoryError>;

    /// 统计某任务下的全部视频数量
    async fn count_by_task(&self, task_id: Uuid) -> Result<u64, RepositoryError>;

    /// 软删除
    ///
    /// 只打标记，不物理删除；键不存在时返回 NotFound。
    async fn soft_delete(
        &self,
        platform: Platform,
        platform_video_id: &str,
    ) -> Result<(), RepositoryError>;

    /// 列出某任务发现的视频
    async fn list_by_task(
        &self,
        task_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<VideoRecord>, RepositoryError>;
}
