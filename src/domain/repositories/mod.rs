// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 定义任务与视频的数据访问契约，持久化技术在基础设施层实现
pub mod task_repository;
pub mod video_repository;
