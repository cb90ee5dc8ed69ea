// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 包含任务与视频记录两个核心实体及其状态机
pub mod task;
pub mod video;
