// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库实现模块
pub mod memory_task_repo;
pub mod memory_video_repo;

pub use memory_task_repo::MemoryTaskRepository;
pub use memory_video_repo::MemoryVideoRepository;
