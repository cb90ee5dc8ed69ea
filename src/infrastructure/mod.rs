// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施模块
///
/// 提供仓库实现与外部下载工具的封装
pub mod downloader;
pub mod repositories;
