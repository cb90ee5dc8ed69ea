// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 平台适配器模块
///
/// 把各视频平台的发现接口统一到同一个特质之后
pub mod adapters;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体、服务和仓库接口
pub mod domain;

/// 基础设施模块
///
/// 提供外部集成：存储实现与视频下载器
pub mod infrastructure;

/// 表示层模块
///
/// 处理HTTP请求和响应，包括路由和处理器
pub mod presentation;

/// 队列模块
///
/// 实现作业队列、重试与平台注册表
pub mod queue;

/// 工具模块
///
/// 重试策略与遥测初始化
pub mod utils;

/// 工作器模块
///
/// 搜索与下载工作器及其生命周期管理
pub mod workers;
