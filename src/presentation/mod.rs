// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 接入层模块
//!
//! HTTP 接口：任务的创建与查询、视频软删除，以及统一的
//! 错误信封。

pub mod errors;
pub mod handlers;
pub mod routes;
