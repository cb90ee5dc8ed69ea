// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 平台适配器模块
//!
//! 把各视频平台的发现接口（热门/搜索）统一到 `PlatformAdapter`
//! 特质之后，搜索工作器对平台差异无感知。

pub mod scraper;
pub mod traits;
pub mod youtube;

pub use scraper::ScraperAdapter;
pub use traits::{AdapterError, PlatformAdapter, VideoDescriptor};
pub use youtube::YouTubeAdapter;
