// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 工作器模块
//!
//! 搜索与下载工作器消费各平台的队列；管理器负责拉起
//! 工作器池与优雅退出；停滞清扫器是可选的看护进程。

pub mod download_worker;
pub mod manager;
pub mod search_worker;
pub mod stall_worker;

pub use download_worker::DownloadWorker;
pub use manager::WorkerManager;
pub use search_worker::SearchWorker;
pub use stall_worker::StallWorker;
