// Copyright (c) 2025 harvestrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// 下载错误类型
#[derive(Error, Debug)]
pub enum DownloadError {
    /// 外部工具非零退出
    #[error("yt-dlp exited with code {code}: {stderr}")]
    ToolFailed { code: i32, stderr: String },

    /// 工具成功退出但找不到产物文件
    #[error("Download finished but file not found")]
    OutputMissing,

    /// I/O错误
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// 外部下载器特质
///
/// 对媒体下载工具的抽象。调用方提供确定性的输出目录与
/// 基础文件名，实现负责定位实际产物（扩展名由工具决定）。
#[async_trait]
pub trait Downloader: Send + Sync {
    /// 下载一个媒体文件
    ///
    /// # 参数
    ///
    /// * `source_url` - 源地址
    /// * `output_dir` - 输出目录（不存在时创建）
    /// * `base_name` - 产物基础文件名（不含扩展名）
    ///
    /// # 返回值
    ///
    /// * `Ok(PathBuf)` - 产物文件的完整路径
    /// * `Err(DownloadError)` - 工具失败或产物缺失
    async fn download(
        &self,
        source_url: &str,
        output_dir: &Path,
        base_name: &str,
    ) -> Result<PathBuf, DownloadError>;
}

/// yt-dlp 子进程下载器
///
/// 以 `<base_name>.%(ext)s` 模板调用 yt-dlp，完成后扫描输出
/// 目录定位产物。
pub struct YtDlpDownloader {
    binary: String,
}

impl YtDlpDownloader {
    /// 创建新的 yt-dlp 下载器
    ///
    /// # 参数
    ///
    /// * `binary` - yt-dlp 可执行文件路径或名称
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn download(
        &self,
        source_url: &str,
        output_dir: &Path,
        base_name: &str,
    ) -> Result<PathBuf, DownloadError> {
        tokio::fs::create_dir_all(output_dir).await?;

        let template = output_dir.join(format!("{}.%(ext)s", base_name));
        debug!("Spawning {} for {}", self.binary, source_url);

        let output = Command::new(&self.binary)
            .arg("-o")
            .arg(&template)
            .arg("--no-part")
            .arg("--no-progress")
            .arg("-f")
            .arg("mp4/bestaudio*+bestvideo*")
            .arg(source_url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(DownloadError::ToolFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        // 扩展名由工具决定，扫描目录找回实际产物
        let prefix = format!("{}.", base_name);
        let mut entries = tokio::fs::read_dir(output_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry
                .file_name()
                .to_string_lossy()
                .starts_with(&prefix)
            {
                return Ok(entry.path());
            }
        }

        Err(DownloadError::OutputMissing)
    }
}
