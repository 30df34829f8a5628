//! # 统一错误处理模块
//!
//! 定义 gpwbands 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// gpwbands 统一错误类型
#[derive(Error, Debug)]
pub enum BandsError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("The {path} does not exist")]
    DirectoryNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 文件选择
    // ─────────────────────────────────────────────────────────────
    #[error("File index {index} is out of range (found {len} checkpoint files)")]
    IndexOutOfRange { index: usize, len: usize },

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Unknown option '{0}'")]
    UnknownOption(String),

    #[error("Invalid value '{value}' for option '{option}': {reason}")]
    InvalidValue {
        option: String,
        value: String,
        reason: String,
    },

    #[error("Invalid band path '{0}'")]
    InvalidBandPath(String),

    // ─────────────────────────────────────────────────────────────
    // 检查点解析
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read checkpoint {path}\nReason: {reason}")]
    Checkpoint { path: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // 求解器后端
    // ─────────────────────────────────────────────────────────────
    #[error("Unsupported by the {backend} backend: {what}")]
    Unsupported { backend: String, what: String },

    #[error("External command '{command}' not found in PATH")]
    CommandNotFound { command: String },

    #[error("External command failed: {command}\n{stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("External command '{command}' timed out after {seconds} s")]
    Timeout { command: String, seconds: u64 },

    // ─────────────────────────────────────────────────────────────
    // 序列化错误
    // ─────────────────────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Plot error: {0}")]
    Plot(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, BandsError>;
