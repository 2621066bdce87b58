//! Kiln 工具集
//!
//! 提供日志初始化、工作区路径管理、profiling 宏等通用工具。
//!
//! # KilnPath
//! 基于工作区根目录的统一路径管理，避免硬编码相对路径。
//!
//! # Profiling
//! `profile_scope!` 在开启 `profiling` feature 时生成 tracy span，否则为空。

pub mod init_log;
pub mod profiling;
pub mod resource;
