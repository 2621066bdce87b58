//! Kiln GFX 层
//!
//! D3D12 风格的资源、描述符、命令录制与队列同步抽象。原生 API 通过
//! `GfxDevice` / `GfxQueueBackend` / `GfxFence` 三个 trait 接入，
//! `headless` 模块提供一个不依赖 GPU 的实现。

pub mod basic;
pub mod commands;
pub mod deferred_disposer;
pub mod descriptors;
pub mod device;
pub mod error;
pub mod headless;
pub mod resources;

pub use error::{GfxError, GfxResult};
