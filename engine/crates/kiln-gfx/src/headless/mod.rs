//! headless 后端
//!
//! 在没有 GPU 的环境下模拟设备、队列与 fence，用于测试和离线运行渲染图。

mod device;
mod fence;
mod queue;

pub use device::{HeadlessDevice, HeadlessDeviceConfig};
pub use fence::HeadlessFence;
pub use queue::{HeadlessQueue, HeadlessSubmission};
