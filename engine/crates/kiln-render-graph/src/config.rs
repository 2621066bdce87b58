use std::sync::Arc;

use kiln_gfx::commands::queue::{GfxQueue, GfxQueueType};

use crate::error::{GraphError, GraphResult};

/// Pass Graph 配置，可以从 toml 加载
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PassGraphConfig {
    /// 每帧最多注册的 Pass 数量
    pub max_pass_count: u32,
    /// 每帧最多声明的资源数量（创建 + 导入）
    pub max_resource_count: u32,
    /// 录制线程数；目前录制只在调用线程上串行进行
    pub max_thread_count: u32,
    pub enable_async_compute: bool,
    /// 生命周期不重叠的临时资源共享物理资源
    pub enable_aliasing: bool,
    /// 连续多少帧没有使用的临时资源被回收
    pub transient_retire_frames: u32,
    /// 回收的临时资源延迟销毁的帧数
    pub frames_in_flight: u32,
}

impl Default for PassGraphConfig {
    fn default() -> Self {
        Self {
            max_pass_count: 64,
            max_resource_count: 256,
            max_thread_count: 1,
            enable_async_compute: true,
            enable_aliasing: false,
            transient_retire_frames: 8,
            frames_in_flight: 2,
        }
    }
}

/// 创建 Pass Graph 的参数
#[derive(Clone)]
pub struct PassGraphDesc {
    pub config: PassGraphConfig,
    pub graphics_queue: Arc<GfxQueue>,
    /// 没有 compute 队列时所有 Pass 都在 graphics 队列上执行
    pub compute_queue: Option<Arc<GfxQueue>>,
}

impl PassGraphDesc {
    pub fn new(config: PassGraphConfig, graphics_queue: Arc<GfxQueue>) -> Self {
        Self {
            config,
            graphics_queue,
            compute_queue: None,
        }
    }

    #[inline]
    pub fn with_compute_queue(mut self, queue: Arc<GfxQueue>) -> Self {
        self.compute_queue = Some(queue);
        self
    }

    pub fn validate(&self) -> GraphResult<()> {
        let config = &self.config;
        if config.max_pass_count == 0 {
            return Err(GraphError::InvalidDesc("max_pass_count must be > 0".to_string()));
        }
        if config.max_resource_count == 0 {
            return Err(GraphError::InvalidDesc("max_resource_count must be > 0".to_string()));
        }
        if config.max_thread_count == 0 {
            return Err(GraphError::InvalidDesc("max_thread_count must be > 0".to_string()));
        }
        if config.frames_in_flight == 0 {
            return Err(GraphError::InvalidDesc("frames_in_flight must be > 0".to_string()));
        }
        if self.graphics_queue.queue_type() != GfxQueueType::Graphics {
            return Err(GraphError::InvalidDesc(format!(
                "graphics queue \"{}\" has type {:?}",
                self.graphics_queue.name(),
                self.graphics_queue.queue_type()
            )));
        }
        if let Some(compute) = &self.compute_queue {
            if compute.queue_type() != GfxQueueType::Compute {
                return Err(GraphError::InvalidDesc(format!(
                    "compute queue \"{}\" has type {:?}",
                    compute.name(),
                    compute.queue_type()
                )));
            }
        }

        if config.max_thread_count > 1 {
            log::warn!("max_thread_count = {}, pass recording is serial", config.max_thread_count);
        }
        Ok(())
    }
}
