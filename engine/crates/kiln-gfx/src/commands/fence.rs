use std::fmt;
use std::sync::Arc;

/// 原生 fence 接口
///
/// fence 的值只会被 GPU 单调递增，CPU 通过 `wait_for_value` 阻塞等待。
pub trait GfxFence: Send + Sync {
    /// fence 的唯一 ID，用于判断两个 WaitPoint 是否来自同一个 fence
    fn id(&self) -> u64;

    /// GPU 已经完成的值
    fn completed_value(&self) -> u64;

    /// 阻塞等待 fence 到达 `value`
    ///
    /// 超时返回 `false`，此时不能认为 GPU 已经完成。
    fn wait_for_value(&self, value: u64, timeout_ms: u32) -> bool;
}

/// GPU 执行到某个位置的标记
///
/// 由 `GfxQueue::signal` 产生；交给另一个队列的 `wait` 是 GPU 侧等待，
/// 交给 `GfxQueue::sync` 是 CPU 侧等待。
#[derive(Clone, Default)]
pub struct WaitPoint {
    fence: Option<Arc<dyn GfxFence>>,
    value: u64,
}

// new & init
impl WaitPoint {
    #[inline]
    pub fn new(fence: Arc<dyn GfxFence>, value: u64) -> Self {
        Self {
            fence: Some(fence),
            value,
        }
    }

    /// 无效的 WaitPoint，等待它不会有任何效果
    #[inline]
    pub fn invalid() -> Self {
        Self::default()
    }
}

// getters
impl WaitPoint {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.fence.is_some() && self.value >= 1
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.value
    }

    #[inline]
    pub fn fence(&self) -> Option<&Arc<dyn GfxFence>> {
        self.fence.as_ref()
    }

    /// 无效的 WaitPoint 视为已完成
    #[inline]
    pub fn is_completed(&self) -> bool {
        match &self.fence {
            Some(fence) if self.value >= 1 => fence.completed_value() >= self.value,
            _ => true,
        }
    }

    /// 是否来自指定 fence
    #[inline]
    pub fn is_on_fence(&self, fence_id: u64) -> bool {
        self.fence.as_ref().is_some_and(|fence| fence.id() == fence_id)
    }
}

impl fmt::Debug for WaitPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.fence {
            Some(fence) => write!(f, "WaitPoint(fence#{}, {})", fence.id(), self.value),
            None => write!(f, "WaitPoint(invalid)"),
        }
    }
}
