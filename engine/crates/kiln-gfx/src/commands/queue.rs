//! 命令队列与 fence 同步
//!
//! 每个 `GfxQueue` 持有一个 fence 和一个单调递增的计数器：
//! `signal` 递增计数器并提交 GPU signal，`wait` 在 GPU 侧等待另一个队列，
//! `sync` 是唯一会阻塞 CPU 的操作。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::commands::command_list::GfxCommandList;
use crate::commands::fence::{GfxFence, WaitPoint};
use crate::error::{GfxError, GfxResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum GfxQueueType {
    Graphics,
    Compute,
    Copy,
}

/// 原生队列接口
pub trait GfxQueueBackend: Send + Sync {
    fn queue_type(&self) -> GfxQueueType;

    fn execute_command_lists(&self, lists: Vec<GfxCommandList>);

    /// GPU 执行到这里时把 fence 设置为 `value`
    fn signal(&self, fence: &Arc<dyn GfxFence>, value: u64);

    /// GPU 侧等待 fence 到达 `value`，不阻塞 CPU
    fn wait(&self, fence: &Arc<dyn GfxFence>, value: u64);

    fn create_fence(&self) -> GfxResult<Arc<dyn GfxFence>>;
}

/// fence + 单调计数器，计数器从不重置也不递减
struct GfxFenceSync {
    fence: Arc<dyn GfxFence>,
    counter: AtomicU64,
}

impl GfxFenceSync {
    /// 递增计数器并返回新值
    #[inline]
    fn next_value(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::AcqRel) + 1
    }

    #[inline]
    fn last_value(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }
}

/// 命令队列
pub struct GfxQueue {
    backend: Arc<dyn GfxQueueBackend>,
    fence_sync: GfxFenceSync,
    name: String,
}

// new & init
impl GfxQueue {
    pub fn new(backend: Arc<dyn GfxQueueBackend>, name: impl Into<String>) -> GfxResult<Self> {
        let fence = backend.create_fence()?;
        Ok(Self {
            backend,
            fence_sync: GfxFenceSync {
                fence,
                counter: AtomicU64::new(0),
            },
            name: name.into(),
        })
    }
}

// getters
impl GfxQueue {
    #[inline]
    pub fn queue_type(&self) -> GfxQueueType {
        self.backend.queue_type()
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn fence(&self) -> &Arc<dyn GfxFence> {
        &self.fence_sync.fence
    }

    /// 最近一次 signal 的 WaitPoint，没有 signal 过时无效
    #[inline]
    pub fn last_signaled(&self) -> WaitPoint {
        let value = self.fence_sync.last_value();
        if value == 0 { WaitPoint::invalid() } else { WaitPoint::new(self.fence_sync.fence.clone(), value) }
    }
}

// submit & sync
impl GfxQueue {
    /// 提交命令列表，未 close 的列表会被自动 close
    pub fn execute(&self, mut lists: Vec<GfxCommandList>) -> GfxResult<()> {
        let queue_type = self.queue_type();
        if let Some(list) = lists.iter().find(|list| list.queue_type() != queue_type) {
            return Err(GfxError::QueueTypeMismatch {
                expected: queue_type,
                actual: list.queue_type(),
            });
        }
        if lists.is_empty() {
            return Ok(());
        }

        lists.iter_mut().for_each(GfxCommandList::close);
        log::trace!("queue \"{}\": execute {} command list(s)", self.name, lists.len());
        self.backend.execute_command_lists(lists);
        Ok(())
    }

    /// 递增计数器并在 GPU 上 signal
    pub fn signal(&self) -> WaitPoint {
        let value = self.fence_sync.next_value();
        self.backend.signal(&self.fence_sync.fence, value);
        WaitPoint::new(self.fence_sync.fence.clone(), value)
    }

    /// GPU 侧等待
    ///
    /// 无效的、已经完成的、以及本队列自己 fence 上的 WaitPoint 都直接跳过。
    pub fn wait(&self, wait_point: &WaitPoint) {
        if !wait_point.is_valid() || wait_point.is_completed() {
            return;
        }
        if wait_point.is_on_fence(self.fence_sync.fence.id()) {
            return;
        }
        if let Some(fence) = wait_point.fence() {
            self.backend.wait(fence, wait_point.value());
        }
    }

    /// CPU 阻塞等待
    ///
    /// 超时返回 `false`，调用方自行决定是否跳过这一帧的工作。
    pub fn sync(&self, wait_point: &WaitPoint, timeout_ms: u32) -> bool {
        let Some(fence) = wait_point.fence().filter(|_| wait_point.is_valid()) else {
            return true;
        };
        if fence.completed_value() >= wait_point.value() {
            return true;
        }

        let completed = fence.wait_for_value(wait_point.value(), timeout_ms);
        if !completed {
            log::warn!("queue \"{}\": sync on {:?} timed out after {} ms", self.name, wait_point, timeout_ms);
        }
        completed
    }
}
