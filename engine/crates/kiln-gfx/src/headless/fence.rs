use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::commands::fence::GfxFence;

/// headless 后端的 fence
///
/// 值由模拟 GPU 在处理 signal 操作时设置，CPU 通过条件变量等待。
pub struct HeadlessFence {
    id: u64,
    value: Mutex<u64>,
    cond: Condvar,
}

impl HeadlessFence {
    pub fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            id,
            value: Mutex::new(0),
            cond: Condvar::new(),
        })
    }

    /// 模拟 GPU signal，值只增不减
    pub(crate) fn set_value(&self, value: u64) {
        let mut crt = self.value.lock();
        if value > *crt {
            *crt = value;
            self.cond.notify_all();
        }
    }
}

impl GfxFence for HeadlessFence {
    #[inline]
    fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    fn completed_value(&self) -> u64 {
        *self.value.lock()
    }

    fn wait_for_value(&self, value: u64, timeout_ms: u32) -> bool {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms as u64);
        let mut crt = self.value.lock();
        while *crt < value {
            if self.cond.wait_until(&mut crt, deadline).timed_out() {
                return *crt >= value;
            }
        }
        true
    }
}
