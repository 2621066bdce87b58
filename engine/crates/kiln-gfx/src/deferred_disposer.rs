//! 延迟释放队列
//!
//! 本帧不再使用的 GPU 对象可能仍被之前几帧提交的命令列表引用，
//! 需要等待若干个帧边界之后才能真正释放。

struct DeferredEntry<T> {
    object: T,
    /// 剩余帧数
    remaining: u32,
}

/// "N 帧之后释放" 队列
///
/// 每个帧边界调用一次 `tick`；lifetime 为 N 的对象恰好在第 N 次 `tick` 时被释放。
pub struct DeferredDisposer<T> {
    entries: Vec<DeferredEntry<T>>,
    /// 默认延迟帧数，通常等于 frames in flight
    default_lifetime: u32,
}

// new & init
impl<T> DeferredDisposer<T> {
    pub fn new(default_lifetime: u32) -> Self {
        Self {
            entries: Vec::new(),
            default_lifetime,
        }
    }
}

// getters
impl<T> DeferredDisposer<T> {
    #[inline]
    pub fn default_lifetime(&self) -> u32 {
        self.default_lifetime
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// update
impl<T> DeferredDisposer<T> {
    /// lifetime 为 0 时立即释放
    pub fn push(&mut self, object: T, lifetime: u32) {
        if lifetime == 0 {
            drop(object);
            return;
        }
        self.entries.push(DeferredEntry {
            object,
            remaining: lifetime,
        });
    }

    #[inline]
    pub fn push_default(&mut self, object: T) {
        self.push(object, self.default_lifetime);
    }

    /// 帧边界：所有条目减一，到期的直接 drop
    pub fn tick(&mut self) {
        self.tick_with(drop);
    }

    /// 帧边界：所有条目减一，到期的对象交给 `release` 销毁
    pub fn tick_with(&mut self, mut release: impl FnMut(T)) {
        kiln_crate_tools::profile_scope!("DeferredDisposer::tick");

        if self.entries.is_empty() {
            return;
        }

        for entry in &mut self.entries {
            entry.remaining -= 1;
        }

        let (expired, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.entries).into_iter().partition(|entry| entry.remaining == 0);
        self.entries = pending;

        if !expired.is_empty() {
            log::debug!("deferred disposer: release {} object(s), {} pending", expired.len(), self.entries.len());
        }
        expired.into_iter().for_each(|entry| release(entry.object));
    }

    /// 释放所有对象，只能在确认 GPU 空闲后调用
    pub fn flush_with(&mut self, release: impl FnMut(T)) {
        std::mem::take(&mut self.entries).into_iter().map(|entry| entry.object).for_each(release);
    }
}

impl<T> Drop for DeferredDisposer<T> {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            log::warn!("deferred disposer dropped with {} pending object(s)", self.entries.len());
        }
    }
}
