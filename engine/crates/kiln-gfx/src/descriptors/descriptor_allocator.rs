//! 描述符分配器
//!
//! 每种堆类型一个固定容量的 pool，空闲槽位用栈式 free list 管理，分配与回收都是 O(1)。
//! 分配出的 `GfxDescriptor` 是引用计数句柄，最后一个 clone 被 drop 时槽位自动回到 free list。

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::descriptors::descriptor_heap::{
    GfxCpuDescriptorHandle, GfxDescriptorHeapDesc, GfxDescriptorHeapInfo, GfxDescriptorHeapType,
    GfxGpuDescriptorHandle,
};
use crate::device::GfxDevice;
use crate::error::{GfxError, GfxResult};

struct GfxDescriptorPoolInner {
    desc: GfxDescriptorHeapDesc,
    heap: GfxDescriptorHeapInfo,
    /// 空闲槽位栈，多个线程可能同时分配
    free_list: Mutex<Vec<u32>>,
}

impl GfxDescriptorPoolInner {
    #[inline]
    fn release(&self, index: u32) {
        let mut free_list = self.free_list.lock();
        debug_assert!(!free_list.contains(&index), "descriptor slot {index} released twice");
        free_list.push(index);
    }
}

/// 单个描述符堆上的 pool
///
/// Clone 之后共享同一个堆。
#[derive(Clone)]
pub struct GfxDescriptorPool {
    inner: Arc<GfxDescriptorPoolInner>,
}

// new & init
impl GfxDescriptorPool {
    pub fn new(device: &dyn GfxDevice, desc: GfxDescriptorHeapDesc) -> GfxResult<Self> {
        desc.validate()?;
        let heap = device.create_descriptor_heap(&desc)?;

        // 倒序入栈，保证先分配到低位槽位
        let free_list = (0..desc.capacity).rev().collect();

        log::debug!(
            "descriptor pool created: {:?}, capacity {}, shader visible {}",
            desc.ty,
            desc.capacity,
            desc.shader_visible
        );

        Ok(Self {
            inner: Arc::new(GfxDescriptorPoolInner {
                desc,
                heap,
                free_list: Mutex::new(free_list),
            }),
        })
    }
}

// alloc & free
impl GfxDescriptorPool {
    /// 从 free list 弹出一个槽位
    ///
    /// 堆容量固定，耗尽时返回 `DescriptorHeapExhausted`。
    pub fn alloc(&self) -> GfxResult<GfxDescriptor> {
        let index = self.inner.free_list.lock().pop();
        let Some(index) = index else {
            log::error!("descriptor heap {:?} exhausted, capacity {}", self.inner.desc.ty, self.inner.desc.capacity);
            return Err(GfxError::DescriptorHeapExhausted {
                heap_type: self.inner.desc.ty,
                capacity: self.inner.desc.capacity,
            });
        };

        Ok(GfxDescriptor {
            slot: Arc::new(DescriptorSlot {
                pool: self.inner.clone(),
                index,
            }),
        })
    }

    /// 归还描述符
    ///
    /// 只有最后一个引用被归还时槽位才会回到 free list。
    #[inline]
    pub fn free(&self, descriptor: GfxDescriptor) {
        debug_assert!(Arc::ptr_eq(&descriptor.slot.pool, &self.inner), "descriptor freed to a foreign pool");
        drop(descriptor);
    }
}

// getters
impl GfxDescriptorPool {
    #[inline]
    pub fn heap_type(&self) -> GfxDescriptorHeapType {
        self.inner.desc.ty
    }

    #[inline]
    pub fn is_shader_visible(&self) -> bool {
        self.inner.desc.shader_visible
    }

    #[inline]
    pub fn handle_count(&self) -> u32 {
        self.inner.desc.capacity
    }

    #[inline]
    pub fn available_count(&self) -> u32 {
        self.inner.free_list.lock().len() as u32
    }

    /// 已分配数量，与 `available_count` 的和恒等于 `handle_count`
    #[inline]
    pub fn allocated_count(&self) -> u32 {
        self.handle_count() - self.available_count()
    }
}

struct DescriptorSlot {
    pool: Arc<GfxDescriptorPoolInner>,
    index: u32,
}

impl Drop for DescriptorSlot {
    fn drop(&mut self) {
        self.pool.release(self.index);
    }
}

/// 描述符句柄
///
/// Clone 只增加引用计数，所有 clone 指向同一个槽位。
#[derive(Clone)]
pub struct GfxDescriptor {
    slot: Arc<DescriptorSlot>,
}

impl GfxDescriptor {
    #[inline]
    pub fn index(&self) -> u32 {
        self.slot.index
    }

    #[inline]
    pub fn heap_type(&self) -> GfxDescriptorHeapType {
        self.slot.pool.desc.ty
    }

    #[inline]
    pub fn cpu_handle(&self) -> GfxCpuDescriptorHandle {
        let heap = &self.slot.pool.heap;
        heap.cpu_base.offset(self.slot.index, heap.increment)
    }

    /// 只有 shader visible 的堆才有 GPU 句柄
    #[inline]
    pub fn gpu_handle(&self) -> Option<GfxGpuDescriptorHandle> {
        let heap = &self.slot.pool.heap;
        heap.gpu_base.map(|base| base.offset(self.slot.index, heap.increment))
    }

    #[inline]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.slot)
    }

    /// 显式释放当前引用
    #[inline]
    pub fn free(self) {
        drop(self);
    }
}

impl fmt::Debug for GfxDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GfxDescriptor")
            .field("heap_type", &self.heap_type())
            .field("index", &self.index())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

/// 描述符分配器，每种堆类型一个 pool
pub struct GfxDescriptorAllocator {
    pools: [Option<GfxDescriptorPool>; 4],
}

// new & init
impl GfxDescriptorAllocator {
    /// 每种堆类型最多一个 desc，没有提供的类型不能分配
    pub fn new(device: &dyn GfxDevice, descs: &[GfxDescriptorHeapDesc]) -> GfxResult<Self> {
        let mut pools: [Option<GfxDescriptorPool>; 4] = Default::default();
        for desc in descs {
            let slot = &mut pools[desc.ty.index()];
            if slot.is_some() {
                return Err(GfxError::InvalidDescriptorHeapDesc(format!("duplicated {:?} heap", desc.ty)));
            }
            *slot = Some(GfxDescriptorPool::new(device, *desc)?);
        }
        Ok(Self { pools })
    }
}

// tools
impl GfxDescriptorAllocator {
    pub fn alloc(&self, ty: GfxDescriptorHeapType) -> GfxResult<GfxDescriptor> {
        match self.pool(ty) {
            Some(pool) => pool.alloc(),
            None => Err(GfxError::InvalidDescriptorHeapDesc(format!("no {ty:?} heap configured"))),
        }
    }

    #[inline]
    pub fn pool(&self, ty: GfxDescriptorHeapType) -> Option<&GfxDescriptorPool> {
        self.pools[ty.index()].as_ref()
    }
}
