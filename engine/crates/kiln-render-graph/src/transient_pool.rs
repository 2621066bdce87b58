//! 临时资源池
//!
//! 跨帧复用 graph 创建的物理资源：描述完全相同时直接复用，
//! 长时间不用的资源交给 `DeferredDisposer`，等 GPU 不再引用后销毁。

use kiln_gfx::GfxResult;
use kiln_gfx::deferred_disposer::DeferredDisposer;
use kiln_gfx::device::GfxDevice;
use kiln_gfx::resources::resource::GfxResource;
use kiln_gfx::resources::resource_desc::GfxResourceDesc;
use kiln_gfx::resources::resource_state::GfxResourceStates;
use kiln_gfx::resources::view::{GfxResourceViews, GfxViewFactory};

pub(crate) struct RgTransientEntry {
    pub resource: GfxResource,
    pub views: GfxResourceViews,
    /// 上一帧执行结束时的状态
    pub state: GfxResourceStates,
    pub last_used_frame: u64,
    /// 本帧是否已被分配
    pub taken: bool,
}

/// 等待销毁的物理资源，view 随之释放描述符
struct RgRetiredResource {
    resource: GfxResource,
    _views: GfxResourceViews,
}

pub struct RgTransientPool {
    entries: Vec<RgTransientEntry>,
    disposer: DeferredDisposer<RgRetiredResource>,
    retire_frames: u32,
}

// new & init
impl RgTransientPool {
    pub fn new(retire_frames: u32, frames_in_flight: u32) -> Self {
        Self {
            entries: Vec::new(),
            disposer: DeferredDisposer::new(frames_in_flight),
            retire_frames,
        }
    }
}

// getters
impl RgTransientPool {
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 已回收但还没销毁的资源数量
    #[inline]
    pub fn pending_release_count(&self) -> usize {
        self.disposer.len()
    }

    #[inline]
    pub(crate) fn entry(&self, slot: usize) -> &RgTransientEntry {
        &self.entries[slot]
    }
}

// update
impl RgTransientPool {
    /// 分配一个物理资源，返回池中的位置
    ///
    /// 优先复用本帧未分配、描述完全相同的资源。
    pub(crate) fn acquire(
        &mut self,
        device: &dyn GfxDevice,
        view_factory: &GfxViewFactory,
        desc: &GfxResourceDesc,
        name: &str,
        frame: u64,
    ) -> GfxResult<usize> {
        if let Some(slot) = self.entries.iter().position(|e| !e.taken && e.resource.desc() == desc) {
            let entry = &mut self.entries[slot];
            entry.taken = true;
            entry.last_used_frame = frame;
            return Ok(slot);
        }

        let resource = device.create_resource(desc, GfxResourceStates::COMMON, name)?;
        let views = match view_factory.create_views_for_usage(&resource) {
            Ok(views) => views,
            Err(err) => {
                device.destroy_resource(&resource);
                return Err(err);
            }
        };
        log::debug!("transient pool: create \"{}\" {:?} ({} entries)", name, resource.id(), self.entries.len() + 1);

        self.entries.push(RgTransientEntry {
            resource,
            views,
            state: GfxResourceStates::COMMON,
            last_used_frame: frame,
            taken: true,
        });
        Ok(self.entries.len() - 1)
    }

    #[inline]
    pub(crate) fn set_state(&mut self, slot: usize, state: GfxResourceStates) {
        self.entries[slot].state = state;
    }

    /// 归还本帧分配的所有资源
    pub(crate) fn release_taken(&mut self) {
        self.entries.iter_mut().for_each(|e| e.taken = false);
    }

    /// 帧边界：回收长时间未使用的资源，推进延迟释放队列
    pub(crate) fn end_frame(&mut self, device: &dyn GfxDevice, frame: u64) {
        let retire_frames = self.retire_frames as u64;
        let (retired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| !e.taken && frame.saturating_sub(e.last_used_frame) >= retire_frames);
        self.entries = kept;

        for entry in retired {
            log::debug!(
                "transient pool: retire {:?} \"{}\", unused since frame {}",
                entry.resource.id(),
                entry.resource.name(),
                entry.last_used_frame
            );
            self.retire(entry);
        }

        self.disposer.tick_with(|retired| device.destroy_resource(&retired.resource));
    }

    /// 本帧分配的资源状态未知（提交中途失败），不再复用，延迟销毁
    pub(crate) fn discard_taken(&mut self) {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries).into_iter().partition(|e| e.taken);
        self.entries = kept;

        for entry in taken {
            log::warn!(
                "transient pool: discard {:?} \"{}\", state unknown after failed submission",
                entry.resource.id(),
                entry.resource.name()
            );
            self.retire(entry);
        }
    }

    /// 销毁所有资源，只能在 GPU 空闲后调用
    pub(crate) fn destroy_all(&mut self, device: &dyn GfxDevice) {
        self.disposer.flush_with(|retired| device.destroy_resource(&retired.resource));
        for entry in std::mem::take(&mut self.entries) {
            device.destroy_resource(&entry.resource);
        }
    }
}

// tools
impl RgTransientPool {
    fn retire(&mut self, entry: RgTransientEntry) {
        self.disposer.push_default(RgRetiredResource {
            resource: entry.resource,
            _views: entry.views,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use kiln_gfx::basic::format::GfxFormat;
    use kiln_gfx::descriptors::descriptor_allocator::GfxDescriptorAllocator;
    use kiln_gfx::headless::{HeadlessDevice, HeadlessDeviceConfig};
    use kiln_gfx::resources::resource_desc::GfxResourceUsage;

    use super::*;

    fn setup() -> (Arc<HeadlessDevice>, GfxViewFactory) {
        let device = HeadlessDevice::new(HeadlessDeviceConfig::default());
        let allocator = GfxDescriptorAllocator::new(&*device, &device.config().heap_descs()).unwrap();
        let factory = GfxViewFactory::new(device.clone(), Arc::new(allocator));
        (device, factory)
    }

    fn desc() -> GfxResourceDesc {
        GfxResourceDesc::texture_2d(
            32,
            32,
            GfxFormat::R16G16B16A16Float,
            GfxResourceUsage::RENDER_TARGET | GfxResourceUsage::SHADER_RESOURCE,
        )
    }

    #[test]
    fn test_reuse_across_frames() {
        let (device, factory) = setup();
        let mut pool = RgTransientPool::new(4, 2);

        let a = pool.acquire(&*device, &factory, &desc(), "a", 0).unwrap();
        // 同一帧内不会重复分配
        let b = pool.acquire(&*device, &factory, &desc(), "b", 0).unwrap();
        assert_ne!(a, b);
        assert_eq!(device.live_resource_count(), 2);

        pool.release_taken();
        pool.end_frame(&*device, 0);

        let c = pool.acquire(&*device, &factory, &desc(), "c", 1).unwrap();
        assert_eq!(c, a);
        assert_eq!(device.created_resource_count(), 2);
        pool.release_taken();
        pool.destroy_all(&*device);
        assert_eq!(device.live_resource_count(), 0);
    }

    #[test]
    fn test_retire_after_idle_frames() {
        let (device, factory) = setup();
        let mut pool = RgTransientPool::new(2, 1);

        pool.acquire(&*device, &factory, &desc(), "a", 0).unwrap();
        pool.release_taken();

        pool.end_frame(&*device, 1);
        assert_eq!(pool.len(), 1);

        // 第 2 帧回收，延迟 1 帧，在同一次 tick 中销毁
        pool.end_frame(&*device, 2);
        assert_eq!(pool.len(), 0);
        assert_eq!(pool.pending_release_count(), 0);
        assert_eq!(device.live_resource_count(), 0);
    }

    #[test]
    fn test_creation_failure() {
        let (device, factory) = setup();
        let mut pool = RgTransientPool::new(2, 1);

        device.fail_next_resource_creation();
        assert!(pool.acquire(&*device, &factory, &desc(), "a", 0).is_err());
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn test_discard_taken_after_failed_frame() {
        let (device, factory) = setup();
        let mut pool = RgTransientPool::new(4, 1);

        let a = pool.acquire(&*device, &factory, &desc(), "a", 0).unwrap();
        pool.set_state(a, GfxResourceStates::RENDER_TARGET);
        pool.release_taken();
        pool.end_frame(&*device, 0);

        // 第 1 帧复用 a 后提交失败，a 的状态未知
        let b = pool.acquire(&*device, &factory, &desc(), "b", 1).unwrap();
        assert_eq!(b, a);
        pool.discard_taken();
        assert_eq!(pool.len(), 0);
        assert_eq!(pool.pending_release_count(), 1);
        assert_eq!(device.live_resource_count(), 1);

        pool.end_frame(&*device, 1);
        assert_eq!(device.live_resource_count(), 0);

        // 之后的帧重新创建，从 COMMON 开始
        let c = pool.acquire(&*device, &factory, &desc(), "c", 2).unwrap();
        assert_eq!(pool.entry(c).state, GfxResourceStates::COMMON);
        assert_eq!(device.created_resource_count(), 2);
        pool.release_taken();
        pool.destroy_all(&*device);
    }
}
