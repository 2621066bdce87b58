use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::commands::command_list::GfxCommandList;
use crate::commands::queue::{GfxQueue, GfxQueueType};
use crate::descriptors::descriptor_heap::{
    GfxCpuDescriptorHandle, GfxDescriptorHeapDesc, GfxDescriptorHeapInfo, GfxDescriptorHeapType,
    GfxGpuDescriptorHandle,
};
use crate::device::GfxDevice;
use crate::error::{GfxError, GfxResult};
use crate::headless::queue::{HeadlessGpu, HeadlessQueue};
use crate::resources::resource::{GfxResource, GfxResourceId};
use crate::resources::resource_desc::GfxResourceDesc;
use crate::resources::resource_state::GfxResourceStates;
use crate::resources::view::GfxViewKind;

/// 模拟的资源对齐（与 D3D12 默认的 64KB placement 对齐一致）
const RESOURCE_ALIGNMENT: u64 = 64 * 1024;
const DESCRIPTOR_INCREMENT: u32 = 32;

/// headless 设备配置
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HeadlessDeviceConfig {
    pub name: String,
    pub cbv_srv_uav_heap_capacity: u32,
    pub sampler_heap_capacity: u32,
    pub rtv_heap_capacity: u32,
    pub dsv_heap_capacity: u32,
    /// CPU 最多领先 GPU 的帧数，也是延迟释放的默认帧数
    pub frames_in_flight: u32,
    /// 每次提交后立即推进模拟 GPU
    pub auto_flush: bool,
}

impl Default for HeadlessDeviceConfig {
    fn default() -> Self {
        Self {
            name: "headless".to_string(),
            cbv_srv_uav_heap_capacity: 1024,
            sampler_heap_capacity: 64,
            rtv_heap_capacity: 256,
            dsv_heap_capacity: 64,
            frames_in_flight: 2,
            auto_flush: true,
        }
    }
}

impl HeadlessDeviceConfig {
    /// 四种描述符堆的创建参数，CBV/SRV/UAV 与 sampler 堆 shader visible
    pub fn heap_descs(&self) -> Vec<GfxDescriptorHeapDesc> {
        vec![
            GfxDescriptorHeapDesc::new(GfxDescriptorHeapType::CbvSrvUav, self.cbv_srv_uav_heap_capacity, true),
            GfxDescriptorHeapDesc::new(GfxDescriptorHeapType::Sampler, self.sampler_heap_capacity, true),
            GfxDescriptorHeapDesc::new(GfxDescriptorHeapType::Rtv, self.rtv_heap_capacity, false),
            GfxDescriptorHeapDesc::new(GfxDescriptorHeapType::Dsv, self.dsv_heap_capacity, false),
        ]
    }
}

/// 不依赖 GPU 的设备实现
///
/// 资源只记录描述信息，队列操作由 `flush_gpu` 按顺序模拟执行。
pub struct HeadlessDevice {
    config: HeadlessDeviceConfig,
    gpu: Arc<HeadlessGpu>,

    live_resources: Mutex<HashMap<GfxResourceId, String>>,
    next_resource_id: AtomicU64,
    next_gpu_address: AtomicU64,
    next_heap_id: AtomicU64,
    view_write_count: AtomicU64,
    created_resource_count: AtomicU32,
    fail_next_resource: AtomicBool,
}

// new & init
impl HeadlessDevice {
    pub fn new(config: HeadlessDeviceConfig) -> Arc<Self> {
        log::info!(
            "headless device \"{}\" created: frames in flight {}, auto flush {}",
            config.name,
            config.frames_in_flight,
            config.auto_flush
        );

        Arc::new(Self {
            gpu: HeadlessGpu::new(config.auto_flush),
            config,
            live_resources: Mutex::new(HashMap::new()),
            next_resource_id: AtomicU64::new(1),
            next_gpu_address: AtomicU64::new(RESOURCE_ALIGNMENT),
            next_heap_id: AtomicU64::new(1),
            view_write_count: AtomicU64::new(0),
            created_resource_count: AtomicU32::new(0),
            fail_next_resource: AtomicBool::new(false),
        })
    }

    /// 创建一个 headless 队列，并包装成 `GfxQueue`
    pub fn create_queue(&self, queue_type: GfxQueueType, name: &str) -> GfxResult<Arc<GfxQueue>> {
        let backend = HeadlessQueue::new(queue_type, name, &self.gpu);
        self.gpu.register_queue(backend.clone());
        Ok(Arc::new(GfxQueue::new(backend, name)?))
    }
}

// getters
impl HeadlessDevice {
    #[inline]
    pub fn config(&self) -> &HeadlessDeviceConfig {
        &self.config
    }

    /// 按名字查找队列后端，用于检查提交记录
    pub fn headless_queue(&self, name: &str) -> Option<Arc<HeadlessQueue>> {
        self.gpu.queues().into_iter().find(|queue| queue.name() == name)
    }

    #[inline]
    pub fn live_resource_count(&self) -> usize {
        self.live_resources.lock().len()
    }

    #[inline]
    pub fn created_resource_count(&self) -> u32 {
        self.created_resource_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn view_write_count(&self) -> u64 {
        self.view_write_count.load(Ordering::Relaxed)
    }
}

// tools
impl HeadlessDevice {
    /// 推进模拟 GPU，直到所有队列都执行完或者被 wait 阻塞
    #[inline]
    pub fn flush_gpu(&self) {
        self.gpu.flush();
    }

    /// 下一次 `create_resource` 返回失败
    #[inline]
    pub fn fail_next_resource_creation(&self) {
        self.fail_next_resource.store(true, Ordering::Relaxed);
    }
}

impl GfxDevice for HeadlessDevice {
    #[inline]
    fn name(&self) -> &str {
        &self.config.name
    }

    fn create_resource(
        &self,
        desc: &GfxResourceDesc,
        initial_state: GfxResourceStates,
        name: &str,
    ) -> GfxResult<GfxResource> {
        if self.fail_next_resource.swap(false, Ordering::Relaxed) {
            return Err(GfxError::ResourceCreationFailed {
                name: name.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        if desc.width == 0 || desc.height == 0 || desc.depth_or_array_size == 0 {
            return Err(GfxError::ResourceCreationFailed {
                name: name.to_string(),
                reason: format!("zero sized resource: {}x{}x{}", desc.width, desc.height, desc.depth_or_array_size),
            });
        }

        let id = GfxResourceId(self.next_resource_id.fetch_add(1, Ordering::Relaxed));
        let size = desc.footprint_bytes().div_ceil(RESOURCE_ALIGNMENT) * RESOURCE_ALIGNMENT;
        let address = self.next_gpu_address.fetch_add(size, Ordering::Relaxed);

        self.live_resources.lock().insert(id, name.to_string());
        self.created_resource_count.fetch_add(1, Ordering::Relaxed);
        log::trace!("headless: create resource \"{}\" {:?} in {}", name, id, initial_state.names());

        Ok(GfxResource::new(id, *desc, address, name))
    }

    fn destroy_resource(&self, resource: &GfxResource) {
        if self.live_resources.lock().remove(&resource.id()).is_none() {
            log::error!("headless: destroy unknown resource \"{}\" {:?}", resource.name(), resource.id());
            return;
        }
        log::trace!("headless: destroy resource \"{}\" {:?}", resource.name(), resource.id());
    }

    fn create_descriptor_heap(&self, desc: &GfxDescriptorHeapDesc) -> GfxResult<GfxDescriptorHeapInfo> {
        desc.validate()?;

        // 每个堆占据独立的地址段
        let heap_id = self.next_heap_id.fetch_add(1, Ordering::Relaxed);
        let base = heap_id << 32;
        Ok(GfxDescriptorHeapInfo {
            cpu_base: GfxCpuDescriptorHandle(base),
            gpu_base: desc.shader_visible.then_some(GfxGpuDescriptorHandle(base)),
            increment: DESCRIPTOR_INCREMENT,
        })
    }

    fn write_view(&self, kind: GfxViewKind, resource: &GfxResource, cpu_handle: GfxCpuDescriptorHandle) {
        self.view_write_count.fetch_add(1, Ordering::Relaxed);
        log::trace!("headless: write {:?} of \"{}\" at {:#x}", kind, resource.name(), cpu_handle.0);
    }

    fn create_command_list(&self, queue_type: GfxQueueType, name: &str) -> GfxCommandList {
        GfxCommandList::new(queue_type, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::format::GfxFormat;
    use crate::resources::resource_desc::GfxResourceUsage;

    #[test]
    fn test_resource_lifecycle() {
        let device = HeadlessDevice::new(Default::default());
        let desc = GfxResourceDesc::texture_2d(16, 16, GfxFormat::R8G8B8A8Unorm, GfxResourceUsage::RENDER_TARGET);

        let a = device.create_resource(&desc, GfxResourceStates::COMMON, "a").unwrap();
        let b = device.create_resource(&desc, GfxResourceStates::COMMON, "b").unwrap();
        assert_ne!(a.id(), b.id());
        assert_ne!(a.gpu_virtual_address(), b.gpu_virtual_address());
        assert_eq!(device.live_resource_count(), 2);

        device.destroy_resource(&a);
        assert_eq!(device.live_resource_count(), 1);
        // 重复销毁只记录错误
        device.destroy_resource(&a);
        assert_eq!(device.live_resource_count(), 1);
    }

    #[test]
    fn test_injected_failure() {
        let device = HeadlessDevice::new(Default::default());
        let desc = GfxResourceDesc::buffer(256, 0, GfxResourceUsage::UNORDERED_ACCESS);

        device.fail_next_resource_creation();
        assert!(device.create_resource(&desc, GfxResourceStates::COMMON, "fail").is_err());
        assert!(device.create_resource(&desc, GfxResourceStates::COMMON, "ok").is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let config: HeadlessDeviceConfig = toml::from_str("rtv_heap_capacity = 8\nauto_flush = false").unwrap();
        assert_eq!(config.rtv_heap_capacity, 8);
        assert!(!config.auto_flush);
        assert_eq!(config.frames_in_flight, HeadlessDeviceConfig::default().frames_in_flight);
    }
}
