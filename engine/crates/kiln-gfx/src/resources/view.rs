use std::sync::Arc;

use crate::descriptors::descriptor_allocator::{GfxDescriptor, GfxDescriptorAllocator};
use crate::descriptors::descriptor_heap::{GfxCpuDescriptorHandle, GfxDescriptorHeapType, GfxGpuDescriptorHandle};
use crate::device::GfxDevice;
use crate::error::{GfxError, GfxResult};
use crate::resources::resource::{GfxResource, GfxResourceId};
use crate::resources::resource_desc::{GfxResourceDesc, GfxResourceUsage};

/// view 类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GfxViewKind {
    Srv,
    Uav,
    Rtv,
    Dsv,
}

impl GfxViewKind {
    #[inline]
    pub const fn heap_type(self) -> GfxDescriptorHeapType {
        match self {
            Self::Srv | Self::Uav => GfxDescriptorHeapType::CbvSrvUav,
            Self::Rtv => GfxDescriptorHeapType::Rtv,
            Self::Dsv => GfxDescriptorHeapType::Dsv,
        }
    }

    /// 创建该类型 view 需要资源具备的 usage
    #[inline]
    pub const fn required_usage(self) -> GfxResourceUsage {
        match self {
            Self::Srv => GfxResourceUsage::SHADER_RESOURCE,
            Self::Uav => GfxResourceUsage::UNORDERED_ACCESS,
            Self::Rtv => GfxResourceUsage::RENDER_TARGET,
            Self::Dsv => GfxResourceUsage::DEPTH_STENCIL,
        }
    }
}

/// 资源 view
///
/// 持有一个描述符引用，最后一个 clone 被 drop 时描述符回到 pool。
#[derive(Clone, Debug)]
pub struct GfxView {
    kind: GfxViewKind,
    descriptor: GfxDescriptor,
    resource_id: GfxResourceId,
    desc: GfxResourceDesc,
}

// getters
impl GfxView {
    #[inline]
    pub fn kind(&self) -> GfxViewKind {
        self.kind
    }

    #[inline]
    pub fn descriptor(&self) -> &GfxDescriptor {
        &self.descriptor
    }

    #[inline]
    pub fn cpu_handle(&self) -> GfxCpuDescriptorHandle {
        self.descriptor.cpu_handle()
    }

    #[inline]
    pub fn gpu_handle(&self) -> Option<GfxGpuDescriptorHandle> {
        self.descriptor.gpu_handle()
    }

    #[inline]
    pub fn resource_id(&self) -> GfxResourceId {
        self.resource_id
    }

    /// 原始资源的描述
    #[inline]
    pub fn desc(&self) -> &GfxResourceDesc {
        &self.desc
    }
}

/// 一个资源上的全部 view
#[derive(Clone, Debug, Default)]
pub struct GfxResourceViews {
    pub rtv: Option<GfxView>,
    pub dsv: Option<GfxView>,
    pub srv: Option<GfxView>,
    pub uav: Option<GfxView>,
}

impl GfxResourceViews {
    #[inline]
    pub fn get(&self, kind: GfxViewKind) -> Option<&GfxView> {
        match kind {
            GfxViewKind::Srv => self.srv.as_ref(),
            GfxViewKind::Uav => self.uav.as_ref(),
            GfxViewKind::Rtv => self.rtv.as_ref(),
            GfxViewKind::Dsv => self.dsv.as_ref(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rtv.is_none() && self.dsv.is_none() && self.srv.is_none() && self.uav.is_none()
    }
}

/// 创建 view 的工厂
///
/// 从分配器中取描述符，再让设备把 view 写入描述符槽位。
pub struct GfxViewFactory {
    device: Arc<dyn GfxDevice>,
    allocator: Arc<GfxDescriptorAllocator>,
}

// new & init
impl GfxViewFactory {
    pub fn new(device: Arc<dyn GfxDevice>, allocator: Arc<GfxDescriptorAllocator>) -> Self {
        Self { device, allocator }
    }
}

// getters
impl GfxViewFactory {
    #[inline]
    pub fn device(&self) -> &Arc<dyn GfxDevice> {
        &self.device
    }

    #[inline]
    pub fn allocator(&self) -> &Arc<GfxDescriptorAllocator> {
        &self.allocator
    }
}

// create
impl GfxViewFactory {
    #[inline]
    pub fn create_shader_resource_view(&self, resource: &GfxResource) -> GfxResult<GfxView> {
        self.create_view(resource, GfxViewKind::Srv)
    }

    #[inline]
    pub fn create_unordered_access_view(&self, resource: &GfxResource) -> GfxResult<GfxView> {
        self.create_view(resource, GfxViewKind::Uav)
    }

    #[inline]
    pub fn create_render_target_view(&self, resource: &GfxResource) -> GfxResult<GfxView> {
        self.create_view(resource, GfxViewKind::Rtv)
    }

    #[inline]
    pub fn create_depth_stencil_view(&self, resource: &GfxResource) -> GfxResult<GfxView> {
        self.create_view(resource, GfxViewKind::Dsv)
    }

    /// 按资源 usage 创建所有允许的 view
    pub fn create_views_for_usage(&self, resource: &GfxResource) -> GfxResult<GfxResourceViews> {
        let usage = resource.desc().usage;
        let create_if = |kind: GfxViewKind| -> GfxResult<Option<GfxView>> {
            if usage.contains(kind.required_usage()) { self.create_view(resource, kind).map(Some) } else { Ok(None) }
        };

        Ok(GfxResourceViews {
            rtv: create_if(GfxViewKind::Rtv)?,
            dsv: create_if(GfxViewKind::Dsv)?,
            srv: create_if(GfxViewKind::Srv)?,
            uav: create_if(GfxViewKind::Uav)?,
        })
    }

    fn create_view(&self, resource: &GfxResource, kind: GfxViewKind) -> GfxResult<GfxView> {
        if !resource.desc().usage.contains(kind.required_usage()) {
            return Err(GfxError::UnsupportedViewKind {
                name: resource.name().to_string(),
                kind,
            });
        }

        let descriptor = self.allocator.alloc(kind.heap_type())?;
        self.device.write_view(kind, resource, descriptor.cpu_handle());

        Ok(GfxView {
            kind,
            descriptor,
            resource_id: resource.id(),
            desc: *resource.desc(),
        })
    }
}
