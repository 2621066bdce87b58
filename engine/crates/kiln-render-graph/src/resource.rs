//! Pass Graph 资源定义
//!
//! 资源分两种：
//! - `Created`：在某个 Pass 的 setup 中创建的临时资源，编译时分配物理资源
//! - `Imported`：外部拥有的物理资源（如 back buffer），graph 只借用，从不销毁

use kiln_gfx::basic::format::GfxFormat;
use kiln_gfx::commands::queue::GfxQueueType;
use kiln_gfx::resources::resource::GfxResource;
use kiln_gfx::resources::resource_desc::{GfxClearValue, GfxResourceDesc, GfxResourceUsage};
use kiln_gfx::resources::resource_state::GfxResourceStates;
use kiln_gfx::resources::view::{GfxResourceViews, GfxViewKind};

/// 资源第一次使用时的初始化策略
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum RgInitPolicy {
    /// 内容未定义，第一次使用必须是写
    #[default]
    DontCare,
    /// 第一次使用之前清除
    Clear(GfxClearValue),
}

/// 逻辑资源描述
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassResourceDesc {
    pub gfx: GfxResourceDesc,
    pub init: RgInitPolicy,
}

impl PassResourceDesc {
    #[inline]
    pub fn new(gfx: GfxResourceDesc) -> Self {
        Self {
            gfx,
            init: RgInitPolicy::DontCare,
        }
    }

    #[inline]
    pub fn texture_2d(width: u32, height: u32, format: GfxFormat, usage: GfxResourceUsage) -> Self {
        Self::new(GfxResourceDesc::texture_2d(width, height, format, usage))
    }

    #[inline]
    pub fn buffer(size: u64, stride: u32, usage: GfxResourceUsage) -> Self {
        Self::new(GfxResourceDesc::buffer(size, stride, usage))
    }

    #[inline]
    pub fn with_clear(mut self, value: GfxClearValue) -> Self {
        self.init = RgInitPolicy::Clear(value);
        self
    }

    #[inline]
    pub fn clear_value(&self) -> Option<GfxClearValue> {
        match self.init {
            RgInitPolicy::Clear(value) => Some(value),
            RgInitPolicy::DontCare => None,
        }
    }
}

/// Pass 对资源的访问方式，决定需要的资源状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgAccess {
    RenderTarget,
    DepthWrite,
    DepthRead,
    UnorderedAccess,
    ShaderRead,
    CopySource,
    CopyDest,
    Present,
}

impl RgAccess {
    /// 该访问方式需要的资源状态
    ///
    /// compute 队列上不能使用 `PIXEL_SHADER_RESOURCE`。
    pub fn state(self, queue_type: GfxQueueType) -> GfxResourceStates {
        match self {
            Self::RenderTarget => GfxResourceStates::RENDER_TARGET,
            Self::DepthWrite => GfxResourceStates::DEPTH_WRITE,
            Self::DepthRead => GfxResourceStates::DEPTH_READ,
            Self::UnorderedAccess => GfxResourceStates::UNORDERED_ACCESS,
            Self::ShaderRead => match queue_type {
                GfxQueueType::Graphics => GfxResourceStates::ALL_SHADER_RESOURCE,
                GfxQueueType::Compute | GfxQueueType::Copy => GfxResourceStates::NON_PIXEL_SHADER_RESOURCE,
            },
            Self::CopySource => GfxResourceStates::COPY_SOURCE,
            Self::CopyDest => GfxResourceStates::COPY_DEST,
            Self::Present => GfxResourceStates::PRESENT,
        }
    }

    #[inline]
    pub fn is_write(self) -> bool {
        matches!(self, Self::RenderTarget | Self::DepthWrite | Self::UnorderedAccess | Self::CopyDest)
    }

    /// 只能在 graphics 队列上使用的访问方式
    #[inline]
    pub fn is_graphics_only(self) -> bool {
        matches!(self, Self::RenderTarget | Self::DepthWrite | Self::DepthRead | Self::Present)
    }

    /// 资源需要声明的 usage
    #[inline]
    pub fn required_usage(self) -> GfxResourceUsage {
        match self {
            Self::RenderTarget => GfxResourceUsage::RENDER_TARGET,
            Self::DepthWrite | Self::DepthRead => GfxResourceUsage::DEPTH_STENCIL,
            Self::UnorderedAccess => GfxResourceUsage::UNORDERED_ACCESS,
            Self::ShaderRead => GfxResourceUsage::SHADER_RESOURCE,
            Self::CopySource | Self::CopyDest | Self::Present => GfxResourceUsage::empty(),
        }
    }

    /// 写入时按 usage 推断访问方式：依次尝试 RT、DS、UAV
    pub fn infer_write(usage: GfxResourceUsage) -> Option<Self> {
        if usage.contains(GfxResourceUsage::RENDER_TARGET) {
            Some(Self::RenderTarget)
        } else if usage.contains(GfxResourceUsage::DEPTH_STENCIL) {
            Some(Self::DepthWrite)
        } else if usage.contains(GfxResourceUsage::UNORDERED_ACCESS) {
            Some(Self::UnorderedAccess)
        } else {
            None
        }
    }

    /// 读取时按 usage 推断访问方式：只有 depth stencil usage 的深度资源按 depth read，否则按 shader read
    pub fn infer_read(usage: GfxResourceUsage, format: GfxFormat) -> Self {
        if format.is_depth()
            && usage.contains(GfxResourceUsage::DEPTH_STENCIL)
            && !usage.contains(GfxResourceUsage::SHADER_RESOURCE)
        {
            Self::DepthRead
        } else {
            Self::ShaderRead
        }
    }
}

impl std::fmt::Display for RgAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// 资源清除时使用的 view 与状态
pub(crate) fn clear_target(desc: &PassResourceDesc) -> Result<(GfxViewKind, GfxResourceStates), String> {
    let Some(value) = desc.clear_value() else {
        return Err("no clear value".to_string());
    };
    let usage = desc.gfx.usage;
    let is_depth = desc.gfx.format.is_depth();

    if value.is_depth_stencil() != is_depth {
        return Err(format!("clear value {:?} does not match format {}", value, desc.gfx.format));
    }
    if is_depth && usage.contains(GfxResourceUsage::DEPTH_STENCIL) {
        return Ok((GfxViewKind::Dsv, GfxResourceStates::DEPTH_WRITE));
    }
    if usage.contains(GfxResourceUsage::RENDER_TARGET) {
        return Ok((GfxViewKind::Rtv, GfxResourceStates::RENDER_TARGET));
    }
    if usage.contains(GfxResourceUsage::UNORDERED_ACCESS) {
        return Ok((GfxViewKind::Uav, GfxResourceStates::UNORDERED_ACCESS));
    }
    Err(format!("usage {:?} has no clearable view", usage))
}

/// 导入的外部资源
#[derive(Clone, Debug)]
pub struct RgImportedResource {
    pub resource: GfxResource,
    pub views: GfxResourceViews,
}

#[derive(Clone, Debug)]
pub enum RgResourceKind {
    Created,
    Imported(RgImportedResource),
}

/// 资源在编译后执行顺序中的存活区间（闭区间，执行顺序中的位置）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgLifetime {
    pub first: usize,
    pub last: usize,
}

impl RgLifetime {
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.first <= other.last && other.first <= self.last
    }
}

/// 资源注册表中的条目
#[derive(Clone, Debug)]
pub struct RgResourceEntry {
    pub name: String,
    pub desc: PassResourceDesc,
    pub kind: RgResourceKind,
    /// 导入时的状态；创建的资源从物理资源当前状态开始
    pub initial_state: GfxResourceStates,
    /// graph 执行完之后需要转换到的状态
    pub final_state: Option<GfxResourceStates>,
}

impl RgResourceEntry {
    pub fn created(name: impl Into<String>, desc: PassResourceDesc) -> Self {
        Self {
            name: name.into(),
            desc,
            kind: RgResourceKind::Created,
            initial_state: GfxResourceStates::COMMON,
            final_state: None,
        }
    }

    pub fn imported(
        name: impl Into<String>,
        resource: GfxResource,
        state: GfxResourceStates,
        views: GfxResourceViews,
    ) -> Self {
        Self {
            name: name.into(),
            desc: PassResourceDesc::new(*resource.desc()),
            kind: RgResourceKind::Imported(RgImportedResource { resource, views }),
            initial_state: state,
            final_state: None,
        }
    }

    #[inline]
    pub fn is_imported(&self) -> bool {
        matches!(self.kind, RgResourceKind::Imported(_))
    }

    #[inline]
    pub fn imported_resource(&self) -> Option<&RgImportedResource> {
        match &self.kind {
            RgResourceKind::Imported(imported) => Some(imported),
            RgResourceKind::Created => None,
        }
    }
}
