use crate::error::{GfxError, GfxResult};

/// 描述符堆类型，与 `D3D12_DESCRIPTOR_HEAP_TYPE` 一一对应
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum GfxDescriptorHeapType {
    CbvSrvUav,
    Sampler,
    Rtv,
    Dsv,
}

impl GfxDescriptorHeapType {
    pub const ALL: [Self; 4] = [Self::CbvSrvUav, Self::Sampler, Self::Rtv, Self::Dsv];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::CbvSrvUav => 0,
            Self::Sampler => 1,
            Self::Rtv => 2,
            Self::Dsv => 3,
        }
    }

    /// RTV / DSV 堆不能是 shader visible 的
    #[inline]
    pub const fn can_be_shader_visible(self) -> bool {
        matches!(self, Self::CbvSrvUav | Self::Sampler)
    }
}

/// CPU 描述符句柄，始终有效
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct GfxCpuDescriptorHandle(pub u64);

/// GPU 描述符句柄，只有 shader visible 的堆才有
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct GfxGpuDescriptorHandle(pub u64);

impl GfxCpuDescriptorHandle {
    #[inline]
    pub fn offset(self, index: u32, increment: u32) -> Self {
        Self(self.0 + index as u64 * increment as u64)
    }
}

impl GfxGpuDescriptorHandle {
    #[inline]
    pub fn offset(self, index: u32, increment: u32) -> Self {
        Self(self.0 + index as u64 * increment as u64)
    }
}

/// 描述符堆的创建参数
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GfxDescriptorHeapDesc {
    pub ty: GfxDescriptorHeapType,
    pub capacity: u32,
    #[serde(default)]
    pub shader_visible: bool,
}

impl GfxDescriptorHeapDesc {
    #[inline]
    pub fn new(ty: GfxDescriptorHeapType, capacity: u32, shader_visible: bool) -> Self {
        Self {
            ty,
            capacity,
            shader_visible,
        }
    }

    pub fn validate(&self) -> GfxResult<()> {
        if self.capacity == 0 {
            return Err(GfxError::InvalidDescriptorHeapDesc(format!("{:?} heap with zero capacity", self.ty)));
        }
        if self.shader_visible && !self.ty.can_be_shader_visible() {
            return Err(GfxError::InvalidDescriptorHeapDesc(format!("{:?} heap can not be shader visible", self.ty)));
        }
        Ok(())
    }
}

/// 设备创建描述符堆后返回的信息
#[derive(Clone, Copy, Debug)]
pub struct GfxDescriptorHeapInfo {
    pub cpu_base: GfxCpuDescriptorHandle,
    pub gpu_base: Option<GfxGpuDescriptorHandle>,
    /// 相邻两个描述符之间的字节距离
    pub increment: u32,
}
