use std::fmt;

use crate::resources::resource_desc::GfxResourceDesc;

/// 物理资源 ID，由设备分配，在设备生命周期内唯一
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GfxResourceId(pub u64);

impl fmt::Debug for GfxResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GfxResource#{}", self.0)
    }
}

/// 已经创建的物理资源
///
/// 只是对原生对象的描述，可以随意 Clone；销毁需要调用 `GfxDevice::destroy_resource`。
#[derive(Clone, Debug)]
pub struct GfxResource {
    id: GfxResourceId,
    desc: GfxResourceDesc,
    gpu_virtual_address: u64,
    name: String,
}

// new & init
impl GfxResource {
    pub fn new(id: GfxResourceId, desc: GfxResourceDesc, gpu_virtual_address: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            desc,
            gpu_virtual_address,
            name: name.into(),
        }
    }
}

// getters
impl GfxResource {
    #[inline]
    pub fn id(&self) -> GfxResourceId {
        self.id
    }

    #[inline]
    pub fn desc(&self) -> &GfxResourceDesc {
        &self.desc
    }

    #[inline]
    pub fn gpu_virtual_address(&self) -> u64 {
        self.gpu_virtual_address
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}
