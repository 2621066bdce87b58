use crate::resources::resource::GfxResourceId;
use crate::resources::resource_state::GfxResourceStates;

/// 资源 barrier，对应 `D3D12_RESOURCE_BARRIER` 的三种类型
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GfxBarrier {
    /// 状态转换
    Transition {
        resource: GfxResourceId,
        before: GfxResourceStates,
        after: GfxResourceStates,
    },
    /// 两次 UAV 访问之间的读写同步
    Uav { resource: GfxResourceId },
    /// 同一块内存从 `before` 切换给 `after` 使用
    Aliasing {
        before: Option<GfxResourceId>,
        after: GfxResourceId,
    },
}

impl GfxBarrier {
    #[inline]
    pub fn transition(resource: GfxResourceId, before: GfxResourceStates, after: GfxResourceStates) -> Self {
        Self::Transition { resource, before, after }
    }

    #[inline]
    pub fn uav(resource: GfxResourceId) -> Self {
        Self::Uav { resource }
    }

    #[inline]
    pub fn aliasing(before: Option<GfxResourceId>, after: GfxResourceId) -> Self {
        Self::Aliasing { before, after }
    }

    /// barrier 作用的（目标）资源
    #[inline]
    pub fn resource(&self) -> GfxResourceId {
        match *self {
            Self::Transition { resource, .. } | Self::Uav { resource } => resource,
            Self::Aliasing { after, .. } => after,
        }
    }

    #[inline]
    pub fn is_transition(&self) -> bool {
        matches!(self, Self::Transition { .. })
    }
}
