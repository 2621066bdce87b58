//! Barrier 自动计算
//!
//! 根据资源状态转换自动生成 transition / UAV / aliasing barrier。

use kiln_gfx::commands::barrier::GfxBarrier;
use kiln_gfx::resources::resource::GfxResourceId;
use kiln_gfx::resources::resource_desc::GfxClearValue;
use kiln_gfx::resources::resource_state::GfxResourceStates;
use kiln_gfx::resources::view::GfxViewKind;

use crate::handle::PassResource;

/// Graph 内部的 barrier 描述，执行时转换为 `GfxBarrier`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RgBarrier {
    Transition {
        resource: PassResource,
        before: GfxResourceStates,
        after: GfxResourceStates,
    },
    /// 两次 UAV 访问之间的读写顺序
    Uav { resource: PassResource },
    /// 物理资源从 `before` 交给 `after` 使用
    Aliasing {
        before: Option<PassResource>,
        after: PassResource,
    },
}

impl RgBarrier {
    #[inline]
    pub fn resource(&self) -> PassResource {
        match *self {
            Self::Transition { resource, .. } | Self::Uav { resource } => resource,
            Self::Aliasing { after, .. } => after,
        }
    }

    /// 转换为 GfxBarrier
    ///
    /// 需要提供逻辑资源到物理资源的映射，找不到物理资源时返回 `None`
    pub fn to_gfx_barrier(&self, physical: impl Fn(PassResource) -> Option<GfxResourceId>) -> Option<GfxBarrier> {
        match *self {
            Self::Transition {
                resource,
                before,
                after,
            } => Some(GfxBarrier::transition(physical(resource)?, before, after)),
            Self::Uav { resource } => Some(GfxBarrier::uav(physical(resource)?)),
            Self::Aliasing { before, after } => {
                Some(GfxBarrier::aliasing(before.and_then(&physical), physical(after)?))
            }
        }
    }
}

/// 资源第一次使用前的清除操作
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RgClear {
    pub resource: PassResource,
    pub value: GfxClearValue,
    pub view: GfxViewKind,
}

/// Pass 前后需要的 barrier 与清除操作
///
/// 执行顺序：`pre` -> `clears` -> `after_clear` -> Pass -> `post`
#[derive(Clone, Debug, Default)]
pub struct PassBarriers {
    pub pre: Vec<RgBarrier>,
    pub clears: Vec<RgClear>,
    /// 清除之后转换到 Pass 需要的状态
    pub after_clear: Vec<RgBarrier>,
    /// Pass 之后立即执行，用于把 compute 队列无法处理的转换提前到 graphics 队列
    pub post: Vec<RgBarrier>,
}

impl PassBarriers {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn has_barriers(&self) -> bool {
        !self.pre.is_empty() || !self.after_clear.is_empty() || !self.post.is_empty()
    }

    /// Pass 开始之前的所有 barrier
    pub fn prologue(&self) -> impl Iterator<Item = &RgBarrier> {
        self.pre.iter().chain(self.after_clear.iter())
    }
}

/// Barrier 计算器
pub struct BarrierCalculator;

impl BarrierCalculator {
    /// 检查状态转换是否需要 barrier
    ///
    /// - 状态相同不需要 transition（UAV 到 UAV 另需 UAV barrier，见 `compute_barrier`）
    /// - 当前是只读的组合状态且已经包含目标状态，不需要
    pub fn needs_transition(current: GfxResourceStates, required: GfxResourceStates) -> bool {
        if current == required {
            return false;
        }
        if current.is_read_only() && !current.is_common() && current.contains(required) {
            return false;
        }
        true
    }

    /// 计算单个资源的 barrier
    ///
    /// # 参数
    /// - `current`: 上一个使用者留下的状态
    /// - `required`: 当前 Pass 需要的状态
    /// - `same_queue`: 上一个使用者是否在同一个队列上；跨队列时由 fence 保证顺序
    pub fn compute_barrier(
        resource: PassResource,
        current: GfxResourceStates,
        required: GfxResourceStates,
        same_queue: bool,
    ) -> Option<RgBarrier> {
        if Self::needs_transition(current, required) {
            return Some(RgBarrier::Transition {
                resource,
                before: current,
                after: required,
            });
        }
        if same_queue && required.contains(GfxResourceStates::UNORDERED_ACCESS) {
            return Some(RgBarrier::Uav { resource });
        }
        None
    }

    /// compute 队列无法从这些状态开始转换
    #[inline]
    pub fn is_graphics_only_state(state: GfxResourceStates) -> bool {
        state.intersects(
            GfxResourceStates::RENDER_TARGET
                | GfxResourceStates::DEPTH_WRITE
                | GfxResourceStates::DEPTH_READ
                | GfxResourceStates::PIXEL_SHADER_RESOURCE,
        )
    }
}
