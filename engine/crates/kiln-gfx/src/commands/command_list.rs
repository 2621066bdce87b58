//! 命令录制
//!
//! `GfxCommandList` 把命令录制成一个命令流，由队列后端负责翻译成原生命令并提交。

use crate::commands::barrier::GfxBarrier;
use crate::commands::queue::GfxQueueType;
use crate::descriptors::descriptor_heap::{GfxCpuDescriptorHandle, GfxGpuDescriptorHandle};
use crate::resources::resource::GfxResourceId;

/// 录制下来的一条命令
#[derive(Clone, Debug, PartialEq)]
pub enum GfxCommand {
    ResourceBarrier(Vec<GfxBarrier>),
    ClearRenderTarget {
        rtv: GfxCpuDescriptorHandle,
        color: [f32; 4],
    },
    ClearDepthStencil {
        dsv: GfxCpuDescriptorHandle,
        depth: f32,
        stencil: u8,
    },
    ClearUnorderedAccess {
        gpu: Option<GfxGpuDescriptorHandle>,
        cpu: GfxCpuDescriptorHandle,
        resource: GfxResourceId,
        values: [f32; 4],
    },
    SetPipelineState(String),
    SetRenderTargets {
        rtvs: Vec<GfxCpuDescriptorHandle>,
        dsv: Option<GfxCpuDescriptorHandle>,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
    CopyResource {
        dst: GfxResourceId,
        src: GfxResourceId,
    },
    BeginEvent(String),
    EndEvent,
}

/// 命令录制接口
///
/// Pass 的 execute 回调只通过这个接口录制命令。
pub trait GfxCommandRecorder {
    fn resource_barrier(&mut self, barriers: &[GfxBarrier]);

    fn clear_render_target_view(&mut self, rtv: GfxCpuDescriptorHandle, color: [f32; 4]);

    fn clear_depth_stencil_view(&mut self, dsv: GfxCpuDescriptorHandle, depth: f32, stencil: u8);

    fn clear_unordered_access_view(
        &mut self,
        gpu: Option<GfxGpuDescriptorHandle>,
        cpu: GfxCpuDescriptorHandle,
        resource: GfxResourceId,
        values: [f32; 4],
    );

    fn set_pipeline_state(&mut self, name: &str);

    fn set_render_targets(&mut self, rtvs: &[GfxCpuDescriptorHandle], dsv: Option<GfxCpuDescriptorHandle>);

    fn draw_instanced(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32);

    fn dispatch(&mut self, x: u32, y: u32, z: u32);

    fn copy_resource(&mut self, dst: GfxResourceId, src: GfxResourceId);

    fn begin_event(&mut self, name: &str);

    fn end_event(&mut self);
}

/// 命令列表
///
/// `close()` 之后不能再录制，之后只能提交给同类型的队列。
#[derive(Clone, Debug)]
pub struct GfxCommandList {
    queue_type: GfxQueueType,
    name: String,
    commands: Vec<GfxCommand>,
    closed: bool,
}

// new & init
impl GfxCommandList {
    pub fn new(queue_type: GfxQueueType, name: impl Into<String>) -> Self {
        Self {
            queue_type,
            name: name.into(),
            commands: Vec::new(),
            closed: false,
        }
    }
}

// getters
impl GfxCommandList {
    #[inline]
    pub fn queue_type(&self) -> GfxQueueType {
        self.queue_type
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn commands(&self) -> &[GfxCommand] {
        &self.commands
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// 所有 `ResourceBarrier` 命令中的 barrier 总数
    pub fn barrier_count(&self) -> usize {
        self.commands
            .iter()
            .map(|cmd| match cmd {
                GfxCommand::ResourceBarrier(barriers) => barriers.len(),
                _ => 0,
            })
            .sum()
    }
}

// tools
impl GfxCommandList {
    #[inline]
    pub fn close(&mut self) {
        self.closed = true;
    }

    fn push(&mut self, command: GfxCommand) {
        if self.closed {
            log::error!("command list \"{}\" is closed, drop command {:?}", self.name, command);
            return;
        }
        self.commands.push(command);
    }
}

impl GfxCommandRecorder for GfxCommandList {
    fn resource_barrier(&mut self, barriers: &[GfxBarrier]) {
        if barriers.is_empty() {
            return;
        }
        self.push(GfxCommand::ResourceBarrier(barriers.to_vec()));
    }

    fn clear_render_target_view(&mut self, rtv: GfxCpuDescriptorHandle, color: [f32; 4]) {
        self.push(GfxCommand::ClearRenderTarget { rtv, color });
    }

    fn clear_depth_stencil_view(&mut self, dsv: GfxCpuDescriptorHandle, depth: f32, stencil: u8) {
        self.push(GfxCommand::ClearDepthStencil { dsv, depth, stencil });
    }

    fn clear_unordered_access_view(
        &mut self,
        gpu: Option<GfxGpuDescriptorHandle>,
        cpu: GfxCpuDescriptorHandle,
        resource: GfxResourceId,
        values: [f32; 4],
    ) {
        self.push(GfxCommand::ClearUnorderedAccess {
            gpu,
            cpu,
            resource,
            values,
        });
    }

    fn set_pipeline_state(&mut self, name: &str) {
        self.push(GfxCommand::SetPipelineState(name.to_string()));
    }

    fn set_render_targets(&mut self, rtvs: &[GfxCpuDescriptorHandle], dsv: Option<GfxCpuDescriptorHandle>) {
        self.push(GfxCommand::SetRenderTargets {
            rtvs: rtvs.to_vec(),
            dsv,
        });
    }

    fn draw_instanced(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        self.push(GfxCommand::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.push(GfxCommand::Dispatch { x, y, z });
    }

    fn copy_resource(&mut self, dst: GfxResourceId, src: GfxResourceId) {
        self.push(GfxCommand::CopyResource { dst, src });
    }

    fn begin_event(&mut self, name: &str) {
        self.push(GfxCommand::BeginEvent(name.to_string()));
    }

    fn end_event(&mut self) {
        self.push(GfxCommand::EndEvent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::resource_state::GfxResourceStates;

    #[test]
    fn test_empty_barrier_batch_elided() {
        let mut list = GfxCommandList::new(GfxQueueType::Graphics, "test");
        list.resource_barrier(&[]);
        assert!(list.is_empty());

        list.resource_barrier(&[
            GfxBarrier::transition(GfxResourceId(1), GfxResourceStates::COMMON, GfxResourceStates::RENDER_TARGET),
            GfxBarrier::uav(GfxResourceId(2)),
        ]);
        assert_eq!(list.commands().len(), 1);
        assert_eq!(list.barrier_count(), 2);
    }

    #[test]
    fn test_closed_list_refuses_commands() {
        let mut list = GfxCommandList::new(GfxQueueType::Compute, "test");
        list.dispatch(8, 8, 1);
        list.close();
        list.dispatch(4, 4, 1);

        assert!(list.is_closed());
        assert_eq!(list.commands(), &[GfxCommand::Dispatch { x: 8, y: 8, z: 1 }]);
    }
}
