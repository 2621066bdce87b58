//! Pass Graph 执行
//!
//! 按编译好的顺序录制命令，遇到跨队列同步点时提交并 signal / wait。
//! 整个过程不阻塞 CPU。

use std::collections::HashMap;
use std::sync::Arc;

use itertools::Itertools;
use kiln_gfx::commands::command_list::{GfxCommandList, GfxCommandRecorder};
use kiln_gfx::commands::fence::WaitPoint;
use kiln_gfx::commands::queue::{GfxQueue, GfxQueueType};
use kiln_gfx::resources::resource_desc::GfxClearValue;
use kiln_gfx::resources::view::GfxViewKind;

use crate::barrier::{PassBarriers, RgBarrier};
use crate::compiler::CompiledPassGraph;
use crate::error::{GraphError, GraphResult};
use crate::pass::PassGraphContext;
use crate::pass_graph::PassGraph;

/// 一个队列上正在录制的命令列表
struct RgQueueRecorder {
    queue: Arc<GfxQueue>,
    list: Option<GfxCommandList>,
    submitted: usize,
}

impl RgQueueRecorder {
    fn new(queue: Arc<GfxQueue>) -> Self {
        Self {
            queue,
            list: None,
            submitted: 0,
        }
    }

    /// 提交还没提交的命令
    fn flush(&mut self) -> GraphResult<()> {
        if let Some(list) = self.list.take() {
            if !list.is_empty() {
                self.queue.execute(vec![list])?;
                self.submitted += 1;
            }
        }
        Ok(())
    }
}

impl PassGraph {
    /// 执行编译好的 Pass Graph
    ///
    /// 所有用到的队列先在 GPU 上等待 `prior`，返回 graphics 队列最后一次 signal 的 `WaitPoint`。
    /// 执行之后这一帧注册的 Pass 和资源被清空，可以开始注册下一帧。
    pub fn execute(&mut self, prior: &WaitPoint) -> GraphResult<WaitPoint> {
        kiln_crate_tools::profile_scope!("PassGraph::execute");

        let Some(compiled) = self.compiled.take() else {
            log::error!("pass graph: execute called without compile");
            return Err(GraphError::NotCompiled);
        };

        let result = self.record_and_submit(&compiled, prior);
        match &result {
            Ok(wait_point) => self.last_wait_point = wait_point.clone(),
            Err(err) => log::error!("pass graph: frame {} submission failed: {}", self.frame_index, err),
        }
        self.finish_frame(&compiled, result.is_ok());
        result
    }

    fn record_and_submit(&mut self, compiled: &CompiledPassGraph, prior: &WaitPoint) -> GraphResult<WaitPoint> {
        let frame = self.frame_index;
        let mut graphics = RgQueueRecorder::new(self.graphics_queue.clone());
        let mut compute = match (&self.compute_queue, compiled.uses_compute_queue()) {
            (Some(queue), true) => Some(RgQueueRecorder::new(queue.clone())),
            _ => None,
        };

        graphics.queue.wait(prior);
        if let Some(compute) = &compute {
            compute.queue.wait(prior);
        }

        let mut signals: HashMap<usize, WaitPoint> = HashMap::new();

        for &pass_idx in compiled.execution_order() {
            let recorder = match (compiled.queue_of(pass_idx), compute.as_mut()) {
                (GfxQueueType::Compute, Some(compute)) => compute,
                _ => &mut graphics,
            };
            let queue_type = recorder.queue.queue_type();

            // 等待其它队列的 producer
            for sync in compiled.waits_of(pass_idx) {
                if let Some(wait_point) = signals.get(&sync.producer) {
                    recorder.flush()?;
                    recorder.queue.wait(wait_point);
                }
            }

            let device = &self.device;
            let list = recorder.list.get_or_insert_with(|| {
                device.create_command_list(queue_type, &format!("pass-graph-{:?}-{}", queue_type, frame))
            });

            let pass = &mut self.passes[pass_idx];
            let barriers = compiled.barriers_before(pass_idx);
            log::trace!("pass graph: record \"{}\" on {:?}", pass.tag, queue_type);

            record_barriers(list, compiled, barriers.pre.iter());
            record_clears(list, compiled, barriers);
            record_barriers(list, compiled, barriers.after_clear.iter());

            list.begin_event(&pass.tag);
            {
                let mut ctx = PassGraphContext {
                    tag: &pass.tag,
                    queue_type,
                    cmd: &mut *list,
                    uses: &pass.uses,
                    created: &pass.created,
                    registry: &self.registry,
                    bindings: &compiled.bindings,
                };
                pass.executor.execute(&mut ctx);
            }
            list.end_event();

            record_barriers(list, compiled, barriers.post.iter());

            if compiled.is_sync_producer(pass_idx) {
                recorder.flush()?;
                signals.insert(pass_idx, recorder.queue.signal());
            }
        }

        // graphics 等待 compute 的尾部，返回的 WaitPoint 覆盖两个队列
        if let Some(compute) = &mut compute {
            compute.flush()?;
            let compute_tail = compute.queue.signal();
            graphics.flush()?;
            graphics.queue.wait(&compute_tail);
        }

        if !compiled.final_barriers().is_empty() {
            let device = &self.device;
            let list = graphics.list.get_or_insert_with(|| {
                device.create_command_list(GfxQueueType::Graphics, &format!("pass-graph-final-{}", frame))
            });
            record_barriers(list, compiled, compiled.final_barriers().iter());
        }
        graphics.flush()?;

        let wait_point = graphics.queue.signal();
        log::trace!(
            "pass graph: frame {} submitted {} graphics / {} compute list(s), {:?}",
            frame,
            graphics.submitted,
            compute.as_ref().map(|c| c.submitted).unwrap_or(0),
            wait_point
        );
        Ok(wait_point)
    }

    /// 帧边界：写回临时资源状态，清空本帧的 Pass 和资源，推进资源池
    ///
    /// 提交失败时末尾的状态转换没有执行，本帧用到的临时资源不再复用。
    fn finish_frame(&mut self, compiled: &CompiledPassGraph, submitted: bool) {
        if submitted {
            for &(slot, state) in &compiled.transient_states {
                self.transient_pool.set_state(slot, state);
            }
        } else {
            self.transient_pool.discard_taken();
        }
        self.transient_pool.release_taken();
        self.discard_frame();
        self.transient_pool.end_frame(&*self.device, self.frame_index);
        self.frame_index += 1;
    }
}

fn record_barriers<'a>(
    list: &mut GfxCommandList,
    compiled: &CompiledPassGraph,
    barriers: impl Iterator<Item = &'a RgBarrier>,
) {
    let gfx_barriers = barriers.filter_map(|b| b.to_gfx_barrier(|res| compiled.physical_of(res))).collect_vec();
    list.resource_barrier(&gfx_barriers);
}

fn record_clears(list: &mut GfxCommandList, compiled: &CompiledPassGraph, barriers: &PassBarriers) {
    for clear in &barriers.clears {
        let Some(binding) = compiled.bindings.get(clear.resource) else {
            continue;
        };
        let Some(view) = binding.views.get(clear.view) else {
            log::error!("pass graph: \"{}\" has no {:?} view to clear", binding.resource.name(), clear.view);
            continue;
        };

        match (clear.view, clear.value) {
            (GfxViewKind::Rtv, GfxClearValue::Color(color)) => list.clear_render_target_view(view.cpu_handle(), color),
            (GfxViewKind::Dsv, GfxClearValue::DepthStencil { depth, stencil }) => {
                list.clear_depth_stencil_view(view.cpu_handle(), depth, stencil)
            }
            (GfxViewKind::Uav, GfxClearValue::Color(values)) => {
                list.clear_unordered_access_view(view.gpu_handle(), view.cpu_handle(), binding.resource.id(), values)
            }
            (kind, value) => {
                log::warn!("pass graph: can not clear \"{}\" via {:?} with {:?}", binding.resource.name(), kind, value)
            }
        }
    }
}
