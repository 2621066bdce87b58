use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Context;
use kiln_gfx::basic::format::GfxFormat;
use kiln_gfx::commands::fence::WaitPoint;
use kiln_gfx::commands::queue::{GfxQueue, GfxQueueType};
use kiln_gfx::descriptors::descriptor_allocator::GfxDescriptorAllocator;
use kiln_gfx::descriptors::descriptor_heap::GfxDescriptorHeapType;
use kiln_gfx::device::GfxDevice;
use kiln_gfx::headless::HeadlessDevice;
use kiln_gfx::resources::resource::GfxResource;
use kiln_gfx::resources::resource_desc::{GfxResourceDesc, GfxResourceUsage};
use kiln_gfx::resources::resource_state::GfxResourceStates;
use kiln_gfx::resources::view::{GfxResourceViews, GfxViewFactory};
use kiln_render_graph::{PassGraph, PassGraphDesc, create_pass_graph};

use crate::config::AppConfig;
use crate::passes::FrameExtent;
use crate::passes::gbuffer_pass::add_gbuffer_pass;
use crate::passes::lighting_pass::add_lighting_pass;
use crate::passes::ssao_pass::add_ssao_pass;
use crate::passes::tonemap_pass::TonemapPass;

/// CPU 等待 GPU 的超时
const FRAME_SYNC_TIMEOUT_MS: u32 = 1000;

struct BackBuffer {
    resource: GfxResource,
    views: GfxResourceViews,
}

/// 在 headless 设备上逐帧运行 Pass Graph
pub struct HeadlessApp {
    config: AppConfig,
    extent: FrameExtent,

    device: Arc<HeadlessDevice>,
    allocator: Arc<GfxDescriptorAllocator>,
    graphics_queue: Arc<GfxQueue>,

    back_buffers: Vec<BackBuffer>,
    graph: Option<PassGraph>,

    /// 还没有被 CPU 确认完成的帧
    in_flight: VecDeque<WaitPoint>,
}

// new & init
impl HeadlessApp {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let device = HeadlessDevice::new(config.device.clone());
        let allocator = Arc::new(
            GfxDescriptorAllocator::new(&*device, &config.device.heap_descs()).context("创建描述符分配器失败")?,
        );
        let view_factory = Arc::new(GfxViewFactory::new(device.clone(), allocator.clone()));

        let graphics_queue = device.create_queue(GfxQueueType::Graphics, "graphics")?;
        let compute_queue = device.create_queue(GfxQueueType::Compute, "async-compute")?;

        let extent = FrameExtent {
            width: config.output.width,
            height: config.output.height,
        };
        let back_buffers = (0..config.output.back_buffer_count)
            .map(|i| Self::create_back_buffer(&device, &view_factory, extent, i))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let desc = PassGraphDesc::new(config.graph.clone(), graphics_queue.clone()).with_compute_queue(compute_queue);
        let graph = create_pass_graph(device.clone(), view_factory, desc).context("创建 Pass Graph 失败")?;

        Ok(Self {
            config,
            extent,
            device,
            allocator,
            graphics_queue,
            back_buffers,
            graph: Some(graph),
            in_flight: VecDeque::new(),
        })
    }

    fn create_back_buffer(
        device: &HeadlessDevice,
        view_factory: &GfxViewFactory,
        extent: FrameExtent,
        index: u32,
    ) -> anyhow::Result<BackBuffer> {
        let desc = GfxResourceDesc::texture_2d(
            extent.width,
            extent.height,
            GfxFormat::B8G8R8A8Unorm,
            GfxResourceUsage::RENDER_TARGET,
        );
        let resource = device.create_resource(&desc, GfxResourceStates::PRESENT, &format!("back-buffer-{}", index))?;
        let views = view_factory.create_views_for_usage(&resource)?;
        Ok(BackBuffer { resource, views })
    }
}

// update
impl HeadlessApp {
    pub fn run(&mut self) -> anyhow::Result<()> {
        log::info!(
            "kiln-headless: {} frame(s) at {}x{}",
            self.config.frame_count,
            self.extent.width,
            self.extent.height
        );

        for frame in 0..self.config.frame_count as u64 {
            kiln_crate_tools::profile_scope!("HeadlessApp::frame");
            self.throttle(frame);
            self.render_frame(frame).with_context(|| format!("第 {} 帧执行失败", frame))?;
            self.device.flush_gpu();
            kiln_crate_tools::frame_mark!();
        }

        self.print_stats();
        Ok(())
    }

    /// CPU 最多领先 GPU `frames_in_flight` 帧
    fn throttle(&mut self, frame: u64) {
        while self.in_flight.len() >= self.config.device.frames_in_flight as usize {
            let Some(wait_point) = self.in_flight.pop_front() else {
                break;
            };
            if !self.graphics_queue.sync(&wait_point, FRAME_SYNC_TIMEOUT_MS) {
                log::warn!("frame {}: GPU is behind, {:?} not reached", frame, wait_point);
            }
        }
    }

    fn render_frame(&mut self, frame: u64) -> anyhow::Result<()> {
        let Some(graph) = self.graph.as_mut() else {
            anyhow::bail!("pass graph already released");
        };
        let back_buffer = &self.back_buffers[frame as usize % self.back_buffers.len()];

        let output = graph.import(
            back_buffer.resource.name().to_string(),
            back_buffer.resource.clone(),
            GfxResourceStates::PRESENT,
            back_buffer.views.clone(),
        )?;
        graph.set_final_state(output, GfxResourceStates::PRESENT)?;

        let gbuffer = add_gbuffer_pass(graph, self.extent, 16)?;
        let ao = add_ssao_pass(graph, self.extent, gbuffer)?;
        let hdr = add_lighting_pass(graph, self.extent, gbuffer, ao)?;
        graph.add_pass_node("tonemap", TonemapPass { input: hdr, output })?;

        let compiled = graph.compile()?;
        if frame == 0 {
            compiled.print_execution_plan();
        }

        let prior = self.in_flight.back().cloned().unwrap_or_default();
        let wait_point = graph.execute(&prior)?;
        log::debug!("frame {}: submitted, {:?}", frame, wait_point);
        self.in_flight.push_back(wait_point);
        Ok(())
    }

    fn print_stats(&self) {
        let graph_stats = self.graph.as_ref().map(|g| (g.frame_index(), g.transient_resource_count()));
        if let Some((frames, transients)) = graph_stats {
            log::info!("pass graph: {} frame(s) executed, {} pooled transient resource(s)", frames, transients);
        }
        for name in ["graphics", "async-compute"] {
            if let Some(queue) = self.device.headless_queue(name) {
                log::info!(
                    "queue \"{}\": {} command(s), {} signal(s), {} wait(s)",
                    name,
                    queue.executed_commands().len(),
                    queue.signal_count(),
                    queue.wait_count()
                );
            }
        }
        log::info!(
            "device: {} resource(s) created, {} live, {} view write(s), {} RTV descriptor(s) in use",
            self.device.created_resource_count(),
            self.device.live_resource_count(),
            self.device.view_write_count(),
            self.allocator.pool(GfxDescriptorHeapType::Rtv).map(|p| p.allocated_count()).unwrap_or(0)
        );
    }
}

// destroy
impl HeadlessApp {
    /// 等待 GPU 空闲后释放 graph 和 back buffer
    fn shutdown(&mut self) {
        let Some(graph) = self.graph.take() else {
            return;
        };
        self.device.flush_gpu();
        if !graph.release() {
            log::error!("pass graph release timed out");
        }
        for back_buffer in self.back_buffers.drain(..) {
            self.device.destroy_resource(&back_buffer.resource);
        }
        log::info!("kiln-headless: shutdown, {} resource(s) still alive", self.device.live_resource_count());
    }
}

impl Drop for HeadlessApp {
    fn drop(&mut self) {
        self.shutdown();
    }
}
