//! Pass Graph
//!
//! # 使用流程
//!
//! 1. 创建 graph: `create_pass_graph(device, view_factory, desc)`
//! 2. 每帧注册 Pass: `graph.add_pass(tag, setup, execute)` 或 `graph.add_pass_node(tag, pass)`
//! 3. 编译: `graph.compile()`
//! 4. 执行: `graph.execute(&prior)`，返回这一帧的 `WaitPoint`
//! 5. 退出时: `graph.release()`

use std::sync::Arc;

use kiln_gfx::commands::fence::WaitPoint;
use kiln_gfx::commands::queue::GfxQueue;
use kiln_gfx::device::GfxDevice;
use kiln_gfx::resources::resource::GfxResource;
use kiln_gfx::resources::resource_state::GfxResourceStates;
use kiln_gfx::resources::view::{GfxResourceViews, GfxViewFactory};

use crate::compiler::CompiledPassGraph;
use crate::config::{PassGraphConfig, PassGraphDesc};
use crate::error::{GraphError, GraphResult};
use crate::handle::PassResource;
use crate::pass::{
    PassGraphBuilder, PassGraphContext, RgClosurePass, RgPass, RgPassExecutor, RgPassExecutorWrapper, RgPassNode,
    RgResourceUse,
};
use crate::resource::RgResourceEntry;
use crate::resource_registry::RgResourceRegistry;
use crate::transient_pool::RgTransientPool;

/// `release` 等待 GPU 的超时
const RELEASE_TIMEOUT_MS: u32 = 5000;

/// graph 级别导入资源时错误信息中使用的 tag
const GRAPH_TAG: &str = "<graph>";

/// setup 阶段收集到的声明
struct RgDeclaration {
    uses: Vec<RgResourceUse>,
    created: Vec<PassResource>,
    async_compute: bool,
}

/// Pass Graph
///
/// 每帧重新注册 Pass，编译后执行。临时资源的物理资源跨帧复用，
/// 导入的资源只借用，从不销毁。
pub struct PassGraph {
    pub(crate) device: Arc<dyn GfxDevice>,
    pub(crate) view_factory: Arc<GfxViewFactory>,
    pub(crate) config: PassGraphConfig,
    pub(crate) graphics_queue: Arc<GfxQueue>,
    pub(crate) compute_queue: Option<Arc<GfxQueue>>,

    pub(crate) registry: RgResourceRegistry,
    pub(crate) passes: Vec<RgPassNode>,
    pub(crate) compiled: Option<CompiledPassGraph>,

    pub(crate) transient_pool: RgTransientPool,
    pub(crate) frame_index: u64,
    pub(crate) last_wait_point: WaitPoint,
    released: bool,
}

/// 创建 Pass Graph
pub fn create_pass_graph(
    device: Arc<dyn GfxDevice>,
    view_factory: Arc<GfxViewFactory>,
    desc: PassGraphDesc,
) -> GraphResult<PassGraph> {
    desc.validate()?;

    let PassGraphDesc {
        config,
        graphics_queue,
        compute_queue,
    } = desc;

    log::info!(
        "pass graph created on \"{}\": max passes {}, max resources {}, async compute {} ({}), aliasing {}",
        device.name(),
        config.max_pass_count,
        config.max_resource_count,
        config.enable_async_compute,
        compute_queue.as_ref().map(|q| q.name()).unwrap_or("no compute queue"),
        config.enable_aliasing
    );

    Ok(PassGraph {
        registry: RgResourceRegistry::new(config.max_resource_count),
        passes: Vec::with_capacity(config.max_pass_count as usize),
        compiled: None,
        transient_pool: RgTransientPool::new(config.transient_retire_frames, config.frames_in_flight),
        frame_index: 0,
        last_wait_point: WaitPoint::invalid(),
        released: false,
        device,
        view_factory,
        config,
        graphics_queue,
        compute_queue,
    })
}

// register
impl PassGraph {
    /// 以闭包形式注册 Pass
    ///
    /// `setup` 立即执行，返回的数据保存下来交给 `execute`，同时返回给调用者
    /// （通常包含 Pass 创建的资源句柄，供后续 Pass 使用）。
    ///
    /// # 示例
    ///
    /// ```ignore
    /// let gbuffer = graph.add_pass(
    ///     "gbuffer",
    ///     |builder| {
    ///         let albedo = builder.create("albedo", desc);
    ///         builder.write(albedo)
    ///     },
    ///     |&albedo, ctx| {
    ///         let rtv = ctx.rtv(albedo);
    ///         ctx.cmd().set_render_targets(&[rtv], None);
    ///         ctx.cmd().draw_instanced(3, 1, 0, 0);
    ///     },
    /// )?;
    /// ```
    pub fn add_pass<D, S, E>(&mut self, tag: impl Into<String>, setup: S, execute: E) -> GraphResult<D>
    where
        D: Clone + 'static,
        S: FnOnce(&mut PassGraphBuilder) -> D,
        E: FnMut(&D, &mut PassGraphContext<'_>) + 'static,
    {
        let tag = tag.into();
        self.check_can_add(&tag)?;

        let (data, declaration) = self.run_setup(&tag, setup)?;
        self.push_pass(
            tag,
            declaration,
            Box::new(RgClosurePass {
                data: data.clone(),
                execute,
            }),
        );
        Ok(data)
    }

    /// 以 `RgPass` 的形式注册 Pass
    pub fn add_pass_node<P: RgPass + 'static>(&mut self, tag: impl Into<String>, mut pass: P) -> GraphResult<()> {
        let tag = tag.into();
        self.check_can_add(&tag)?;

        let ((), declaration) = self.run_setup(&tag, |builder| pass.setup(builder))?;
        self.push_pass(tag, declaration, Box::new(RgPassExecutorWrapper { pass }));
        Ok(())
    }

    /// 在 graph 级别导入外部资源，不属于任何 Pass
    pub fn import(
        &mut self,
        name: impl Into<String>,
        resource: GfxResource,
        state: GfxResourceStates,
        views: GfxResourceViews,
    ) -> GraphResult<PassResource> {
        if self.compiled.is_some() {
            return Err(GraphError::AlreadyCompiled);
        }
        if let Some(handle) = self.registry.find_imported(resource.id()) {
            return Ok(handle);
        }

        let name = name.into();
        let max = self.config.max_resource_count;
        self.registry.register(RgResourceEntry::imported(name.clone(), resource, state, views)).ok_or_else(|| {
            log::error!("pass graph: can not import \"{}\", resource capacity {} reached", name, max);
            GraphError::ResourceCapacityExceeded {
                pass: GRAPH_TAG.to_string(),
                max,
            }
        })
    }

    /// graph 执行完之后资源需要处于的状态（如 back buffer 转换到 PRESENT）
    pub fn set_final_state(&mut self, resource: PassResource, state: GfxResourceStates) -> GraphResult<()> {
        if self.compiled.is_some() {
            return Err(GraphError::AlreadyCompiled);
        }
        match self.registry.get_mut(resource) {
            Some(entry) => {
                entry.final_state = Some(state);
                Ok(())
            }
            None => Err(GraphError::InvalidResource {
                pass: GRAPH_TAG.to_string(),
                resource: resource.short_name(),
            }),
        }
    }
}

// getters
impl PassGraph {
    /// 最近一次 `compile` 的结果，`execute` 之后为 `None`
    #[inline]
    pub fn compiled(&self) -> Option<&CompiledPassGraph> {
        self.compiled.as_ref()
    }

    #[inline]
    pub fn config(&self) -> &PassGraphConfig {
        &self.config
    }

    /// 已经执行的帧数
    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// 本帧已经注册的 Pass 数量
    #[inline]
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// 本帧已经声明的资源数量
    #[inline]
    pub fn resource_count(&self) -> usize {
        self.registry.len()
    }

    /// 资源池中的物理资源数量
    #[inline]
    pub fn transient_resource_count(&self) -> usize {
        self.transient_pool.len()
    }

    /// 最近一次 `execute` 返回的 `WaitPoint`
    #[inline]
    pub fn last_wait_point(&self) -> &WaitPoint {
        &self.last_wait_point
    }
}

// lifecycle
impl PassGraph {
    /// 等待 GPU 执行完最后一帧，然后销毁资源池中的物理资源
    ///
    /// 超时返回 `false`，此时不销毁任何资源。
    pub fn release(mut self) -> bool {
        self.shutdown(true)
    }

    /// `wait` 为 false 时不阻塞 CPU，最后一帧还没执行完就不销毁
    fn shutdown(&mut self, wait: bool) -> bool {
        if self.released {
            return true;
        }
        self.released = true;
        self.compiled = None;
        self.discard_frame();

        let count = self.transient_pool.len() + self.transient_pool.pending_release_count();
        if !wait && !self.last_wait_point.is_completed() {
            log::warn!(
                "pass graph dropped before GPU reached {:?}, {} transient resource(s) leaked, call release() instead",
                self.last_wait_point,
                count
            );
            return false;
        }
        if wait && !self.graphics_queue.sync(&self.last_wait_point, RELEASE_TIMEOUT_MS) {
            log::error!(
                "pass graph release: GPU did not reach {:?} in {} ms, {} transient resource(s) leaked",
                self.last_wait_point,
                RELEASE_TIMEOUT_MS,
                count
            );
            return false;
        }

        self.transient_pool.destroy_all(&*self.device);
        log::info!(
            "pass graph released after {} frame(s), {} transient resource(s) destroyed",
            self.frame_index,
            count
        );
        true
    }
}

// tools
impl PassGraph {
    /// 丢弃本帧注册的 Pass 和资源
    pub(crate) fn discard_frame(&mut self) {
        self.passes.clear();
        self.registry.clear();
    }

    fn check_can_add(&self, tag: &str) -> GraphResult<()> {
        if self.compiled.is_some() {
            log::error!("pass \"{}\": graph is already compiled", tag);
            return Err(GraphError::AlreadyCompiled);
        }
        if self.passes.len() >= self.config.max_pass_count as usize {
            log::error!("pass \"{}\" refused: pass capacity {} reached", tag, self.config.max_pass_count);
            return Err(GraphError::PassCapacityExceeded {
                max: self.config.max_pass_count,
            });
        }
        Ok(())
    }

    /// 执行 setup，出错时回滚这个 Pass 创建的资源并返回第一个错误
    fn run_setup<R>(
        &mut self,
        tag: &str,
        setup: impl FnOnce(&mut PassGraphBuilder) -> R,
    ) -> GraphResult<(R, RgDeclaration)> {
        let mut builder = PassGraphBuilder::new(tag, &mut self.registry);
        let result = setup(&mut builder);
        let PassGraphBuilder {
            uses,
            created,
            async_compute,
            errors,
            ..
        } = builder;

        if let Some(err) = errors.into_iter().next() {
            for handle in created {
                self.registry.remove(handle);
            }
            log::error!("pass \"{}\" refused: {}", tag, err);
            return Err(err);
        }

        Ok((
            result,
            RgDeclaration {
                uses,
                created,
                async_compute,
            },
        ))
    }

    fn push_pass(&mut self, tag: String, declaration: RgDeclaration, executor: Box<dyn RgPassExecutor>) {
        log::trace!(
            "pass \"{}\" registered: {} resource use(s), async compute {}",
            tag,
            declaration.uses.len(),
            declaration.async_compute
        );
        self.passes.push(RgPassNode {
            tag,
            uses: declaration.uses,
            created: declaration.created,
            async_compute: declaration.async_compute,
            executor,
        });
    }
}

impl Drop for PassGraph {
    fn drop(&mut self) {
        self.shutdown(false);
    }
}
