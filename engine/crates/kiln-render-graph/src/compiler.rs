//! Pass Graph 编译
//!
//! 依赖分析 -> 拓扑排序 -> 生命周期 -> 队列划分 -> 物理资源分配 -> barrier -> 跨队列同步。
//! 编译结果只对当前帧有效，`execute` 之后丢弃。

use std::collections::HashMap;

use itertools::Itertools;
use kiln_gfx::commands::queue::GfxQueueType;
use kiln_gfx::resources::resource::{GfxResource, GfxResourceId};
use kiln_gfx::resources::resource_desc::{GfxResourceDesc, GfxResourceUsage};
use kiln_gfx::resources::resource_state::GfxResourceStates;
use kiln_gfx::resources::view::{GfxResourceViews, GfxViewKind};
use slotmap::SecondaryMap;

use crate::barrier::{BarrierCalculator, PassBarriers, RgBarrier, RgClear};
use crate::error::{GraphError, GraphResult};
use crate::graph::DependencyAnalyzer;
use crate::handle::PassResource;
use crate::pass::{RgBinding, RgPassNode, RgResourceUse};
use crate::pass_graph::PassGraph;
use crate::resource::{RgLifetime, clear_target};
use crate::resource_registry::RgResourceRegistry;

/// 跨队列同步点：producer 所在队列在 producer 之后 signal，consumer 所在队列在 consumer 之前 wait
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgSyncPoint {
    pub producer: usize,
    pub consumer: usize,
    pub producer_queue: GfxQueueType,
    pub consumer_queue: GfxQueueType,
}

enum RgPhysicalKind {
    Imported,
    Transient { slot: usize },
}

/// 一个物理资源，以及共享它的逻辑资源
struct RgPhysicalGroup {
    kind: RgPhysicalKind,
    resource: GfxResource,
    views: GfxResourceViews,
    /// 本帧开始时的状态
    state: GfxResourceStates,
    owners: Vec<PassResource>,
    /// 从第一个 owner 的第一次使用到最后一个 owner 的最后一次使用
    lifetime: Option<RgLifetime>,
    /// 所有 owner 的使用者都在 graphics 队列上
    graphics_only: bool,
}

impl RgPhysicalGroup {
    /// 描述为 `desc`、存活区间为 `lifetime` 的资源能否复用这个物理资源
    ///
    /// 复用时共享物理资源的 view，所以格式和尺寸必须完全一致，只允许 usage 是子集。
    fn can_alias(&self, desc: &GfxResourceDesc, lifetime: &RgLifetime) -> bool {
        let RgPhysicalKind::Transient { .. } = self.kind else {
            return false;
        };
        let physical = self.resource.desc();

        self.graphics_only
            && self.lifetime.is_some_and(|l| !l.overlaps(lifetime))
            && physical.dimension == desc.dimension
            && physical.format == desc.format
            && physical.width == desc.width
            && physical.height == desc.height
            && physical.depth_or_array_size == desc.depth_or_array_size
            && physical.mip_levels == desc.mip_levels
            && physical.usage.contains(desc.usage)
    }
}

/// 编译后的 Pass Graph
///
/// Pass 用注册顺序的索引标识。
pub struct CompiledPassGraph {
    pass_tags: Vec<String>,
    pass_uses: Vec<Vec<RgResourceUse>>,
    execution_order: Vec<usize>,
    queues: Vec<GfxQueueType>,
    barriers: Vec<PassBarriers>,
    sync_points: Vec<RgSyncPoint>,
    /// 所有 Pass 之后在 graphics 队列上执行
    final_barriers: Vec<RgBarrier>,
    lifetimes: SecondaryMap<PassResource, RgLifetime>,
    resource_names: SecondaryMap<PassResource, String>,
    pub(crate) bindings: SecondaryMap<PassResource, RgBinding>,
    /// 执行结束后写回资源池的状态：(slot, state)
    pub(crate) transient_states: Vec<(usize, GfxResourceStates)>,
    physical_count: usize,
    aliased_count: usize,
}

// getters
impl CompiledPassGraph {
    #[inline]
    pub fn execution_order(&self) -> &[usize] {
        &self.execution_order
    }

    #[inline]
    pub fn pass_count(&self) -> usize {
        self.pass_tags.len()
    }

    #[inline]
    pub fn pass_tag(&self, pass: usize) -> &str {
        &self.pass_tags[pass]
    }

    /// 按 tag 查找 Pass 的注册索引
    pub fn pass_index(&self, tag: &str) -> Option<usize> {
        self.pass_tags.iter().position(|t| t == tag)
    }

    #[inline]
    pub fn queue_of(&self, pass: usize) -> GfxQueueType {
        self.queues[pass]
    }

    #[inline]
    pub fn barriers_before(&self, pass: usize) -> &PassBarriers {
        &self.barriers[pass]
    }

    #[inline]
    pub fn final_barriers(&self) -> &[RgBarrier] {
        &self.final_barriers
    }

    #[inline]
    pub fn sync_points(&self) -> &[RgSyncPoint] {
        &self.sync_points
    }

    /// consumer 为 `pass` 的同步点
    pub fn waits_of(&self, pass: usize) -> impl Iterator<Item = &RgSyncPoint> {
        self.sync_points.iter().filter(move |s| s.consumer == pass)
    }

    pub fn is_sync_producer(&self, pass: usize) -> bool {
        self.sync_points.iter().any(|s| s.producer == pass)
    }

    #[inline]
    pub fn uses_compute_queue(&self) -> bool {
        self.queues.contains(&GfxQueueType::Compute)
    }

    /// 逻辑资源绑定的物理资源，未使用的资源没有物理资源
    #[inline]
    pub fn physical_of(&self, resource: PassResource) -> Option<GfxResourceId> {
        self.bindings.get(resource).map(|b| b.resource.id())
    }

    #[inline]
    pub fn lifetime_of(&self, resource: PassResource) -> Option<RgLifetime> {
        self.lifetimes.get(resource).copied()
    }

    /// 本帧使用的物理资源数量（导入 + 临时）
    #[inline]
    pub fn physical_resource_count(&self) -> usize {
        self.physical_count
    }

    /// 复用了其它资源物理内存的逻辑资源数量
    #[inline]
    pub fn aliased_resource_count(&self) -> usize {
        self.aliased_count
    }

    #[inline]
    fn name_of(&self, resource: PassResource) -> &str {
        self.resource_names.get(resource).map(|n| n.as_str()).unwrap_or("<unknown>")
    }
}

impl PassGraph {
    /// 编译当前帧注册的所有 Pass
    ///
    /// 编译失败时丢弃这一帧注册的 Pass 和资源。
    pub fn compile(&mut self) -> GraphResult<&CompiledPassGraph> {
        kiln_crate_tools::profile_scope!("PassGraph::compile");

        if self.compiled.is_some() {
            return Err(GraphError::AlreadyCompiled);
        }

        match self.build_compiled() {
            Ok(compiled) => {
                log::debug!(
                    "pass graph compiled: frame {}, {} passes, {} physical resources ({} aliased), {} sync points",
                    self.frame_index,
                    compiled.pass_count(),
                    compiled.physical_resource_count(),
                    compiled.aliased_resource_count(),
                    compiled.sync_points().len()
                );
                Ok(self.compiled.insert(compiled))
            }
            Err(err) => {
                log::error!("pass graph compile failed: {}", err);
                self.transient_pool.release_taken();
                self.discard_frame();
                Err(err)
            }
        }
    }

    fn build_compiled(&mut self) -> GraphResult<CompiledPassGraph> {
        let Self {
            device,
            view_factory,
            config,
            compute_queue,
            registry,
            passes,
            transient_pool,
            frame_index,
            ..
        } = self;
        let pass_count = passes.len();

        // 依赖分析与拓扑排序
        let reads = passes.iter().map(|p| p.reads().collect_vec()).collect_vec();
        let writes = passes.iter().map(|p| p.writes().collect_vec()).collect_vec();
        let dep_graph = DependencyAnalyzer::analyze(pass_count, &reads, &writes);

        let execution_order = dep_graph.topological_sort().map_err(|cycle| GraphError::CyclicDependency {
            passes: cycle.iter().map(|&i| passes[i].tag.clone()).collect(),
        })?;
        let mut positions = vec![0; pass_count];
        for (pos, &pass_idx) in execution_order.iter().enumerate() {
            positions[pass_idx] = pos;
        }

        // 生命周期
        let (lifetimes, first_users) = compute_lifetimes(passes, registry, &execution_order)?;
        validate_clears(registry, &lifetimes)?;

        // 队列划分
        let compute_enabled = compute_queue.is_some() && config.enable_async_compute;
        let queues = passes
            .iter()
            .enumerate()
            .map(|(pass_idx, pass)| {
                if !pass.async_compute || !compute_enabled {
                    return GfxQueueType::Graphics;
                }
                if can_run_on_compute(pass_idx, pass, registry, &first_users) {
                    GfxQueueType::Compute
                } else {
                    log::debug!("pass \"{}\": needs graphics queue, async compute ignored", pass.tag);
                    GfxQueueType::Graphics
                }
            })
            .collect_vec();

        // 物理资源分配
        let mut physical_usage: SecondaryMap<PassResource, GfxResourceUsage> = SecondaryMap::new();
        let mut graphics_users: SecondaryMap<PassResource, bool> = SecondaryMap::new();
        for (pass_idx, pass) in passes.iter().enumerate() {
            for u in &pass.uses {
                if let Some(usage) = physical_usage.entry(u.resource) {
                    *usage.or_default() |= u.access.required_usage();
                }
                if let Some(graphics) = graphics_users.entry(u.resource) {
                    let graphics = graphics.or_insert(true);
                    *graphics &= queues[pass_idx] == GfxQueueType::Graphics;
                }
            }
        }

        let mut groups: Vec<RgPhysicalGroup> = Vec::new();
        let mut group_of: SecondaryMap<PassResource, usize> = SecondaryMap::new();
        let mut aliasing: Vec<(Option<PassResource>, PassResource)> = Vec::new();

        for (handle, entry) in registry.iter() {
            let Some(imported) = entry.imported_resource() else {
                continue;
            };
            group_of.insert(handle, groups.len());
            groups.push(RgPhysicalGroup {
                kind: RgPhysicalKind::Imported,
                resource: imported.resource.clone(),
                views: imported.views.clone(),
                state: entry.initial_state,
                owners: vec![handle],
                lifetime: lifetimes.get(handle).copied(),
                graphics_only: false,
            });
        }

        let created = registry
            .iter()
            .filter(|(handle, entry)| !entry.is_imported() && lifetimes.contains_key(*handle))
            .map(|(handle, _)| handle)
            .sorted_by_key(|handle| lifetimes[*handle].first)
            .collect_vec();

        for handle in created {
            let Some(entry) = registry.get(handle) else {
                continue;
            };
            let lifetime = lifetimes[handle];
            let mut desc = entry.desc.gfx;
            desc.usage |= physical_usage.get(handle).copied().unwrap_or_default();
            let graphics_only = graphics_users.get(handle).copied().unwrap_or(true);

            if config.enable_aliasing && graphics_only {
                if let Some(group_idx) = groups.iter().position(|g| g.can_alias(&desc, &lifetime)) {
                    let group = &mut groups[group_idx];
                    aliasing.push((group.owners.last().copied(), handle));
                    group.owners.push(handle);
                    group.lifetime = group.lifetime.map(|l| RgLifetime {
                        first: l.first,
                        last: lifetime.last,
                    });
                    group_of.insert(handle, group_idx);
                    log::debug!("pass graph: \"{}\" aliases {:?}", entry.name, group.resource.id());
                    continue;
                }
            }

            let slot = transient_pool.acquire(&**device, view_factory, &desc, &entry.name, *frame_index)?;
            let pooled = transient_pool.entry(slot);
            group_of.insert(handle, groups.len());
            groups.push(RgPhysicalGroup {
                kind: RgPhysicalKind::Transient { slot },
                resource: pooled.resource.clone(),
                views: pooled.views.clone(),
                state: pooled.state,
                owners: vec![handle],
                lifetime: Some(lifetime),
                graphics_only,
            });
        }

        // barrier
        let mut barriers = vec![PassBarriers::new(); pass_count];
        for &(before, after) in &aliasing {
            if let Some(&first_user) = first_users.get(after) {
                barriers[first_user].pre.push(RgBarrier::Aliasing { before, after });
            }
        }

        let mut states = groups.iter().map(|g| g.state).collect_vec();
        let mut last_users: Vec<Option<(usize, GfxQueueType)>> = vec![None; groups.len()];
        let mut barrier_edges: Vec<(usize, usize)> = Vec::new();

        for &pass_idx in &execution_order {
            let queue = queues[pass_idx];

            for u in &passes[pass_idx].uses {
                let Some(&group_idx) = group_of.get(u.resource) else {
                    continue;
                };
                let required = u.access.state(queue);
                let previous = last_users[group_idx];
                let same_queue = previous.is_some_and(|(_, q)| q == queue);

                let clear = match (first_users.get(u.resource) == Some(&pass_idx), registry.get(u.resource)) {
                    (true, Some(entry)) => entry.desc.clear_value().and_then(|value| {
                        clear_target(&entry.desc).ok().map(|(view, state)| (value, view, state))
                    }),
                    _ => None,
                };
                let target = clear.map(|(_, _, state)| state).unwrap_or(required);

                let current = states[group_idx];
                if let Some(barrier) = BarrierCalculator::compute_barrier(u.resource, current, target, same_queue) {
                    let hoist = queue == GfxQueueType::Compute
                        && BarrierCalculator::is_graphics_only_state(current)
                        && matches!(barrier, RgBarrier::Transition { .. });
                    match previous {
                        Some((prev_pass, GfxQueueType::Graphics)) if hoist => barriers[prev_pass].post.push(barrier),
                        _ => barriers[pass_idx].pre.push(barrier),
                    }
                    if let Some((prev_pass, prev_queue)) = previous {
                        if prev_queue != queue {
                            barrier_edges.push((prev_pass, pass_idx));
                        }
                    }
                    if BarrierCalculator::needs_transition(current, target) {
                        states[group_idx] = target;
                    }
                }

                if let Some((value, view, clear_state)) = clear {
                    barriers[pass_idx].clears.push(RgClear {
                        resource: u.resource,
                        value,
                        view,
                    });
                    if let Some(barrier) = BarrierCalculator::compute_barrier(u.resource, clear_state, required, true) {
                        barriers[pass_idx].after_clear.push(barrier);
                        if BarrierCalculator::needs_transition(clear_state, required) {
                            states[group_idx] = required;
                        }
                    }
                }

                last_users[group_idx] = Some((pass_idx, queue));
            }
        }

        // 跨队列同步
        let mut producers: Vec<Vec<usize>> = vec![Vec::new(); pass_count];
        for edge in dep_graph.edges() {
            if queues[edge.producer] != queues[edge.consumer] {
                producers[edge.consumer].push(edge.producer);
            }
        }
        for &(producer, consumer) in &barrier_edges {
            producers[consumer].push(producer);
        }

        let mut last_waited: HashMap<(GfxQueueType, GfxQueueType), usize> = HashMap::new();
        let mut sync_points = Vec::new();
        for &consumer in &execution_order {
            let consumer_queue = queues[consumer];

            // 每个来源队列只等待位置最靠后的 producer
            let mut latest: HashMap<GfxQueueType, usize> = HashMap::new();
            for &producer in &producers[consumer] {
                let latest_producer = latest.entry(queues[producer]).or_insert(producer);
                if positions[producer] > positions[*latest_producer] {
                    *latest_producer = producer;
                }
            }

            for (producer_queue, producer) in latest.into_iter().sorted_by_key(|(_, p)| positions[*p]) {
                let key = (consumer_queue, producer_queue);
                if last_waited.get(&key).is_some_and(|&pos| pos >= positions[producer]) {
                    continue;
                }
                last_waited.insert(key, positions[producer]);
                sync_points.push(RgSyncPoint {
                    producer,
                    consumer,
                    producer_queue,
                    consumer_queue,
                });
            }
        }

        // 导出状态
        let mut final_barriers = Vec::new();
        for (handle, entry) in registry.iter() {
            let (Some(target), Some(&group_idx)) = (entry.final_state, group_of.get(handle)) else {
                continue;
            };
            let current = states[group_idx];
            if BarrierCalculator::needs_transition(current, target) {
                final_barriers.push(RgBarrier::Transition {
                    resource: handle,
                    before: current,
                    after: target,
                });
                states[group_idx] = target;
            }
        }

        // 临时资源不带着 graphics 专用状态进入下一帧，compute 队列可以直接使用
        let mut transient_states = Vec::new();
        for (group_idx, group) in groups.iter().enumerate() {
            let RgPhysicalKind::Transient { slot } = group.kind else {
                continue;
            };
            let current = states[group_idx];
            if BarrierCalculator::is_graphics_only_state(current) {
                if let Some(&owner) = group.owners.last() {
                    final_barriers.push(RgBarrier::Transition {
                        resource: owner,
                        before: current,
                        after: GfxResourceStates::COMMON,
                    });
                    states[group_idx] = GfxResourceStates::COMMON;
                }
            }
            transient_states.push((slot, states[group_idx]));
        }

        let mut bindings = SecondaryMap::new();
        for (handle, &group_idx) in group_of.iter() {
            let group = &groups[group_idx];
            bindings.insert(
                handle,
                RgBinding {
                    resource: group.resource.clone(),
                    views: group.views.clone(),
                },
            );
        }

        let mut resource_names = SecondaryMap::new();
        for (handle, entry) in registry.iter() {
            resource_names.insert(handle, entry.name.clone());
        }

        Ok(CompiledPassGraph {
            pass_tags: passes.iter().map(|p| p.tag.clone()).collect(),
            pass_uses: passes.iter().map(|p| p.uses.clone()).collect(),
            execution_order,
            queues,
            barriers,
            sync_points,
            final_barriers,
            lifetimes,
            resource_names,
            bindings,
            transient_states,
            physical_count: groups.len(),
            aliased_count: aliasing.len(),
        })
    }
}

/// 计算每个资源在执行顺序中的存活区间和第一个使用者
///
/// 创建的资源第一次使用如果是读，且没有 clear，返回 `ReadBeforeWrite`
fn compute_lifetimes(
    passes: &[RgPassNode],
    registry: &RgResourceRegistry,
    execution_order: &[usize],
) -> GraphResult<(SecondaryMap<PassResource, RgLifetime>, SecondaryMap<PassResource, usize>)> {
    let mut lifetimes: SecondaryMap<PassResource, RgLifetime> = SecondaryMap::new();
    let mut first_users: SecondaryMap<PassResource, usize> = SecondaryMap::new();

    for (pos, &pass_idx) in execution_order.iter().enumerate() {
        let pass = &passes[pass_idx];
        for u in &pass.uses {
            if let Some(lifetime) = lifetimes.get_mut(u.resource) {
                lifetime.last = pos;
                continue;
            }
            let Some(entry) = registry.get(u.resource) else {
                continue;
            };
            if u.reads && !entry.is_imported() && entry.desc.clear_value().is_none() {
                log::error!("pass \"{}\" reads \"{}\" before any pass writes it", pass.tag, entry.name);
                return Err(GraphError::ReadBeforeWrite {
                    pass: pass.tag.clone(),
                    resource: entry.name.clone(),
                });
            }
            lifetimes.insert(u.resource, RgLifetime { first: pos, last: pos });
            first_users.insert(u.resource, pass_idx);
        }
    }

    Ok((lifetimes, first_users))
}

fn validate_clears(
    registry: &RgResourceRegistry,
    lifetimes: &SecondaryMap<PassResource, RgLifetime>,
) -> GraphResult<()> {
    for (handle, entry) in registry.iter() {
        if entry.desc.clear_value().is_none() || !lifetimes.contains_key(handle) {
            continue;
        }
        if let Err(reason) = clear_target(&entry.desc) {
            log::error!("resource \"{}\" can not be cleared: {}", entry.name, reason);
            return Err(GraphError::InvalidClear {
                resource: entry.name.clone(),
                reason,
            });
        }
    }
    Ok(())
}

/// compute 队列不能处理 graphics 专用的访问、RTV/DSV 清除，以及从 graphics 专用状态开始的导入资源
fn can_run_on_compute(
    pass_idx: usize,
    pass: &RgPassNode,
    registry: &RgResourceRegistry,
    first_users: &SecondaryMap<PassResource, usize>,
) -> bool {
    pass.uses.iter().all(|u| {
        if u.access.is_graphics_only() {
            return false;
        }
        if first_users.get(u.resource) != Some(&pass_idx) {
            return true;
        }
        let Some(entry) = registry.get(u.resource) else {
            return true;
        };
        if entry.is_imported() {
            return !BarrierCalculator::is_graphics_only_state(entry.initial_state);
        }
        match clear_target(&entry.desc) {
            Ok((GfxViewKind::Rtv | GfxViewKind::Dsv, _)) => false,
            _ => true,
        }
    })
}

// 调试方法
impl CompiledPassGraph {
    /// 打印执行计划（用于调试）
    ///
    /// 输出每个 Pass 的执行顺序、所在队列、资源读写、barrier、清除以及跨队列同步。
    pub fn print_execution_plan(&self) {
        log::info!("╔══════════════════════════════════════════════════════════════════╗");
        log::info!("║              PassGraph Execution Plan                            ║");
        log::info!("╠══════════════════════════════════════════════════════════════════╣");
        log::info!(
            "║ Total Passes: {}  |  Execution Order: [{}]",
            self.pass_count(),
            self.execution_order.iter().map(|i| self.pass_tags[*i].as_str()).join(" → ")
        );
        log::info!(
            "║ Physical Resources: {} ({} aliased)  |  Sync Points: {}",
            self.physical_count,
            self.aliased_count,
            self.sync_points.len()
        );
        log::info!("╚══════════════════════════════════════════════════════════════════╝");

        for (order, &pass_idx) in self.execution_order.iter().enumerate() {
            let uses = &self.pass_uses[pass_idx];
            let barriers = &self.barriers[pass_idx];

            log::info!("");
            log::info!("┌─────────────────────────────────────────────────────────────────┐");
            log::info!(
                "│ [{}/{}] Pass: \"{}\" @ {:?}",
                order + 1,
                self.execution_order.len(),
                self.pass_tags[pass_idx],
                self.queues[pass_idx]
            );
            log::info!("├─────────────────────────────────────────────────────────────────┤");

            for sync in self.waits_of(pass_idx) {
                log::info!("│ ⏳ Wait {:?} after \"{}\"", sync.producer_queue, self.pass_tags[sync.producer]);
            }

            let reads = uses.iter().filter(|u| u.reads).collect_vec();
            if !reads.is_empty() {
                log::info!("│ Reads:");
                for u in reads {
                    log::info!("│   📖 \"{}\" as {}", self.name_of(u.resource), u.access);
                }
            }

            let writes = uses.iter().filter(|u| u.writes).collect_vec();
            if !writes.is_empty() {
                log::info!("│ Writes:");
                for u in writes {
                    log::info!("│   ✏️  \"{}\" as {}", self.name_of(u.resource), u.access);
                }
            }

            if barriers.has_barriers() || !barriers.clears.is_empty() {
                log::info!("├─────────────────────────────────────────────────────────────────┤");
                log::info!(
                    "│ Barriers: {} before, {} after  |  Clears: {}",
                    barriers.pre.len() + barriers.after_clear.len(),
                    barriers.post.len(),
                    barriers.clears.len()
                );
                for barrier in &barriers.pre {
                    self.print_barrier(barrier);
                }
                for clear in &barriers.clears {
                    log::info!(
                        "│   🧹 Clear \"{}\" via {:?}: {:?}",
                        self.name_of(clear.resource),
                        clear.view,
                        clear.value
                    );
                }
                for barrier in &barriers.after_clear {
                    self.print_barrier(barrier);
                }
                for barrier in &barriers.post {
                    log::info!("│   (after pass)");
                    self.print_barrier(barrier);
                }
            } else {
                log::info!("│ No barriers required");
            }

            if self.is_sync_producer(pass_idx) {
                log::info!("│ 🔔 Signal {:?}", self.queues[pass_idx]);
            }

            log::info!("└─────────────────────────────────────────────────────────────────┘");
        }

        if !self.final_barriers.is_empty() {
            log::info!("");
            log::info!("Final transitions:");
            for barrier in &self.final_barriers {
                self.print_barrier(barrier);
            }
        }

        log::info!("");
        log::info!("═══════════════════════ End of Execution Plan ═══════════════════════");
    }

    fn print_barrier(&self, barrier: &RgBarrier) {
        match *barrier {
            RgBarrier::Transition {
                resource,
                before,
                after,
            } => {
                log::info!("│   🔒 \"{}\": {} → {}", self.name_of(resource), before.names(), after.names());
            }
            RgBarrier::Uav { resource } => {
                log::info!("│   🔒 \"{}\": UAV", self.name_of(resource));
            }
            RgBarrier::Aliasing { before, after } => {
                let before = before.map(|b| self.name_of(b)).unwrap_or("<none>");
                log::info!("│   🔒 Aliasing \"{}\" → \"{}\"", before, self.name_of(after));
            }
        }
    }
}
