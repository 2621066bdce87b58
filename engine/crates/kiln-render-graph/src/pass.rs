//! Pass 定义、构建器与执行上下文
//!
//! `PassGraphBuilder` 在 setup 阶段声明资源依赖，只做记录；
//! `PassGraphContext` 在 execute 阶段查询物理资源并录制命令。

use kiln_gfx::commands::command_list::{GfxCommandList, GfxCommandRecorder};
use kiln_gfx::commands::queue::GfxQueueType;
use kiln_gfx::descriptors::descriptor_heap::{GfxCpuDescriptorHandle, GfxGpuDescriptorHandle};
use kiln_gfx::resources::resource::GfxResource;
use kiln_gfx::resources::resource_desc::GfxResourceDesc;
use kiln_gfx::resources::resource_state::GfxResourceStates;
use kiln_gfx::resources::view::{GfxResourceViews, GfxView, GfxViewKind};
use slotmap::SecondaryMap;

use crate::error::GraphError;
use crate::handle::PassResource;
use crate::resource::{PassResourceDesc, RgAccess, RgResourceEntry};
use crate::resource_registry::RgResourceRegistry;

/// Pass 对一个资源的使用
///
/// 同一个 Pass 对同一个资源只有一条记录。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgResourceUse {
    pub resource: PassResource,
    pub access: RgAccess,
    pub reads: bool,
    pub writes: bool,
}

/// Pass 构建器
///
/// 在 setup 回调中使用。所有方法都只是记录，不产生 GPU 命令；
/// 出错时记录错误并返回句柄，由 `add_pass` 统一拒绝这个 Pass。
pub struct PassGraphBuilder<'a> {
    pub(crate) tag: &'a str,
    pub(crate) registry: &'a mut RgResourceRegistry,
    pub(crate) uses: Vec<RgResourceUse>,
    /// 本 Pass 创建或导入的资源，Pass 被拒绝时回滚
    pub(crate) created: Vec<PassResource>,
    pub(crate) async_compute: bool,
    pub(crate) errors: Vec<GraphError>,
}

// new & init
impl<'a> PassGraphBuilder<'a> {
    pub(crate) fn new(tag: &'a str, registry: &'a mut RgResourceRegistry) -> Self {
        Self {
            tag,
            registry,
            uses: Vec::new(),
            created: Vec::new(),
            async_compute: false,
            errors: Vec::new(),
        }
    }
}

// declare
impl PassGraphBuilder<'_> {
    /// 创建临时资源
    ///
    /// 资源表已满时返回 `PassResource::null()`，这个 Pass 会被拒绝。
    pub fn create(&mut self, name: impl Into<String>, desc: PassResourceDesc) -> PassResource {
        let name = name.into();
        match self.registry.register(RgResourceEntry::created(name.clone(), desc)) {
            Some(handle) => {
                self.created.push(handle);
                handle
            }
            None => {
                let max = self.registry.max_resource_count();
                log::error!("pass \"{}\": can not create \"{}\", resource capacity {} reached", self.tag, name, max);
                self.errors.push(GraphError::ResourceCapacityExceeded {
                    pass: self.tag.to_string(),
                    max,
                });
                PassResource::null()
            }
        }
    }

    /// 导入外部资源
    ///
    /// graph 不会销毁导入的资源。同一个物理资源重复导入时返回同一个句柄。
    pub fn import(
        &mut self,
        name: impl Into<String>,
        resource: GfxResource,
        state: GfxResourceStates,
        views: GfxResourceViews,
    ) -> PassResource {
        if let Some(handle) = self.registry.find_imported(resource.id()) {
            return handle;
        }

        let name = name.into();
        match self.registry.register(RgResourceEntry::imported(name.clone(), resource, state, views)) {
            Some(handle) => {
                self.created.push(handle);
                handle
            }
            None => {
                let max = self.registry.max_resource_count();
                log::error!("pass \"{}\": can not import \"{}\", resource capacity {} reached", self.tag, name, max);
                self.errors.push(GraphError::ResourceCapacityExceeded {
                    pass: self.tag.to_string(),
                    max,
                });
                PassResource::null()
            }
        }
    }

    /// 声明读取，访问方式按 usage 推断
    ///
    /// 返回相同的句柄
    pub fn read(&mut self, resource: PassResource) -> PassResource {
        let Some(entry) = self.entry(resource) else {
            return resource;
        };
        let access = RgAccess::infer_read(entry.desc.gfx.usage, entry.desc.gfx.format);
        self.record_use(resource, access, true, false);
        resource
    }

    /// 声明写入，访问方式按 usage 推断（RT、DS、UAV）
    pub fn write(&mut self, resource: PassResource) -> PassResource {
        let Some(entry) = self.entry(resource) else {
            return resource;
        };
        let usage = entry.desc.gfx.usage;
        match RgAccess::infer_write(usage) {
            Some(access) => self.record_use(resource, access, false, true),
            None => self.write_error(resource, "<inferred>".to_string()),
        }
        resource
    }

    /// 以指定方式读取
    pub fn read_as(&mut self, resource: PassResource, access: RgAccess) -> PassResource {
        if self.entry(resource).is_some() {
            self.record_use(resource, access, true, false);
        }
        resource
    }

    /// 以指定方式写入，访问方式必须是写操作且被资源的 usage 允许
    pub fn write_as(&mut self, resource: PassResource, access: RgAccess) -> PassResource {
        let Some(entry) = self.entry(resource) else {
            return resource;
        };
        if access.is_write() && entry.desc.gfx.usage.contains(access.required_usage()) {
            self.record_use(resource, access, false, true);
        } else {
            self.write_error(resource, access.to_string());
        }
        resource
    }

    /// 读写同一个资源（如 UAV 累积）
    pub fn read_write(&mut self, resource: PassResource) -> PassResource {
        self.write(resource);
        if let Some(u) = self.uses.iter_mut().find(|u| u.resource == resource) {
            u.reads = true;
        }
        resource
    }

    /// 标记这个 Pass 可以放到 async compute 队列上，实际位置由编译器决定
    #[inline]
    pub fn async_compute_enable(&mut self, enable: bool) {
        self.async_compute = enable;
    }
}

// getters
impl PassGraphBuilder<'_> {
    #[inline]
    pub fn tag(&self) -> &str {
        self.tag
    }

    #[inline]
    pub fn desc(&self, resource: PassResource) -> Option<&PassResourceDesc> {
        self.registry.get(resource).map(|entry| &entry.desc)
    }
}

// tools
impl PassGraphBuilder<'_> {
    fn entry(&mut self, resource: PassResource) -> Option<&RgResourceEntry> {
        if !self.registry.contains(resource) {
            log::error!("pass \"{}\": invalid resource {}", self.tag, resource.short_name());
            self.errors.push(GraphError::InvalidResource {
                pass: self.tag.to_string(),
                resource: resource.short_name(),
            });
            return None;
        }
        self.registry.get(resource)
    }

    fn write_error(&mut self, resource: PassResource, access: String) {
        let (name, usage) = match self.registry.get(resource) {
            Some(entry) => (entry.name.clone(), format!("{:?}", entry.desc.gfx.usage)),
            None => (resource.short_name(), String::new()),
        };
        log::error!("pass \"{}\": \"{}\" can not be written as {} with usage {}", self.tag, name, access, usage);
        self.errors.push(GraphError::WriteToReadOnlyUsage {
            pass: self.tag.to_string(),
            resource: name,
            access,
            usage,
        });
    }

    /// 重复声明只更新已有记录：写访问覆盖读访问
    fn record_use(&mut self, resource: PassResource, access: RgAccess, reads: bool, writes: bool) {
        let Some(u) = self.uses.iter_mut().find(|u| u.resource == resource) else {
            self.uses.push(RgResourceUse {
                resource,
                access,
                reads,
                writes,
            });
            return;
        };

        u.reads |= reads;
        if writes {
            u.access = access;
            u.writes = true;
        } else if u.access != access {
            log::debug!(
                "pass \"{}\": {} already declared as {}, ignore {}",
                self.tag,
                resource.short_name(),
                u.access,
                access
            );
        }
    }
}

/// 资源绑定的物理资源和 view
#[derive(Clone, Debug)]
pub(crate) struct RgBinding {
    pub resource: GfxResource,
    pub views: GfxResourceViews,
}

/// Pass 执行时的上下文
///
/// 只能查询本 Pass 在 setup 中声明过的资源，查询未声明的资源会 panic。
pub struct PassGraphContext<'a> {
    pub(crate) tag: &'a str,
    pub(crate) queue_type: GfxQueueType,
    pub(crate) cmd: &'a mut GfxCommandList,
    pub(crate) uses: &'a [RgResourceUse],
    pub(crate) created: &'a [PassResource],
    pub(crate) registry: &'a RgResourceRegistry,
    pub(crate) bindings: &'a SecondaryMap<PassResource, RgBinding>,
}

// getters
impl PassGraphContext<'_> {
    /// 当前 Pass 的命令录制接口
    #[inline]
    pub fn cmd(&mut self) -> &mut dyn GfxCommandRecorder {
        &mut *self.cmd
    }

    #[inline]
    pub fn tag(&self) -> &str {
        self.tag
    }

    #[inline]
    pub fn queue_type(&self) -> GfxQueueType {
        self.queue_type
    }

    /// render target 的 CPU 描述符句柄
    #[inline]
    pub fn rtv(&self, resource: PassResource) -> GfxCpuDescriptorHandle {
        self.view(resource, GfxViewKind::Rtv).cpu_handle()
    }

    #[inline]
    pub fn dsv(&self, resource: PassResource) -> GfxCpuDescriptorHandle {
        self.view(resource, GfxViewKind::Dsv).cpu_handle()
    }

    /// shader resource view 的 GPU 描述符句柄
    #[inline]
    pub fn srv(&self, resource: PassResource) -> GfxGpuDescriptorHandle {
        self.gpu_handle(resource, GfxViewKind::Srv)
    }

    #[inline]
    pub fn uav(&self, resource: PassResource) -> GfxGpuDescriptorHandle {
        self.gpu_handle(resource, GfxViewKind::Uav)
    }

    /// 资源的逻辑描述
    #[inline]
    pub fn desc(&self, resource: PassResource) -> &GfxResourceDesc {
        self.check_declared(resource);
        match self.registry.get(resource) {
            Some(entry) => &entry.desc.gfx,
            None => panic!("pass \"{}\": resource {} is not registered", self.tag, resource.short_name()),
        }
    }

    /// 绑定的物理资源
    #[inline]
    pub fn resource(&self, resource: PassResource) -> &GfxResource {
        &self.binding(resource).resource
    }

    pub fn view(&self, resource: PassResource, kind: GfxViewKind) -> &GfxView {
        match self.binding(resource).views.get(kind) {
            Some(view) => view,
            None => panic!(
                "pass \"{}\": \"{}\" has no {:?} view",
                self.tag,
                self.registry.name_of(resource),
                kind
            ),
        }
    }
}

// tools
impl PassGraphContext<'_> {
    fn check_declared(&self, resource: PassResource) {
        let declared = self.uses.iter().any(|u| u.resource == resource) || self.created.contains(&resource);
        if !declared {
            panic!(
                "pass \"{}\" accesses undeclared resource {} (\"{}\")",
                self.tag,
                resource.short_name(),
                self.registry.name_of(resource)
            );
        }
    }

    fn binding(&self, resource: PassResource) -> &RgBinding {
        self.check_declared(resource);
        match self.bindings.get(resource) {
            Some(binding) => binding,
            None => panic!(
                "pass \"{}\": \"{}\" has no physical backing",
                self.tag,
                self.registry.name_of(resource)
            ),
        }
    }

    fn gpu_handle(&self, resource: PassResource, kind: GfxViewKind) -> GfxGpuDescriptorHandle {
        match self.view(resource, kind).gpu_handle() {
            Some(handle) => handle,
            None => panic!(
                "pass \"{}\": {:?} view of \"{}\" is not shader visible",
                self.tag,
                kind,
                self.registry.name_of(resource)
            ),
        }
    }
}

/// RgPass trait
///
/// 以结构体的形式定义 Pass，与闭包形式的 `PassGraph::add_pass` 等价。
///
/// # 示例
///
/// ```ignore
/// struct BlurPass {
///     input: PassResource,
///     output: PassResource,
/// }
///
/// impl RgPass for BlurPass {
///     fn setup(&mut self, builder: &mut PassGraphBuilder) {
///         builder.read(self.input);
///         self.output = builder.write(self.output);
///         builder.async_compute_enable(true);
///     }
///
///     fn execute(&self, ctx: &mut PassGraphContext<'_>) {
///         let _src = ctx.srv(self.input);
///         let _dst = ctx.uav(self.output);
///         ctx.cmd().dispatch(8, 8, 1);
///     }
/// }
/// ```
///
/// # 线程安全
///
/// Pass 不需要是 Send + Sync，录制在单线程中进行。
pub trait RgPass {
    /// 声明 Pass 的资源依赖
    fn setup(&mut self, builder: &mut PassGraphBuilder);

    /// 录制 Pass 的命令，此时 barrier 已经插入完毕
    fn execute(&self, ctx: &mut PassGraphContext<'_>);
}

/// 类型擦除的 Pass 执行器
pub(crate) trait RgPassExecutor {
    fn execute(&mut self, ctx: &mut PassGraphContext<'_>);
}

/// 包装 `RgPass` 实现
pub(crate) struct RgPassExecutorWrapper<P: RgPass> {
    pub pass: P,
}

impl<P: RgPass> RgPassExecutor for RgPassExecutorWrapper<P> {
    fn execute(&mut self, ctx: &mut PassGraphContext<'_>) {
        self.pass.execute(ctx);
    }
}

/// 包装闭包形式的 Pass：setup 返回的数据交给 execute 使用
pub(crate) struct RgClosurePass<D, E> {
    pub data: D,
    pub execute: E,
}

impl<D, E> RgPassExecutor for RgClosurePass<D, E>
where
    E: FnMut(&D, &mut PassGraphContext<'_>),
{
    fn execute(&mut self, ctx: &mut PassGraphContext<'_>) {
        (self.execute)(&self.data, ctx);
    }
}

/// 注册后的 Pass 节点
pub(crate) struct RgPassNode {
    pub tag: String,
    pub uses: Vec<RgResourceUse>,
    pub created: Vec<PassResource>,
    pub async_compute: bool,
    pub executor: Box<dyn RgPassExecutor>,
}

impl RgPassNode {
    #[inline]
    pub fn reads(&self) -> impl Iterator<Item = PassResource> + '_ {
        self.uses.iter().filter(|u| u.reads).map(|u| u.resource)
    }

    #[inline]
    pub fn writes(&self) -> impl Iterator<Item = PassResource> + '_ {
        self.uses.iter().filter(|u| u.writes).map(|u| u.resource)
    }
}

#[cfg(test)]
mod tests {
    use kiln_gfx::basic::format::GfxFormat;
    use kiln_gfx::resources::resource_desc::GfxResourceUsage;

    use super::*;

    fn rt_desc() -> PassResourceDesc {
        PassResourceDesc::texture_2d(
            64,
            64,
            GfxFormat::R8G8B8A8Unorm,
            GfxResourceUsage::RENDER_TARGET | GfxResourceUsage::SHADER_RESOURCE,
        )
    }

    #[test]
    fn test_declarations_are_idempotent() {
        let mut registry = RgResourceRegistry::new(8);
        let mut builder = PassGraphBuilder::new("p", &mut registry);

        let x = builder.create("x", rt_desc());
        builder.write(x);
        builder.write(x);
        builder.read(x);
        builder.read(x);

        assert!(builder.errors.is_empty());
        assert_eq!(builder.uses.len(), 1);
        let u = builder.uses[0];
        assert_eq!(u.access, RgAccess::RenderTarget);
        assert!(u.reads && u.writes);
    }

    #[test]
    fn test_write_overrides_read_access() {
        let mut registry = RgResourceRegistry::new(8);
        let mut builder = PassGraphBuilder::new("p", &mut registry);

        let x = builder.create("x", rt_desc());
        builder.read(x);
        builder.write(x);
        assert_eq!(builder.uses[0].access, RgAccess::RenderTarget);
    }

    #[test]
    fn test_write_without_writable_usage() {
        let mut registry = RgResourceRegistry::new(8);
        let mut builder = PassGraphBuilder::new("p", &mut registry);

        let desc = PassResourceDesc::texture_2d(4, 4, GfxFormat::R8G8B8A8Unorm, GfxResourceUsage::SHADER_RESOURCE);
        let x = builder.create("x", desc);
        builder.write(x);
        builder.write_as(x, RgAccess::UnorderedAccess);

        assert_eq!(builder.errors.len(), 2);
        assert!(matches!(builder.errors[0], GraphError::WriteToReadOnlyUsage { .. }));
        assert!(builder.uses.is_empty());
    }

    #[test]
    fn test_read_write_marks_both() {
        let mut registry = RgResourceRegistry::new(8);
        let mut builder = PassGraphBuilder::new("p", &mut registry);

        let desc = PassResourceDesc::buffer(256, 4, GfxResourceUsage::UNORDERED_ACCESS);
        let x = builder.create("x", desc);
        builder.read_write(x);

        assert!(builder.errors.is_empty());
        let u = builder.uses[0];
        assert_eq!(u.access, RgAccess::UnorderedAccess);
        assert!(u.reads && u.writes);
    }

    #[test]
    fn test_capacity_returns_null() {
        let mut registry = RgResourceRegistry::new(1);
        let mut builder = PassGraphBuilder::new("p", &mut registry);

        let a = builder.create("a", rt_desc());
        let b = builder.create("b", rt_desc());
        assert!(!a.is_null());
        assert!(b.is_null());
        assert!(matches!(builder.errors[0], GraphError::ResourceCapacityExceeded { max: 1, .. }));

        // 对 null 句柄的声明只记录错误
        builder.read(b);
        assert!(matches!(builder.errors[1], GraphError::InvalidResource { .. }));
    }
}
