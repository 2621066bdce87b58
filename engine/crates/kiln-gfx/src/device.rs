use crate::commands::command_list::GfxCommandList;
use crate::commands::queue::GfxQueueType;
use crate::descriptors::descriptor_heap::{GfxCpuDescriptorHandle, GfxDescriptorHeapDesc, GfxDescriptorHeapInfo};
use crate::error::GfxResult;
use crate::resources::resource::GfxResource;
use crate::resources::resource_desc::GfxResourceDesc;
use crate::resources::resource_state::GfxResourceStates;
use crate::resources::view::GfxViewKind;

/// 原生设备接口
///
/// 只包含渲染图和描述符分配器需要的最小集合。
pub trait GfxDevice: Send + Sync {
    fn name(&self) -> &str;

    /// 创建物理资源，资源初始处于 `initial_state`
    fn create_resource(
        &self,
        desc: &GfxResourceDesc,
        initial_state: GfxResourceStates,
        name: &str,
    ) -> GfxResult<GfxResource>;

    fn destroy_resource(&self, resource: &GfxResource);

    fn create_descriptor_heap(&self, desc: &GfxDescriptorHeapDesc) -> GfxResult<GfxDescriptorHeapInfo>;

    /// 把 `resource` 的 view 写入描述符槽位
    fn write_view(&self, kind: GfxViewKind, resource: &GfxResource, cpu_handle: GfxCpuDescriptorHandle);

    fn create_command_list(&self, queue_type: GfxQueueType, name: &str) -> GfxCommandList;
}
