use kiln_gfx::resources::resource::GfxResourceId;
use slotmap::SlotMap;

use crate::handle::PassResource;
use crate::resource::RgResourceEntry;

/// 资源注册表
///
/// 管理一帧内所有声明的资源，容量在创建 graph 时固定。
pub struct RgResourceRegistry {
    resources: SlotMap<PassResource, RgResourceEntry>,
    max_resource_count: u32,
}

// new & init
impl RgResourceRegistry {
    pub fn new(max_resource_count: u32) -> Self {
        Self {
            resources: SlotMap::with_capacity_and_key(max_resource_count as usize),
            max_resource_count,
        }
    }
}

// register
impl RgResourceRegistry {
    /// 容量已满时返回 `None`
    pub fn register(&mut self, entry: RgResourceEntry) -> Option<PassResource> {
        if self.resources.len() >= self.max_resource_count as usize {
            return None;
        }
        Some(self.resources.insert(entry))
    }

    pub fn remove(&mut self, handle: PassResource) -> Option<RgResourceEntry> {
        self.resources.remove(handle)
    }

    /// 每帧结束后清空
    pub fn clear(&mut self) {
        self.resources.clear();
    }
}

// getter & iter
impl RgResourceRegistry {
    #[inline]
    pub fn get(&self, handle: PassResource) -> Option<&RgResourceEntry> {
        self.resources.get(handle)
    }

    #[inline]
    pub fn get_mut(&mut self, handle: PassResource) -> Option<&mut RgResourceEntry> {
        self.resources.get_mut(handle)
    }

    #[inline]
    pub fn contains(&self, handle: PassResource) -> bool {
        self.resources.contains_key(handle)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[inline]
    pub fn max_resource_count(&self) -> u32 {
        self.max_resource_count
    }

    /// 资源名字，找不到时返回 `<unknown>`
    #[inline]
    pub fn name_of(&self, handle: PassResource) -> &str {
        self.resources.get(handle).map(|r| r.name.as_str()).unwrap_or("<unknown>")
    }

    /// 查找已经导入的物理资源
    pub fn find_imported(&self, id: GfxResourceId) -> Option<PassResource> {
        self.resources
            .iter()
            .find(|(_, entry)| entry.imported_resource().is_some_and(|imported| imported.resource.id() == id))
            .map(|(handle, _)| handle)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (PassResource, &RgResourceEntry)> {
        self.resources.iter()
    }
}
