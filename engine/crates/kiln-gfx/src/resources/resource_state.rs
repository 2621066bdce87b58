//! 资源状态定义
//!
//! 数值与 `D3D12_RESOURCE_STATES` 一致，渲染图根据前后状态自动计算 transition barrier。

use itertools::Itertools;

bitflags::bitflags! {
    /// 资源状态
    ///
    /// 注意 `COMMON` 和 `PRESENT` 都是 0，不能用 `contains` 判断。
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct GfxResourceStates: u32 {
        const COMMON = 0;
        const VERTEX_AND_CONSTANT_BUFFER = 0x1;
        const INDEX_BUFFER = 0x2;
        const RENDER_TARGET = 0x4;
        const UNORDERED_ACCESS = 0x8;
        const DEPTH_WRITE = 0x10;
        const DEPTH_READ = 0x20;
        const NON_PIXEL_SHADER_RESOURCE = 0x40;
        const PIXEL_SHADER_RESOURCE = 0x80;
        const INDIRECT_ARGUMENT = 0x200;
        const COPY_DEST = 0x400;
        const COPY_SOURCE = 0x800;
        const RESOLVE_DEST = 0x1000;
        const RESOLVE_SOURCE = 0x2000;
        const PRESENT = 0;

        const ALL_SHADER_RESOURCE = Self::NON_PIXEL_SHADER_RESOURCE.bits() | Self::PIXEL_SHADER_RESOURCE.bits();
        const GENERIC_READ = Self::VERTEX_AND_CONSTANT_BUFFER.bits()
            | Self::INDEX_BUFFER.bits()
            | Self::NON_PIXEL_SHADER_RESOURCE.bits()
            | Self::PIXEL_SHADER_RESOURCE.bits()
            | Self::INDIRECT_ARGUMENT.bits()
            | Self::COPY_SOURCE.bits();
    }
}

impl GfxResourceStates {
    /// 写操作相关的状态位
    const WRITE_STATES: Self = Self::from_bits_retain(
        Self::RENDER_TARGET.bits()
            | Self::UNORDERED_ACCESS.bits()
            | Self::DEPTH_WRITE.bits()
            | Self::COPY_DEST.bits()
            | Self::RESOLVE_DEST.bits(),
    );

    /// 检查是否为写状态
    #[inline]
    pub fn is_write(&self) -> bool {
        self.intersects(Self::WRITE_STATES)
    }

    /// 检查是否为只读状态（`COMMON` 也视为只读）
    #[inline]
    pub fn is_read_only(&self) -> bool {
        !self.is_write()
    }

    #[inline]
    pub fn is_common(&self) -> bool {
        self.is_empty()
    }

    /// 格式化为可读字符串
    pub fn names(&self) -> String {
        if self.is_empty() {
            return "COMMON".to_string();
        }
        let names = self.iter_names().map(|(name, _)| name).join(" | ");
        if names.is_empty() { format!("{:#x}", self.bits()) } else { names }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_states() {
        assert!(GfxResourceStates::RENDER_TARGET.is_write());
        assert!(GfxResourceStates::UNORDERED_ACCESS.is_write());
        assert!(GfxResourceStates::DEPTH_WRITE.is_write());
        assert!(GfxResourceStates::PIXEL_SHADER_RESOURCE.is_read_only());
        assert!(GfxResourceStates::DEPTH_READ.is_read_only());
        assert!(GfxResourceStates::COMMON.is_read_only());
    }

    #[test]
    fn test_present_is_common() {
        assert_eq!(GfxResourceStates::PRESENT, GfxResourceStates::COMMON);
        assert!(GfxResourceStates::PRESENT.is_common());
        assert_eq!(GfxResourceStates::COMMON.names(), "COMMON");
    }

    #[test]
    fn test_names() {
        let names = GfxResourceStates::RENDER_TARGET.names();
        assert_eq!(names, "RENDER_TARGET");
    }
}
