use std::fmt;

/// 像素 / 元素格式
///
/// 只保留渲染图常用的格式，数值与 DXGI_FORMAT 一致，方便原生后端直接转换。
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum GfxFormat {
    #[default]
    Unknown = 0,
    R32G32B32A32Float = 2,
    R16G16B16A16Float = 10,
    R11G11B10Float = 26,
    R8G8B8A8Unorm = 28,
    D32Float = 40,
    R32Float = 41,
    R32Uint = 42,
    D24UnormS8Uint = 45,
    R16Float = 54,
    D16Unorm = 55,
    B8G8R8A8Unorm = 87,
}

impl GfxFormat {
    /// 每个元素（像素）的字节数，`Unknown` 视为 1 字节（用于 raw buffer）
    #[inline]
    pub const fn bytes_per_element(self) -> u32 {
        match self {
            Self::Unknown => 1,
            Self::R16Float | Self::D16Unorm => 2,
            Self::R11G11B10Float
            | Self::R8G8B8A8Unorm
            | Self::B8G8R8A8Unorm
            | Self::R32Float
            | Self::R32Uint
            | Self::D32Float
            | Self::D24UnormS8Uint => 4,
            Self::R16G16B16A16Float => 8,
            Self::R32G32B32A32Float => 16,
        }
    }

    #[inline]
    pub const fn is_depth(self) -> bool {
        matches!(self, Self::D32Float | Self::D24UnormS8Uint | Self::D16Unorm)
    }

    #[inline]
    pub const fn has_stencil(self) -> bool {
        matches!(self, Self::D24UnormS8Uint)
    }
}

impl fmt::Display for GfxFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
