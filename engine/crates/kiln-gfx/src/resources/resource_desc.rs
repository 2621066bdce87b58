use crate::basic::format::GfxFormat;

/// 资源维度
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GfxResourceDimension {
    Buffer,
    Texture1D,
    Texture2D,
    Texture3D,
}

bitflags::bitflags! {
    /// 资源声明的用途
    ///
    /// 决定可以创建哪些 view，以及渲染图推断读写状态时使用哪种状态。
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct GfxResourceUsage: u32 {
        const RENDER_TARGET = 1 << 0;
        const DEPTH_STENCIL = 1 << 1;
        const UNORDERED_ACCESS = 1 << 2;
        const SHADER_RESOURCE = 1 << 3;
    }
}

/// 清除值
///
/// 颜色与深度模板的清除值类型不同，用 enum 区分。
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GfxClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u8 },
}

impl GfxClearValue {
    pub const BLACK: Self = Self::Color([0.0, 0.0, 0.0, 1.0]);
    pub const TRANSPARENT: Self = Self::Color([0.0; 4]);
    pub const DEPTH_ONE: Self = Self::DepthStencil { depth: 1.0, stencil: 0 };
    pub const DEPTH_ZERO: Self = Self::DepthStencil { depth: 0.0, stencil: 0 };

    #[inline]
    pub fn is_depth_stencil(&self) -> bool {
        matches!(self, Self::DepthStencil { .. })
    }
}

/// 物理资源描述
///
/// 对于 buffer，`width` 是字节大小，`height`/`depth_or_array_size`/`mip_levels` 都为 1。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxResourceDesc {
    pub dimension: GfxResourceDimension,
    pub width: u64,
    pub height: u32,
    pub depth_or_array_size: u32,
    pub mip_levels: u32,
    pub format: GfxFormat,
    /// structured buffer 的元素大小，其它资源为 0
    pub stride: u32,
    pub usage: GfxResourceUsage,
}

// new & builder
impl GfxResourceDesc {
    pub fn buffer(size: u64, stride: u32, usage: GfxResourceUsage) -> Self {
        Self {
            dimension: GfxResourceDimension::Buffer,
            width: size,
            height: 1,
            depth_or_array_size: 1,
            mip_levels: 1,
            format: GfxFormat::Unknown,
            stride,
            usage,
        }
    }

    pub fn texture_2d(width: u32, height: u32, format: GfxFormat, usage: GfxResourceUsage) -> Self {
        Self {
            dimension: GfxResourceDimension::Texture2D,
            width: width as u64,
            height,
            depth_or_array_size: 1,
            mip_levels: 1,
            format,
            stride: 0,
            usage,
        }
    }

    pub fn texture_3d(width: u32, height: u32, depth: u32, format: GfxFormat, usage: GfxResourceUsage) -> Self {
        Self {
            dimension: GfxResourceDimension::Texture3D,
            width: width as u64,
            height,
            depth_or_array_size: depth,
            mip_levels: 1,
            format,
            stride: 0,
            usage,
        }
    }

    #[inline]
    pub fn with_mips(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels.max(1);
        self
    }

    #[inline]
    pub fn with_array_size(mut self, array_size: u32) -> Self {
        self.depth_or_array_size = array_size.max(1);
        self
    }

    #[inline]
    pub fn with_usage(mut self, usage: GfxResourceUsage) -> Self {
        self.usage = usage;
        self
    }
}

// getters
impl GfxResourceDesc {
    #[inline]
    pub fn is_buffer(&self) -> bool {
        self.dimension == GfxResourceDimension::Buffer
    }

    /// 资源占用的字节数（所有 mip 之和，不考虑硬件对齐）
    pub fn footprint_bytes(&self) -> u64 {
        if self.is_buffer() {
            return self.width;
        }

        let bpe = self.format.bytes_per_element() as u64;
        let layers = match self.dimension {
            GfxResourceDimension::Texture3D => 1,
            _ => self.depth_or_array_size.max(1) as u64,
        };

        let mut total = 0;
        let (mut w, mut h, mut d) = (self.width.max(1), self.height.max(1) as u64, self.depth_3d() as u64);
        for _ in 0..self.mip_levels.max(1) {
            total += w * h * d * bpe;
            w = (w / 2).max(1);
            h = (h / 2).max(1);
            d = (d / 2).max(1);
        }
        total * layers
    }

    #[inline]
    fn depth_3d(&self) -> u32 {
        match self.dimension {
            GfxResourceDimension::Texture3D => self.depth_or_array_size.max(1),
            _ => 1,
        }
    }
}
