//! 演示用的延迟渲染管线
//!
//! gbuffer -> ssao(async compute) -> lighting -> tonemap -> back buffer

pub mod gbuffer_pass;
pub mod lighting_pass;
pub mod ssao_pass;
pub mod tonemap_pass;

/// 渲染分辨率
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameExtent {
    pub width: u32,
    pub height: u32,
}
