use kiln_gfx::basic::format::GfxFormat;
use kiln_gfx::resources::resource_desc::{GfxClearValue, GfxResourceUsage};
use kiln_render_graph::{GraphResult, PassGraph, PassResource, PassResourceDesc};

use crate::passes::FrameExtent;

/// G-Buffer 输出
#[derive(Clone, Copy, Debug)]
pub struct GBufferOutput {
    pub albedo: PassResource,
    pub normal: PassResource,
    pub depth: PassResource,
}

/// 场景几何写入 G-Buffer，三张纹理都在第一次使用前清除
pub fn add_gbuffer_pass(graph: &mut PassGraph, extent: FrameExtent, draw_count: u32) -> GraphResult<GBufferOutput> {
    let color_usage = GfxResourceUsage::RENDER_TARGET | GfxResourceUsage::SHADER_RESOURCE;
    let depth_usage = GfxResourceUsage::DEPTH_STENCIL | GfxResourceUsage::SHADER_RESOURCE;

    graph.add_pass(
        "gbuffer",
        |builder| {
            let albedo = builder.create(
                "gbuffer-albedo",
                PassResourceDesc::texture_2d(extent.width, extent.height, GfxFormat::R8G8B8A8Unorm, color_usage)
                    .with_clear(GfxClearValue::BLACK),
            );
            let normal = builder.create(
                "gbuffer-normal",
                PassResourceDesc::texture_2d(extent.width, extent.height, GfxFormat::R16G16B16A16Float, color_usage)
                    .with_clear(GfxClearValue::TRANSPARENT),
            );
            let depth = builder.create(
                "gbuffer-depth",
                PassResourceDesc::texture_2d(extent.width, extent.height, GfxFormat::D32Float, depth_usage)
                    .with_clear(GfxClearValue::DEPTH_ONE),
            );

            GBufferOutput {
                albedo: builder.write(albedo),
                normal: builder.write(normal),
                depth: builder.write(depth),
            }
        },
        move |output, ctx| {
            let rtvs = [ctx.rtv(output.albedo), ctx.rtv(output.normal)];
            let dsv = ctx.dsv(output.depth);

            let cmd = ctx.cmd();
            cmd.set_pipeline_state("gbuffer");
            cmd.set_render_targets(&rtvs, Some(dsv));
            for _ in 0..draw_count {
                cmd.draw_instanced(36, 1, 0, 0);
            }
        },
    )
}
