use kiln_gfx::basic::format::GfxFormat;
use kiln_gfx::resources::resource_desc::GfxResourceUsage;
use kiln_render_graph::{GraphResult, PassGraph, PassResource, PassResourceDesc};

use crate::passes::FrameExtent;
use crate::passes::gbuffer_pass::GBufferOutput;

/// 全屏光照，输出 HDR 颜色
pub fn add_lighting_pass(
    graph: &mut PassGraph,
    extent: FrameExtent,
    gbuffer: GBufferOutput,
    ao: PassResource,
) -> GraphResult<PassResource> {
    graph.add_pass(
        "lighting",
        |builder| {
            builder.read(gbuffer.albedo);
            builder.read(gbuffer.normal);
            builder.read(gbuffer.depth);
            builder.read(ao);

            let hdr = builder.create(
                "lighting-hdr",
                PassResourceDesc::texture_2d(
                    extent.width,
                    extent.height,
                    GfxFormat::R16G16B16A16Float,
                    GfxResourceUsage::RENDER_TARGET | GfxResourceUsage::SHADER_RESOURCE,
                ),
            );
            builder.write(hdr)
        },
        move |&hdr, ctx| {
            let _inputs = [ctx.srv(gbuffer.albedo), ctx.srv(gbuffer.normal), ctx.srv(gbuffer.depth), ctx.srv(ao)];
            let rtv = ctx.rtv(hdr);

            let cmd = ctx.cmd();
            cmd.set_pipeline_state("deferred-lighting");
            cmd.set_render_targets(&[rtv], None);
            cmd.draw_instanced(3, 1, 0, 0);
        },
    )
}
