use kiln_gfx::basic::format::GfxFormat;
use kiln_gfx::resources::resource_desc::GfxResourceUsage;
use kiln_render_graph::{GraphResult, PassGraph, PassResource, PassResourceDesc};

use crate::passes::FrameExtent;
use crate::passes::gbuffer_pass::GBufferOutput;

const SSAO_GROUP_SIZE: u32 = 8;

/// 从深度和法线计算环境光遮蔽，可以放到 async compute 队列上
pub fn add_ssao_pass(graph: &mut PassGraph, extent: FrameExtent, gbuffer: GBufferOutput) -> GraphResult<PassResource> {
    graph.add_pass(
        "ssao",
        |builder| {
            builder.async_compute_enable(true);
            builder.read(gbuffer.depth);
            builder.read(gbuffer.normal);

            let ao = builder.create(
                "ssao-ao",
                PassResourceDesc::texture_2d(
                    extent.width,
                    extent.height,
                    GfxFormat::R16Float,
                    GfxResourceUsage::UNORDERED_ACCESS | GfxResourceUsage::SHADER_RESOURCE,
                ),
            );
            builder.write(ao)
        },
        move |&ao, ctx| {
            let _depth = ctx.srv(gbuffer.depth);
            let _normal = ctx.srv(gbuffer.normal);
            let _ao = ctx.uav(ao);

            let cmd = ctx.cmd();
            cmd.set_pipeline_state("ssao");
            cmd.dispatch(extent.width.div_ceil(SSAO_GROUP_SIZE), extent.height.div_ceil(SSAO_GROUP_SIZE), 1);
        },
    )
}
