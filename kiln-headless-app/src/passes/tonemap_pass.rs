use kiln_render_graph::{PassGraphBuilder, PassGraphContext, PassResource, RgPass};

/// HDR 到 back buffer 的 tonemap
pub struct TonemapPass {
    pub input: PassResource,
    /// 导入的 back buffer
    pub output: PassResource,
}

impl RgPass for TonemapPass {
    fn setup(&mut self, builder: &mut PassGraphBuilder) {
        builder.read(self.input);
        builder.write(self.output);
    }

    fn execute(&self, ctx: &mut PassGraphContext<'_>) {
        let _hdr = ctx.srv(self.input);
        let rtv = ctx.rtv(self.output);

        let cmd = ctx.cmd();
        cmd.set_pipeline_state("tonemap-aces");
        cmd.set_render_targets(&[rtv], None);
        cmd.draw_instanced(3, 1, 0, 0);
    }
}
