use anyhow::Result;
use gfx::{
    AttachmentLoadOp, BlendMode, FrameContext, FrameGraph, PassBuilder, PipelineBuilder,
    ShaderStage, SharedContext, VirtualResource,
};
use pass::Pass;
use world::World;

use crate::postprocess::tonemap::Tonemap;

/// Timing and counter readout drawn over the final image.
///
/// Nothing downstream consumes the overlay's output, so the pass opts out of
/// automatic culling; without that the backend would be free to skip it.
#[derive(Debug)]
pub struct DebugOverlay;

impl DebugOverlay {
    pub fn new(ctx: &SharedContext) -> Result<Self> {
        PipelineBuilder::new("debug_overlay")
            .attach_shader("shaders/src/overlay.vert.hlsl", ShaderStage::Vertex)
            .attach_shader("shaders/src/overlay.frag.hlsl", ShaderStage::Fragment)
            .blend(BlendMode::Alpha)
            .build(ctx)?;
        Ok(DebugOverlay)
    }
}

impl Pass for DebugOverlay {
    fn name(&self) -> &str {
        "debug_overlay"
    }

    fn record<'cb>(
        &'cb mut self,
        graph: &mut FrameGraph<'cb>,
        _frame: &'cb FrameContext,
        _world: &'cb World,
    ) -> Result<()> {
        let color = graph.latest_version(&VirtualResource::image(Tonemap::output_name()))?;
        let pass = PassBuilder::render("debug_overlay")
            .color_attachment(&color, AttachmentLoadOp::Load, None)?
            .never_cull()
            .execute_fn(move |cmd, _bindings, _stats| {
                cmd.bind_graphics_pipeline("debug_overlay")?;
                cmd.full_viewport_scissor();
                cmd.draw(6, 1)?;
                Ok(())
            })
            .build();
        graph.add_pass(pass);
        Ok(())
    }

    fn dispose(&mut self, ctx: &SharedContext) {
        ctx.pipelines.remove("debug_overlay");
    }
}
