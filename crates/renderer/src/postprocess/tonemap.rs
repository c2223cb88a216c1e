use anyhow::Result;
use gfx::{
    AttachmentLoadOp, FrameContext, FrameGraph, ImageFormat, PassBuilder, PipelineBuilder,
    PipelineStage, ShaderStage, SharedContext, VirtualResource,
};
use pass::Pass;
use world::World;

use crate::util::targets::{RenderTargets, SizeGroup};
use crate::view_renderer::SCENE_OUTPUT;

/// Maps the HDR scene output into the displayable sRGB target. Registers
/// its own output target under [`Self::output_name()`].
#[derive(Debug)]
pub struct Tonemap;

impl Tonemap {
    pub fn new(ctx: &SharedContext, targets: &mut RenderTargets) -> Result<Self> {
        PipelineBuilder::new("tonemap")
            .attach_shader("shaders/src/fullscreen.vert.hlsl", ShaderStage::Vertex)
            .attach_shader("shaders/src/tonemap.frag.hlsl", ShaderStage::Fragment)
            .build(ctx)?;

        targets.register_color_target(
            Self::output_name(),
            SizeGroup::OutputResolution,
            ImageFormat::Rgba8Srgb,
        )?;

        Ok(Tonemap)
    }

    /// Name of the output attachment.
    pub fn output_name() -> &'static str {
        "tonemap_output"
    }
}

impl Pass for Tonemap {
    fn name(&self) -> &str {
        "tonemap"
    }

    fn record<'cb>(
        &'cb mut self,
        graph: &mut FrameGraph<'cb>,
        _frame: &'cb FrameContext,
        _world: &'cb World,
    ) -> Result<()> {
        let input = graph.latest_version(&VirtualResource::image(SCENE_OUTPUT))?;
        let output = VirtualResource::image(Self::output_name());
        let pass = PassBuilder::render("tonemap")
            .color_attachment(&output, AttachmentLoadOp::Clear, Some([0.0, 0.0, 0.0, 0.0]))?
            .sample_image(&input, PipelineStage::FragmentShader)
            .execute_fn(move |cmd, _bindings, _stats| {
                cmd.bind_graphics_pipeline("tonemap")?;
                cmd.full_viewport_scissor();
                cmd.bind_sampled_image(0, 0, &input)?;
                cmd.draw(6, 1)?;
                Ok(())
            })
            .build();
        graph.add_pass(pass);
        Ok(())
    }

    fn dispose(&mut self, ctx: &SharedContext) {
        ctx.pipelines.remove("tonemap");
    }
}
