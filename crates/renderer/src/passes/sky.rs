use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use gfx::{
    AttachmentLoadOp, BlendMode, CompareOp, FrameContext, FrameGraph, PassBuilder,
    PipelineBuilder, ShaderStage, SharedContext, VirtualResource,
};
use glam::{Mat4, Vec4};
use pass::Pass;
use world::World;

use crate::config::QualityTier;
use crate::view_renderer::{DEPTH, SCENE_OUTPUT};

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct SkyData {
    inverse_projection_view: Mat4,
    cam_position: Vec4,
    /// xyz is the sun direction, w the intensity multiplier.
    sun: Vec4,
}

/// Fills the background behind all geometry. Depth-tested against the scene
/// at less-or-equal so only uncovered texels are shaded; blended additively
/// so atmospheric scattering can layer over distant geometry.
#[derive(Debug)]
pub struct Sky;

impl Sky {
    pub fn new(ctx: &SharedContext, tier: QualityTier) -> Result<Self> {
        PipelineBuilder::new("sky")
            .attach_shader("shaders/src/fullscreen.vert.hlsl", ShaderStage::Vertex)
            .attach_shader("shaders/src/sky.frag.hlsl", ShaderStage::Fragment)
            .depth(true, false, CompareOp::LessOrEqual)
            .blend(BlendMode::Additive)
            .samples(tier.msaa_samples())
            .build(ctx)?;
        Ok(Sky)
    }
}

impl Pass for Sky {
    fn name(&self) -> &str {
        "sky"
    }

    fn record<'cb>(
        &'cb mut self,
        graph: &mut FrameGraph<'cb>,
        frame: &'cb FrameContext,
        world: &'cb World,
    ) -> Result<()> {
        let color = graph.latest_version(&VirtualResource::image(SCENE_OUTPUT))?;
        let depth = graph.latest_version(&VirtualResource::image(DEPTH))?;
        let pass = PassBuilder::render("sky")
            .color_attachment(&color, AttachmentLoadOp::Load, None)?
            .depth_attachment(&depth, AttachmentLoadOp::Load, None)?
            .execute_fn(move |cmd, _bindings, _stats| {
                let sky = SkyData {
                    inverse_projection_view: frame.inverse_projection_view,
                    cam_position: (frame.cam_position, 1.0).into(),
                    sun: (world.sun_direction, world.options.sky_intensity).into(),
                };
                cmd.bind_graphics_pipeline("sky")?;
                cmd.full_viewport_scissor();
                cmd.bind_uniform_data(0, 0, bytemuck::bytes_of(&sky))?;
                cmd.draw(6, 1)?;
                Ok(())
            })
            .build();
        graph.add_pass(pass);
        Ok(())
    }

    fn dispose(&mut self, ctx: &SharedContext) {
        ctx.pipelines.remove("sky");
    }
}
