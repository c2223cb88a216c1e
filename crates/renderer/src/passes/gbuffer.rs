use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use gfx::{
    AttachmentLoadOp, CompareOp, FrameContext, FrameGraph, PassBuilder, PipelineBuilder,
    ShaderStage, SharedContext, VirtualResource,
};
use glam::Mat4;
use pass::Pass;
use world::World;

use crate::config::QualityTier;
use crate::view_renderer::{DEPTH, GBUFFER_ALBEDO, GBUFFER_NORMAL};

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct CameraData {
    projection_view: Mat4,
    view: Mat4,
}

/// Writes albedo and normal attributes for all visible opaque geometry,
/// deferring shading to the lighting resolve.
#[derive(Debug)]
pub struct GBuffer;

impl GBuffer {
    pub fn new(ctx: &SharedContext, tier: QualityTier) -> Result<Self> {
        PipelineBuilder::new("gbuffer")
            .attach_shader("shaders/src/mesh.vert.hlsl", ShaderStage::Vertex)
            .attach_shader("shaders/src/gbuffer.frag.hlsl", ShaderStage::Fragment)
            .depth(true, true, CompareOp::Less)
            .samples(tier.msaa_samples())
            .build(ctx)?;
        Ok(GBuffer)
    }
}

impl Pass for GBuffer {
    fn name(&self) -> &str {
        "gbuffer"
    }

    fn record<'cb>(
        &'cb mut self,
        graph: &mut FrameGraph<'cb>,
        frame: &'cb FrameContext,
        _world: &'cb World,
    ) -> Result<()> {
        let albedo = graph.latest_version(&VirtualResource::image(GBUFFER_ALBEDO))?;
        let normal = graph.latest_version(&VirtualResource::image(GBUFFER_NORMAL))?;
        let depth = graph.latest_version(&VirtualResource::image(DEPTH))?;
        let pass = PassBuilder::render("gbuffer")
            .color_attachment(&albedo, AttachmentLoadOp::Clear, Some([0.0; 4]))?
            .color_attachment(&normal, AttachmentLoadOp::Clear, Some([0.0, 0.0, 1.0, 0.0]))?
            .depth_attachment(&depth, AttachmentLoadOp::Clear, Some(1.0))?
            .execute_fn(move |cmd, _bindings, _stats| {
                let camera = CameraData {
                    projection_view: frame.projection_view,
                    view: frame.view,
                };
                cmd.bind_graphics_pipeline("gbuffer")?;
                cmd.full_viewport_scissor();
                cmd.bind_uniform_data(0, 0, bytemuck::bytes_of(&camera))?;
                if frame.culling.visible_opaque > 0 {
                    cmd.draw_indexed(36, frame.culling.visible_opaque)?;
                }
                Ok(())
            })
            .build();
        graph.add_pass(pass);
        Ok(())
    }

    fn dispose(&mut self, ctx: &SharedContext) {
        ctx.pipelines.remove("gbuffer");
    }
}
