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
use crate::view_renderer::DEPTH;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct CameraData {
    projection_view: Mat4,
}

/// Lays down scene depth before any shading pass runs, so the opaque pass
/// can shade with depth-equal testing and no overdraw.
#[derive(Debug)]
pub struct DepthPrepass;

impl DepthPrepass {
    pub fn new(ctx: &SharedContext, tier: QualityTier) -> Result<Self> {
        PipelineBuilder::new("depth_prepass")
            .attach_shader("shaders/src/mesh.vert.hlsl", ShaderStage::Vertex)
            .depth(true, true, CompareOp::Less)
            .samples(tier.msaa_samples())
            .build(ctx)?;
        Ok(DepthPrepass)
    }
}

impl Pass for DepthPrepass {
    fn name(&self) -> &str {
        "depth_prepass"
    }

    fn record<'cb>(
        &'cb mut self,
        graph: &mut FrameGraph<'cb>,
        frame: &'cb FrameContext,
        _world: &'cb World,
    ) -> Result<()> {
        let depth = graph.latest_version(&VirtualResource::image(DEPTH))?;
        let pass = PassBuilder::render("depth_prepass")
            .depth_attachment(&depth, AttachmentLoadOp::Clear, Some(1.0))?
            .execute_fn(move |cmd, _bindings, _stats| {
                let camera = CameraData {
                    projection_view: frame.projection_view,
                };
                cmd.bind_graphics_pipeline("depth_prepass")?;
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
        ctx.pipelines.remove("depth_prepass");
    }
}
