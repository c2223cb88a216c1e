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
struct CameraData {
    projection_view: Mat4,
    cam_position: Vec4,
}

/// Alpha-blended geometry, drawn back-to-front after the sky so it composes
/// over everything opaque. Tests depth but never writes it.
#[derive(Debug)]
pub struct Transparent;

impl Transparent {
    pub fn new(ctx: &SharedContext, tier: QualityTier) -> Result<Self> {
        PipelineBuilder::new("transparent")
            .attach_shader("shaders/src/mesh.vert.hlsl", ShaderStage::Vertex)
            .attach_shader("shaders/src/transparent.frag.hlsl", ShaderStage::Fragment)
            .depth(true, false, CompareOp::LessOrEqual)
            .blend(BlendMode::Alpha)
            .samples(tier.msaa_samples())
            .build(ctx)?;
        Ok(Transparent)
    }
}

impl Pass for Transparent {
    fn name(&self) -> &str {
        "transparent"
    }

    fn record<'cb>(
        &'cb mut self,
        graph: &mut FrameGraph<'cb>,
        frame: &'cb FrameContext,
        _world: &'cb World,
    ) -> Result<()> {
        let color = graph.latest_version(&VirtualResource::image(SCENE_OUTPUT))?;
        let depth = graph.latest_version(&VirtualResource::image(DEPTH))?;
        let pass = PassBuilder::render("transparent")
            .color_attachment(&color, AttachmentLoadOp::Load, None)?
            .depth_attachment(&depth, AttachmentLoadOp::Load, None)?
            .execute_fn(move |cmd, _bindings, _stats| {
                let camera = CameraData {
                    projection_view: frame.projection_view,
                    cam_position: (frame.cam_position, 1.0).into(),
                };
                cmd.bind_graphics_pipeline("transparent")?;
                cmd.full_viewport_scissor();
                cmd.bind_uniform_data(0, 0, bytemuck::bytes_of(&camera))?;
                if frame.culling.visible_transparent > 0 {
                    cmd.draw_indexed(36, frame.culling.visible_transparent)?;
                }
                Ok(())
            })
            .build();
        graph.add_pass(pass);
        Ok(())
    }

    fn dispose(&mut self, ctx: &SharedContext) {
        ctx.pipelines.remove("transparent");
    }
}
