use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use gfx::{
    AttachmentLoadOp, CompareOp, FrameContext, FrameGraph, PassBuilder, PipelineBuilder,
    PipelineStage, ShaderStage, SharedContext, VirtualResource,
};
use glam::{Mat4, Vec4};
use pass::Pass;
use world::World;

use crate::config::QualityTier;
use crate::view_renderer::{DEPTH, PROBE_ATLAS, SCENE_OUTPUT};

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ShadingData {
    projection_view: Mat4,
    cam_position: Vec4,
    sun_direction: Vec4,
    light_count: u32,
    _pad: [u32; 3],
}

/// Shades visible opaque geometry straight into the scene color target,
/// re-testing against the depth laid down by the prepass.
#[derive(Debug)]
pub struct OpaqueForward;

impl OpaqueForward {
    pub fn new(ctx: &SharedContext, tier: QualityTier) -> Result<Self> {
        PipelineBuilder::new("opaque_forward")
            .attach_shader("shaders/src/mesh.vert.hlsl", ShaderStage::Vertex)
            .attach_shader("shaders/src/forward_shading.frag.hlsl", ShaderStage::Fragment)
            .depth(true, false, CompareOp::LessOrEqual)
            .samples(tier.msaa_samples())
            .build(ctx)?;
        Ok(OpaqueForward)
    }
}

impl Pass for OpaqueForward {
    fn name(&self) -> &str {
        "opaque_forward"
    }

    fn record<'cb>(
        &'cb mut self,
        graph: &mut FrameGraph<'cb>,
        frame: &'cb FrameContext,
        world: &'cb World,
    ) -> Result<()> {
        let color = graph.latest_version(&VirtualResource::image(SCENE_OUTPUT))?;
        let depth = graph.latest_version(&VirtualResource::image(DEPTH))?;
        let probes = graph.latest_version(&VirtualResource::image(PROBE_ATLAS))?;
        let pass = PassBuilder::render("opaque_forward")
            .color_attachment(&color, AttachmentLoadOp::Clear, Some([0.0, 0.0, 0.0, 1.0]))?
            .depth_attachment(&depth, AttachmentLoadOp::Load, None)?
            .sample_image(&probes, PipelineStage::FragmentShader)
            .execute_fn(move |cmd, _bindings, _stats| {
                let shading = ShadingData {
                    projection_view: frame.projection_view,
                    cam_position: (frame.cam_position, 1.0).into(),
                    sun_direction: (world.sun_direction, 0.0).into(),
                    light_count: world.lights.len() as u32,
                    _pad: [0; 3],
                };
                cmd.bind_graphics_pipeline("opaque_forward")?;
                cmd.full_viewport_scissor();
                cmd.bind_uniform_data(0, 0, bytemuck::bytes_of(&shading))?;
                cmd.bind_sampled_image(0, 1, &probes)?;
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
        ctx.pipelines.remove("opaque_forward");
    }
}
