use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use gfx::{
    AttachmentLoadOp, FrameContext, FrameGraph, PassBuilder, PipelineBuilder, PipelineStage,
    ShaderStage, SharedContext, VirtualResource,
};
use glam::{Mat4, Vec4};
use pass::Pass;
use world::World;

use crate::view_renderer::{DEPTH, GBUFFER_ALBEDO, GBUFFER_NORMAL, PROBE_ATLAS, SCENE_OUTPUT};

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct LightingData {
    inverse_projection_view: Mat4,
    cam_position: Vec4,
    sun_direction: Vec4,
    light_count: u32,
    _pad: [u32; 3],
}

/// Fullscreen shading resolve over the gbuffer: reconstructs position from
/// depth and applies every collected light plus probe reflections.
#[derive(Debug)]
pub struct DeferredLighting;

impl DeferredLighting {
    pub fn new(ctx: &SharedContext) -> Result<Self> {
        PipelineBuilder::new("deferred_lighting")
            .attach_shader("shaders/src/fullscreen.vert.hlsl", ShaderStage::Vertex)
            .attach_shader("shaders/src/deferred_shading.frag.hlsl", ShaderStage::Fragment)
            .build(ctx)?;
        Ok(DeferredLighting)
    }
}

impl Pass for DeferredLighting {
    fn name(&self) -> &str {
        "deferred_lighting"
    }

    fn record<'cb>(
        &'cb mut self,
        graph: &mut FrameGraph<'cb>,
        frame: &'cb FrameContext,
        world: &'cb World,
    ) -> Result<()> {
        let color = graph.latest_version(&VirtualResource::image(SCENE_OUTPUT))?;
        let albedo = graph.latest_version(&VirtualResource::image(GBUFFER_ALBEDO))?;
        let normal = graph.latest_version(&VirtualResource::image(GBUFFER_NORMAL))?;
        let depth = graph.latest_version(&VirtualResource::image(DEPTH))?;
        let probes = graph.latest_version(&VirtualResource::image(PROBE_ATLAS))?;
        let pass = PassBuilder::render("deferred_lighting")
            .color_attachment(&color, AttachmentLoadOp::Clear, Some([0.0, 0.0, 0.0, 1.0]))?
            .sample_image(&albedo, PipelineStage::FragmentShader)
            .sample_image(&normal, PipelineStage::FragmentShader)
            .sample_image(&depth, PipelineStage::FragmentShader)
            .sample_image(&probes, PipelineStage::FragmentShader)
            .execute_fn(move |cmd, _bindings, _stats| {
                let lighting = LightingData {
                    inverse_projection_view: frame.inverse_projection_view,
                    cam_position: (frame.cam_position, 1.0).into(),
                    sun_direction: (world.sun_direction, 0.0).into(),
                    light_count: world.lights.len() as u32,
                    _pad: [0; 3],
                };
                cmd.bind_graphics_pipeline("deferred_lighting")?;
                cmd.full_viewport_scissor();
                cmd.bind_uniform_data(0, 0, bytemuck::bytes_of(&lighting))?;
                cmd.bind_sampled_image(0, 1, &albedo)?;
                cmd.bind_sampled_image(0, 2, &normal)?;
                cmd.bind_sampled_image(0, 3, &depth)?;
                cmd.bind_sampled_image(0, 4, &probes)?;
                cmd.draw(6, 1)?;
                Ok(())
            })
            .build();
        graph.add_pass(pass);
        Ok(())
    }

    fn dispose(&mut self, ctx: &SharedContext) {
        ctx.pipelines.remove("deferred_lighting");
    }
}
