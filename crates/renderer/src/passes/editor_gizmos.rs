use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use gfx::{
    AttachmentLoadOp, BlendMode, FrameContext, FrameGraph, PassBuilder, PipelineBuilder,
    ShaderStage, SharedContext, VirtualResource,
};
use glam::Mat4;
use pass::Pass;
use world::World;

use crate::postprocess::tonemap::Tonemap;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct GizmoData {
    projection_view: Mat4,
}

/// Editor-only wireframe markers for lights and reflection probes, drawn
/// over the final image without depth so they stay visible inside geometry.
/// Exempt from culling for the same reason as the debug overlay.
#[derive(Debug)]
pub struct EditorGizmos;

impl EditorGizmos {
    pub fn new(ctx: &SharedContext) -> Result<Self> {
        PipelineBuilder::new("editor_gizmos")
            .attach_shader("shaders/src/gizmo.vert.hlsl", ShaderStage::Vertex)
            .attach_shader("shaders/src/gizmo.frag.hlsl", ShaderStage::Fragment)
            .blend(BlendMode::Alpha)
            .wireframe(true)
            .build(ctx)?;
        Ok(EditorGizmos)
    }
}

impl Pass for EditorGizmos {
    fn name(&self) -> &str {
        "editor_gizmos"
    }

    fn record<'cb>(
        &'cb mut self,
        graph: &mut FrameGraph<'cb>,
        frame: &'cb FrameContext,
        world: &'cb World,
    ) -> Result<()> {
        let color = graph.latest_version(&VirtualResource::image(Tonemap::output_name()))?;
        let pass = PassBuilder::render("editor_gizmos")
            .color_attachment(&color, AttachmentLoadOp::Load, None)?
            .never_cull()
            .execute_fn(move |cmd, _bindings, _stats| {
                let markers = (world.lights.len() + world.probes.len()) as u32;
                if markers == 0 {
                    return Ok(());
                }
                let gizmo = GizmoData {
                    projection_view: frame.projection_view,
                };
                cmd.bind_graphics_pipeline("editor_gizmos")?;
                cmd.full_viewport_scissor();
                cmd.bind_uniform_data(0, 0, bytemuck::bytes_of(&gizmo))?;
                cmd.draw(24, markers)?;
                Ok(())
            })
            .build();
        graph.add_pass(pass);
        Ok(())
    }

    fn dispose(&mut self, ctx: &SharedContext) {
        ctx.pipelines.remove("editor_gizmos");
    }
}
