use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use gfx::{
    AttachmentLoadOp, FrameContext, FrameGraph, PassBuilder, PipelineBuilder, ShaderStage,
    SharedContext, VirtualResource,
};
use glam::Mat4;
use pass::Pass;
use world::World;

use crate::postprocess::tonemap::Tonemap;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct CameraData {
    projection_view: Mat4,
}

/// Re-draws every object whose material failed to compile in a loud flat
/// color over the final image, so broken assets are impossible to miss in
/// the editor. Opts out of culling; its only effect is the visible draw.
#[derive(Debug)]
pub struct ErrorMaterials;

impl ErrorMaterials {
    pub fn new(ctx: &SharedContext) -> Result<Self> {
        PipelineBuilder::new("error_material")
            .attach_shader("shaders/src/mesh.vert.hlsl", ShaderStage::Vertex)
            .attach_shader("shaders/src/error_material.frag.hlsl", ShaderStage::Fragment)
            .build(ctx)?;
        Ok(ErrorMaterials)
    }
}

impl Pass for ErrorMaterials {
    fn name(&self) -> &str {
        "error_materials"
    }

    fn record<'cb>(
        &'cb mut self,
        graph: &mut FrameGraph<'cb>,
        frame: &'cb FrameContext,
        world: &'cb World,
    ) -> Result<()> {
        let color = graph.latest_version(&VirtualResource::image(Tonemap::output_name()))?;
        let pass = PassBuilder::render("error_materials")
            .color_attachment(&color, AttachmentLoadOp::Load, None)?
            .never_cull()
            .execute_fn(move |cmd, _bindings, _stats| {
                if world.failed_materials == 0 {
                    return Ok(());
                }
                let camera = CameraData {
                    projection_view: frame.projection_view,
                };
                cmd.bind_graphics_pipeline("error_material")?;
                cmd.full_viewport_scissor();
                cmd.bind_uniform_data(0, 0, bytemuck::bytes_of(&camera))?;
                cmd.draw_indexed(36, world.failed_materials)?;
                Ok(())
            })
            .build();
        graph.add_pass(pass);
        Ok(())
    }

    fn dispose(&mut self, ctx: &SharedContext) {
        ctx.pipelines.remove("error_material");
    }
}
