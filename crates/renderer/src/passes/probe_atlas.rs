use anyhow::Result;
use atlas::{AtlasPacker, AtlasRegion};
use bytemuck::{Pod, Zeroable};
use gfx::{
    FrameContext, FrameGraph, ImageFormat, PassBuilder, PipelineBuilder, PipelineStage,
    ShaderStage, SharedContext, VirtualResource,
};
use pass::Pass;
use world::World;

use crate::config::QualityTier;
use crate::util::targets::{RenderTargets, SizeGroup, TargetSize};
use crate::view_renderer::PROBE_ATLAS;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct RegionData {
    x: u32,
    y: u32,
    size: u32,
    probe_index: u32,
}

/// Lays out every reflection probe's baked region in the shared atlas and
/// refreshes a budgeted number of them per frame with a compute blit.
///
/// The packer owns scratch storage that is reused across frames, so the
/// layout step allocates nothing in steady state.
#[derive(Debug)]
pub struct ProbeAtlas {
    packer: AtlasPacker,
    regions: Vec<AtlasRegion>,
    atlas_size: u32,
    cursor: usize,
}

impl ProbeAtlas {
    pub fn new(
        ctx: &SharedContext,
        targets: &mut RenderTargets,
        tier: QualityTier,
    ) -> Result<Self> {
        PipelineBuilder::compute("probe_blit")
            .attach_shader("shaders/src/probe_blit.comp.hlsl", ShaderStage::Compute)
            .build(ctx)?;

        let atlas_size = tier.probe_atlas_size();
        targets.register_color_target(
            PROBE_ATLAS,
            SizeGroup::Custom(TargetSize::new(atlas_size, atlas_size)),
            ImageFormat::Rgba16Float,
        )?;

        Ok(Self {
            packer: AtlasPacker::new(),
            regions: Vec::new(),
            atlas_size,
            cursor: 0,
        })
    }
}

impl Pass for ProbeAtlas {
    fn name(&self) -> &str {
        "probe_atlas"
    }

    fn record<'cb>(
        &'cb mut self,
        graph: &mut FrameGraph<'cb>,
        _frame: &'cb FrameContext,
        world: &'cb World,
    ) -> Result<()> {
        self.regions.clear();
        self.regions
            .extend(world.probes.iter().map(|probe| AtlasRegion::new(probe.baked_size)));
        self.packer.pack(&mut self.regions, self.atlas_size, 1)?;

        // Refresh at most the budgeted number of regions, round-robin across
        // frames so every probe is eventually updated.
        let updates = (world.options.probe_update_budget as usize).min(self.regions.len());
        let start = self.cursor;
        if !self.regions.is_empty() {
            self.cursor = (self.cursor + updates) % self.regions.len();
        }

        let regions = &self.regions;
        let atlas = VirtualResource::image(PROBE_ATLAS);
        let output = atlas.clone();
        let pass = PassBuilder::compute("probe_atlas")
            .write_image(&atlas, PipelineStage::ComputeShader)
            .execute_fn(move |cmd, _bindings, _stats| {
                cmd.bind_compute_pipeline("probe_blit")?;
                cmd.bind_storage_image(0, 0, &output)?;
                for offset in 0..updates {
                    let index = (start + offset) % regions.len();
                    let region = &regions[index];
                    let data = RegionData {
                        x: region.x,
                        y: region.y,
                        size: region.size,
                        probe_index: index as u32,
                    };
                    let groups = (region.size + 7) / 8;
                    cmd.push_constants(bytemuck::bytes_of(&data))?;
                    cmd.dispatch(groups, groups, 1)?;
                }
                Ok(())
            })
            .build();
        graph.add_pass(pass);
        Ok(())
    }

    fn dispose(&mut self, ctx: &SharedContext) {
        ctx.pipelines.remove("probe_blit");
    }
}
