use std::sync::Arc;

use anyhow::Result;
use derivative::Derivative;
use error::{publish_error, Reporter};
use gfx::{
    FrameContext, FrameGraph, ImageFormat, PhysicalResourceBindings, ResourceBackend,
    SharedContext, VirtualResource,
};
use log::{debug, error};
use pass::Pass;
use statistics::RendererStatistics;
use world::World;

use crate::config::{PipelineConfig, VisualPath};
use crate::frame::FrameError;
use crate::passes::debug_overlay::DebugOverlay;
use crate::passes::deferred_lighting::DeferredLighting;
use crate::passes::depth_prepass::DepthPrepass;
use crate::passes::editor_gizmos::EditorGizmos;
use crate::passes::error_materials::ErrorMaterials;
use crate::passes::gbuffer::GBuffer;
use crate::passes::opaque::OpaqueForward;
use crate::passes::probe_atlas::ProbeAtlas;
use crate::passes::sky::Sky;
use crate::passes::transparent::Transparent;
use crate::postprocess::tonemap::Tonemap;
use crate::util::targets::{RenderTargets, SizeGroup};

/// Names of the shared render targets registered at construction.
pub const SCENE_OUTPUT: &str = "scene_output";
pub const DEPTH: &str = "depth";
pub const GBUFFER_ALBEDO: &str = "gbuffer_albedo";
pub const GBUFFER_NORMAL: &str = "gbuffer_normal";
pub const PROBE_ATLAS: &str = "probe_atlas";

/// Alias under which the final image is published every frame.
pub const OUTPUT: &str = "renderer_output";

/// Drives the rendering of one view: assembles the pass list for a pipeline
/// configuration, records and submits it every frame, and tears it down.
///
/// The pass list is built once in [`new`](Self::new) and never patched;
/// a configuration change means building a new renderer. Passes and their
/// resident pipeline state are owned exclusively by this renderer.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ViewRenderer {
    ctx: SharedContext,
    config: PipelineConfig,
    targets: RenderTargets,
    #[derivative(Debug = "ignore")]
    reporter: Arc<dyn Reporter>,
    #[derivative(Debug = "ignore")]
    passes: Option<Vec<Box<dyn Pass>>>,
}

impl ViewRenderer {
    /// Build the renderer for one pipeline configuration. Registers the
    /// shared render targets and assembles the pass list; any pass failing
    /// to acquire its resident state fails construction.
    pub fn new(
        ctx: SharedContext,
        config: PipelineConfig,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self> {
        let mut targets = RenderTargets::new();
        targets.set_output_resolution(1, 1)?;

        targets.register_color_target(
            SCENE_OUTPUT,
            SizeGroup::RenderResolution,
            ImageFormat::Rgba16Float,
        )?;
        targets.register_depth_target(DEPTH, SizeGroup::RenderResolution, ImageFormat::Depth32Float)?;
        if config.path == VisualPath::Deferred {
            targets.register_color_target(
                GBUFFER_ALBEDO,
                SizeGroup::RenderResolution,
                ImageFormat::Rgba8Srgb,
            )?;
            targets.register_color_target(
                GBUFFER_NORMAL,
                SizeGroup::RenderResolution,
                ImageFormat::Rgba16Float,
            )?;
        }

        let passes = Self::assemble(&ctx, config, &mut targets)?;
        Ok(Self {
            ctx,
            config,
            targets,
            reporter,
            passes: Some(passes),
        })
    }

    /// Deterministically build the pass list: path-specific scene passes in
    /// fixed order, then the flag-gated passes at fixed trailing positions.
    fn assemble(
        ctx: &SharedContext,
        config: PipelineConfig,
        targets: &mut RenderTargets,
    ) -> Result<Vec<Box<dyn Pass>>> {
        let mut passes: Vec<Box<dyn Pass>> = Vec::new();
        match config.path {
            VisualPath::Forward => {
                passes.push(Box::new(DepthPrepass::new(ctx, config.tier)?));
                passes.push(Box::new(ProbeAtlas::new(ctx, targets, config.tier)?));
                passes.push(Box::new(OpaqueForward::new(ctx, config.tier)?));
            }
            VisualPath::Deferred => {
                passes.push(Box::new(GBuffer::new(ctx, config.tier)?));
                passes.push(Box::new(ProbeAtlas::new(ctx, targets, config.tier)?));
                passes.push(Box::new(DeferredLighting::new(ctx)?));
            }
        }
        passes.push(Box::new(Sky::new(ctx, config.tier)?));
        passes.push(Box::new(Transparent::new(ctx, config.tier)?));
        passes.push(Box::new(Tonemap::new(ctx, targets)?));

        if config.flags.error_materials {
            passes.push(Box::new(ErrorMaterials::new(ctx)?));
        }
        if config.flags.editor_gizmos {
            passes.push(Box::new(EditorGizmos::new(ctx)?));
        }
        if config.flags.debug_overlay {
            passes.push(Box::new(DebugOverlay::new(ctx)?));
        }

        debug!("assembled {} passes for {:?}", passes.len(), config.path);
        Ok(passes)
    }

    /// Name of the resource the final image is published under.
    pub fn output_name() -> &'static str {
        OUTPUT
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Pass names in recording order; empty once disposed.
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes
            .as_deref()
            .map(|passes| passes.iter().map(|pass| pass.name()).collect())
            .unwrap_or_default()
    }

    pub fn set_output_resolution(&mut self, width: u32, height: u32) -> Result<()> {
        self.targets.set_output_resolution(width, height)
    }

    pub fn aspect_ratio(&self) -> f32 {
        let resolution = self.targets.size_group_resolution(SizeGroup::OutputResolution);
        resolution.width as f32 / resolution.height.max(1) as f32
    }

    /// Record and submit one frame for this view.
    ///
    /// Opens a recording scope on the backend, records every pass in
    /// assembled order into a fresh graph, publishes the final image under
    /// [`OUTPUT`] and hands the graph to the backend. Any failure abandons
    /// the whole frame: the in-progress graph is discarded, the error is
    /// logged and reported, and the caller decides whether to continue.
    /// The next call starts from a clean graph unconditionally.
    pub fn record(
        &mut self,
        backend: &mut dyn ResourceBackend,
        frame: &FrameContext,
        world: &World,
        stats: &mut RendererStatistics,
    ) -> Result<(), FrameError> {
        let passes = match self.passes.as_mut() {
            None => return Err(FrameError::Disposed),
            Some(passes) => passes,
        };

        backend.begin_frame();
        let mut bindings = PhysicalResourceBindings::new();
        self.targets.bind_targets(&mut bindings);

        let mut graph = FrameGraph::new();
        for pass in passes.iter_mut() {
            let name = pass.name().to_owned();
            if let Err(source) = pass.record(&mut graph, frame, world) {
                backend.discard();
                stats.discard_open_sections();
                error!("recording pass '{name}' failed: {source:#}");
                publish_error!(self.reporter, "frame aborted in pass '{name}'");
                return Err(FrameError::Aborted {
                    pass: name,
                    source,
                });
            }
        }

        let output = match graph.latest_version(&VirtualResource::image(Tonemap::output_name())) {
            Ok(output) => output,
            Err(source) => {
                backend.discard();
                return Err(FrameError::Aborted {
                    pass: "tonemap".to_owned(),
                    source,
                });
            }
        };
        graph.alias(OUTPUT, output.clone());
        graph.export(&output);

        if let Err(err) = backend.execute(graph, &bindings, stats) {
            backend.discard();
            stats.discard_open_sections();
            let pass = err.pass_name().unwrap_or("graph execution").to_owned();
            error!("executing pass '{pass}' failed: {err:#}");
            publish_error!(self.reporter, "frame aborted in pass '{pass}'");
            return Err(FrameError::Aborted {
                pass,
                source: err.into(),
            });
        }
        Ok(())
    }

    /// Dispose every pass in list order and drop the list. Idempotent;
    /// recording after this returns [`FrameError::Disposed`].
    pub fn dispose(&mut self) {
        let Some(mut passes) = self.passes.take() else {
            return;
        };
        debug!("disposing {} passes", passes.len());
        for pass in &mut passes {
            pass.dispose(&self.ctx);
        }
    }
}
