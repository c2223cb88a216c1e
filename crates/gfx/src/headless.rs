use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};
use log::debug;
use statistics::RendererStatistics;

use crate::backend::{ExecuteError, ResourceBackend};
use crate::command::CommandList;
use crate::graph::FrameGraph;
use crate::pipeline::{PipelineCache, PipelineKind};
use crate::resource::{PhysicalResourceBindings, VirtualResource};
use crate::SharedContext;

/// Backend double for the demo driver and for tests.
///
/// Resolves declarations in declaration order, culls passes whose outputs
/// never reach an exported resource, and runs the surviving command
/// callbacks against a counting command list. Keeps a journal of the most
/// recent frame so callers can inspect what actually ran.
#[derive(Debug)]
pub struct HeadlessBackend {
    pipelines: PipelineCache,
    recording: bool,
    executed: Vec<String>,
    culled: Vec<String>,
    frames_submitted: u64,
    total_draws: u64,
    total_dispatches: u64,
}

impl HeadlessBackend {
    pub fn new(ctx: &SharedContext) -> Self {
        Self {
            pipelines: ctx.pipelines.clone(),
            recording: false,
            executed: Vec::new(),
            culled: Vec::new(),
            frames_submitted: 0,
            total_draws: 0,
            total_dispatches: 0,
        }
    }

    /// Pass names executed by the most recent completed frame, in order.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// Pass names culled by the most recent completed frame.
    pub fn culled(&self) -> &[String] {
        &self.culled
    }

    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    pub fn total_draws(&self) -> u64 {
        self.total_draws
    }

    pub fn total_dispatches(&self) -> u64 {
        self.total_dispatches
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Check that every declared read is satisfiable at its declaration
    /// point: either a bound persistent image (version 0) or the output of
    /// an earlier pass.
    fn validate(
        graph: &FrameGraph<'_>,
        bindings: &PhysicalResourceBindings,
    ) -> Result<(), ExecuteError> {
        let mut written: HashMap<&str, u32> = HashMap::new();
        for pass in graph.passes() {
            for usage in pass.reads() {
                let resource = &usage.resource;
                let seen = written.get(resource.name()).copied().unwrap_or(0);
                let satisfied = if resource.version() == 0 {
                    bindings.contains(resource.name())
                } else {
                    seen >= resource.version()
                };
                if !satisfied {
                    return Err(ExecuteError::ReadBeforeWrite {
                        pass: pass.name().to_owned(),
                        resource: resource.to_string(),
                    });
                }
            }
            for usage in pass.writes() {
                let version = written.entry(usage.resource.name()).or_insert(0);
                *version = (*version).max(usage.resource.version());
            }
        }
        Ok(())
    }

    /// Liveness per pass: exported outputs and never-cull passes are roots;
    /// liveness propagates producer-ward through declared reads.
    fn live_passes(graph: &FrameGraph<'_>) -> Vec<bool> {
        let mut producers: HashMap<(&str, u32), usize> = HashMap::new();
        for (index, pass) in graph.passes().iter().enumerate() {
            for usage in pass.writes() {
                producers.insert((usage.resource.name(), usage.resource.version()), index);
            }
        }

        let mut live = vec![false; graph.pass_count()];
        let mut worklist = Vec::new();
        for (index, pass) in graph.passes().iter().enumerate() {
            if pass.never_cull() {
                live[index] = true;
                worklist.push(index);
            }
        }
        for export in graph.exports() {
            if let Some(&index) = producers.get(&(export.name(), export.version())) {
                if !live[index] {
                    live[index] = true;
                    worklist.push(index);
                }
            }
        }

        while let Some(index) = worklist.pop() {
            let reads: Vec<VirtualResource> = graph.passes()[index]
                .reads()
                .map(|usage| usage.resource.clone())
                .collect();
            for resource in reads {
                if resource.version() == 0 {
                    continue;
                }
                if let Some(&producer) = producers.get(&(resource.name(), resource.version())) {
                    if !live[producer] {
                        live[producer] = true;
                        worklist.push(producer);
                    }
                }
            }
        }
        live
    }
}

impl ResourceBackend for HeadlessBackend {
    fn begin_frame(&mut self) {
        self.recording = true;
        self.executed.clear();
        self.culled.clear();
    }

    fn execute(
        &mut self,
        mut graph: FrameGraph<'_>,
        bindings: &PhysicalResourceBindings,
        stats: &mut RendererStatistics,
    ) -> Result<(), ExecuteError> {
        if !self.recording {
            return Err(ExecuteError::NotRecording);
        }
        Self::validate(&graph, bindings)?;
        let live = Self::live_passes(&graph);

        for (index, pass) in graph.passes_mut().iter_mut().enumerate() {
            let name = pass.name().to_owned();
            if !live[index] {
                debug!("culling pass '{name}': no consumer for its outputs");
                self.culled.push(name);
                continue;
            }

            let mut cmd = CountingCommandList::new(&self.pipelines, bindings);
            stats.begin_section(&name).map_err(|source| ExecuteError::Pass {
                pass: name.clone(),
                source,
            })?;
            let ran = pass.run(&mut cmd, bindings, stats);
            let closed = stats.end_section(&name);
            ran.map_err(|source| ExecuteError::Pass {
                pass: name.clone(),
                source,
            })?;
            closed.map_err(|source| ExecuteError::Pass {
                pass: name.clone(),
                source,
            })?;

            self.total_draws += u64::from(cmd.draws);
            self.total_dispatches += u64::from(cmd.dispatches);
            self.executed.push(name);
        }

        self.recording = false;
        self.frames_submitted += 1;
        Ok(())
    }

    fn discard(&mut self) {
        self.recording = false;
        self.executed.clear();
        self.culled.clear();
    }
}

/// Command list that validates binds against the pipeline cache and counts
/// work instead of talking to a GPU.
#[derive(Debug)]
pub struct CountingCommandList<'a> {
    pipelines: &'a PipelineCache,
    bindings: &'a PhysicalResourceBindings,
    bound: Option<PipelineKind>,
    pub draws: u32,
    pub dispatches: u32,
}

impl<'a> CountingCommandList<'a> {
    pub fn new(pipelines: &'a PipelineCache, bindings: &'a PhysicalResourceBindings) -> Self {
        Self {
            pipelines,
            bindings,
            bound: None,
            draws: 0,
            dispatches: 0,
        }
    }

    fn bind_pipeline(&mut self, name: &str, kind: PipelineKind) -> Result<()> {
        let desc = self
            .pipelines
            .get(name)
            .ok_or_else(|| anyhow!("pipeline '{name}' was never built"))?;
        if desc.kind != kind {
            bail!("pipeline '{name}' is a {:?} pipeline", desc.kind);
        }
        self.bound = Some(kind);
        Ok(())
    }

    fn resolve_image(&self, image: &VirtualResource) -> Result<()> {
        if !self.bindings.contains(image.name()) {
            bail!("no physical image bound for '{}'", image.name());
        }
        Ok(())
    }
}

impl CommandList for CountingCommandList<'_> {
    fn bind_graphics_pipeline(&mut self, name: &str) -> Result<()> {
        self.bind_pipeline(name, PipelineKind::Graphics)
    }

    fn bind_compute_pipeline(&mut self, name: &str) -> Result<()> {
        self.bind_pipeline(name, PipelineKind::Compute)
    }

    fn full_viewport_scissor(&mut self) {}

    fn bind_uniform_data(&mut self, _set: u32, _binding: u32, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            bail!("empty uniform upload");
        }
        Ok(())
    }

    fn bind_sampled_image(
        &mut self,
        _set: u32,
        _binding: u32,
        image: &VirtualResource,
    ) -> Result<()> {
        self.resolve_image(image)
    }

    fn bind_storage_image(
        &mut self,
        _set: u32,
        _binding: u32,
        image: &VirtualResource,
    ) -> Result<()> {
        self.resolve_image(image)
    }

    fn push_constants(&mut self, data: &[u8]) -> Result<()> {
        // The usual guaranteed minimum.
        if data.len() > 128 {
            bail!("push constant range of {} bytes exceeds 128", data.len());
        }
        Ok(())
    }

    fn draw(&mut self, _vertex_count: u32, _instance_count: u32) -> Result<()> {
        if self.bound != Some(PipelineKind::Graphics) {
            bail!("draw without a graphics pipeline bound");
        }
        self.draws += 1;
        Ok(())
    }

    fn draw_indexed(&mut self, _index_count: u32, _instance_count: u32) -> Result<()> {
        if self.bound != Some(PipelineKind::Graphics) {
            bail!("draw without a graphics pipeline bound");
        }
        self.draws += 1;
        Ok(())
    }

    fn dispatch(&mut self, _groups_x: u32, _groups_y: u32, _groups_z: u32) -> Result<()> {
        if self.bound != Some(PipelineKind::Compute) {
            bail!("dispatch without a compute pipeline bound");
        }
        self.dispatches += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use statistics::RendererStatistics;

    use super::HeadlessBackend;
    use crate::backend::{ExecuteError, ResourceBackend};
    use crate::graph::{AttachmentLoadOp, FrameGraph, PassBuilder};
    use crate::resource::{
        BoundImage, ImageFormat, PhysicalResourceBindings, PipelineStage, VirtualResource,
    };
    use crate::{ShaderCatalog, SharedContext};

    fn context() -> SharedContext {
        SharedContext::new(ShaderCatalog::new())
    }

    fn bound(names: &[&str]) -> PhysicalResourceBindings {
        let mut bindings = PhysicalResourceBindings::new();
        for name in names {
            bindings.bind_image(
                *name,
                BoundImage {
                    width: 64,
                    height: 64,
                    format: ImageFormat::Rgba8Srgb,
                },
            );
        }
        bindings
    }

    #[test]
    fn exported_chain_runs_and_dead_pass_is_culled() {
        let ctx = context();
        let mut backend = HeadlessBackend::new(&ctx);
        let mut stats = RendererStatistics::new();
        let bindings = bound(&["scene", "out", "scratch"]);

        let mut graph = FrameGraph::new();
        let scene = VirtualResource::image("scene");
        graph.add_pass(
            PassBuilder::render("produce_scene")
                .color_attachment(&scene, AttachmentLoadOp::Clear, Some([0.0; 4]))
                .unwrap()
                .build(),
        );
        let scene_latest = graph.latest_version(&scene).unwrap();
        let out = VirtualResource::image("out");
        graph.add_pass(
            PassBuilder::render("compose")
                .color_attachment(&out, AttachmentLoadOp::Clear, Some([0.0; 4]))
                .unwrap()
                .sample_image(&scene_latest, PipelineStage::FragmentShader)
                .build(),
        );
        // Writes nothing anyone reads.
        let scratch = VirtualResource::image("scratch");
        graph.add_pass(
            PassBuilder::render("dead")
                .color_attachment(&scratch, AttachmentLoadOp::Clear, Some([0.0; 4]))
                .unwrap()
                .build(),
        );
        let final_out = graph.latest_version(&out).unwrap();
        graph.export(&final_out);

        backend.begin_frame();
        backend.execute(graph, &bindings, &mut stats).unwrap();
        assert_eq!(backend.executed(), ["produce_scene", "compose"]);
        assert_eq!(backend.culled(), ["dead"]);
        assert_eq!(backend.frames_submitted(), 1);
    }

    #[test]
    fn never_cull_keeps_a_side_effect_pass_alive() {
        let ctx = context();
        let mut backend = HeadlessBackend::new(&ctx);
        let mut stats = RendererStatistics::new();
        let bindings = bound(&[]);

        let mut graph = FrameGraph::new();
        graph.add_pass(PassBuilder::render("overlay").never_cull().build());

        backend.begin_frame();
        backend.execute(graph, &bindings, &mut stats).unwrap();
        assert_eq!(backend.executed(), ["overlay"]);
        assert!(backend.culled().is_empty());
    }

    #[test]
    fn read_before_write_is_rejected() {
        let ctx = context();
        let mut backend = HeadlessBackend::new(&ctx);
        let mut stats = RendererStatistics::new();
        let bindings = bound(&["out"]);

        let mut graph = FrameGraph::new();
        let out = VirtualResource::image("out");
        // "mystery" is neither bound nor produced by an earlier pass.
        graph.add_pass(
            PassBuilder::render("compose")
                .color_attachment(&out, AttachmentLoadOp::Clear, Some([0.0; 4]))
                .unwrap()
                .sample_image(&VirtualResource::image("mystery"), PipelineStage::FragmentShader)
                .never_cull()
                .build(),
        );

        backend.begin_frame();
        let error = backend.execute(graph, &bindings, &mut stats).unwrap_err();
        match error {
            ExecuteError::ReadBeforeWrite { pass, resource } => {
                assert_eq!(pass, "compose");
                assert!(resource.contains("mystery"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn execute_without_begin_frame_is_rejected() {
        let ctx = context();
        let mut backend = HeadlessBackend::new(&ctx);
        let mut stats = RendererStatistics::new();
        let error = backend
            .execute(FrameGraph::new(), &bound(&[]), &mut stats)
            .unwrap_err();
        assert!(matches!(error, ExecuteError::NotRecording));
    }

    #[test]
    fn failing_callback_surfaces_the_pass_name() {
        let ctx = context();
        let mut backend = HeadlessBackend::new(&ctx);
        let mut stats = RendererStatistics::new();
        let bindings = bound(&[]);

        let mut graph = FrameGraph::new();
        graph.add_pass(
            PassBuilder::render("exploding")
                .never_cull()
                .execute_fn(|_cmd, _bindings, _stats| Err(anyhow!("shader blew up")))
                .build(),
        );

        backend.begin_frame();
        let error = backend.execute(graph, &bindings, &mut stats).unwrap_err();
        assert_eq!(error.pass_name(), Some("exploding"));

        // Discard puts the backend back into a clean, reusable state.
        backend.discard();
        assert!(!backend.is_recording());
        assert!(backend.executed().is_empty());

        let mut graph = FrameGraph::new();
        graph.add_pass(PassBuilder::render("fine").never_cull().build());
        backend.begin_frame();
        backend.execute(graph, &bindings, &mut stats).unwrap();
        assert_eq!(backend.executed(), ["fine"]);
    }

    #[test]
    fn draw_without_pipeline_fails_the_pass() {
        let ctx = context();
        let mut backend = HeadlessBackend::new(&ctx);
        let mut stats = RendererStatistics::new();
        let bindings = bound(&[]);

        let mut graph = FrameGraph::new();
        graph.add_pass(
            PassBuilder::render("no_pipeline")
                .never_cull()
                .execute_fn(|cmd, _bindings, _stats| cmd.draw(3, 1))
                .build(),
        );

        backend.begin_frame();
        let error = backend.execute(graph, &bindings, &mut stats).unwrap_err();
        assert_eq!(error.pass_name(), Some("no_pipeline"));
    }
}
