use std::collections::HashMap;

use anyhow::{bail, Result};
use derivative::Derivative;
use statistics::RendererStatistics;

use crate::command::CommandList;
use crate::resource::{Access, PhysicalResourceBindings, PipelineStage, VirtualResource};

/// What happens to an attachment's previous contents when the pass starts
/// rendering into it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AttachmentLoadOp {
    /// Keep the previous contents; the pass becomes a consumer of them.
    Load,
    /// Discard the previous contents.
    Clear,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    Depth(f32),
}

#[derive(Debug, Clone)]
pub struct Attachment {
    /// The version this pass produces.
    pub resource: VirtualResource,
    pub load: AttachmentLoadOp,
    pub clear: Option<ClearValue>,
}

/// One declared resource touch: who, how, and at which stage.
#[derive(Debug, Clone)]
pub struct ResourceUsage {
    pub resource: VirtualResource,
    pub access: Access,
    pub stage: PipelineStage,
}

pub type ExecuteFn<'cb> = Box<
    dyn FnMut(&mut dyn CommandList, &PhysicalResourceBindings, &mut RendererStatistics) -> Result<()>
        + 'cb,
>;

/// A recorded pass: its declared resource usage plus the callback that emits
/// its commands when the backend decides to run it.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct PassNode<'cb> {
    name: String,
    color_attachments: Vec<Attachment>,
    depth_attachment: Option<Attachment>,
    usages: Vec<ResourceUsage>,
    never_cull: bool,
    #[derivative(Debug = "ignore")]
    execute: Option<ExecuteFn<'cb>>,
}

impl<'cb> PassNode<'cb> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color_attachments(&self) -> &[Attachment] {
        &self.color_attachments
    }

    pub fn depth_attachment(&self) -> Option<&Attachment> {
        self.depth_attachment.as_ref()
    }

    pub fn usages(&self) -> &[ResourceUsage] {
        &self.usages
    }

    pub fn reads(&self) -> impl Iterator<Item = &ResourceUsage> {
        self.usages.iter().filter(|usage| usage.access == Access::Read)
    }

    pub fn writes(&self) -> impl Iterator<Item = &ResourceUsage> {
        self.usages.iter().filter(|usage| usage.access == Access::Write)
    }

    pub fn never_cull(&self) -> bool {
        self.never_cull
    }

    /// Run the pass's command callback, if it installed one.
    pub fn run(
        &mut self,
        cmd: &mut dyn CommandList,
        bindings: &PhysicalResourceBindings,
        stats: &mut RendererStatistics,
    ) -> Result<()> {
        match self.execute.as_mut() {
            Some(execute) => execute(cmd, bindings, stats),
            None => Ok(()),
        }
    }
}

/// Builds one [`PassNode`], phrasing resource declarations the way passes
/// think about them: attachments, sampled inputs, storage outputs.
pub struct PassBuilder<'cb> {
    pass: PassNode<'cb>,
}

impl<'cb> PassBuilder<'cb> {
    /// Start building a raster pass.
    pub fn render(name: impl Into<String>) -> Self {
        Self {
            pass: PassNode {
                name: name.into(),
                color_attachments: Vec::new(),
                depth_attachment: None,
                usages: Vec::new(),
                never_cull: false,
                execute: None,
            },
        }
    }

    /// Start building a compute pass. Identical recording surface; the
    /// distinction only matters to the backend's scheduling.
    pub fn compute(name: impl Into<String>) -> Self {
        Self::render(name)
    }

    /// Declare a color attachment. `resource` is the version being rendered
    /// over; the pass produces the next version of it.
    pub fn color_attachment(
        mut self,
        resource: &VirtualResource,
        load: AttachmentLoadOp,
        clear: Option<[f32; 4]>,
    ) -> Result<Self> {
        if self
            .pass
            .color_attachments
            .iter()
            .any(|attachment| attachment.resource.name() == resource.name())
        {
            bail!(
                "pass '{}' already has a color attachment for '{}'",
                self.pass.name,
                resource.name()
            );
        }
        let produced = self.declare_attachment(resource, load, PipelineStage::AttachmentOutput);
        self.pass.color_attachments.push(Attachment {
            resource: produced,
            load,
            clear: clear.map(ClearValue::Color),
        });
        Ok(self)
    }

    /// Declare the depth attachment. At most one per pass.
    pub fn depth_attachment(
        mut self,
        resource: &VirtualResource,
        load: AttachmentLoadOp,
        clear: Option<f32>,
    ) -> Result<Self> {
        if self.pass.depth_attachment.is_some() {
            bail!("pass '{}' already has a depth attachment", self.pass.name);
        }
        let produced = self.declare_attachment(resource, load, PipelineStage::AttachmentOutput);
        self.pass.depth_attachment = Some(Attachment {
            resource: produced,
            load,
            clear: clear.map(ClearValue::Depth),
        });
        Ok(self)
    }

    /// Declare a sampled-image read, making this pass a consumer of
    /// `resource` (and keeping its producer alive under culling).
    pub fn sample_image(mut self, resource: &VirtualResource, stage: PipelineStage) -> Self {
        self.pass.usages.push(ResourceUsage {
            resource: resource.clone(),
            access: Access::Read,
            stage,
        });
        self
    }

    /// Declare a non-attachment image write (compute or transfer target).
    /// The pass produces the next version of `resource`.
    pub fn write_image(mut self, resource: &VirtualResource, stage: PipelineStage) -> Self {
        self.pass.usages.push(ResourceUsage {
            resource: resource.next_version(),
            access: Access::Write,
            stage,
        });
        self
    }

    /// Exempt this pass from automatic culling. Required for passes whose
    /// effects are invisible to dependency analysis, e.g. debug overlays
    /// drawing straight to the backbuffer.
    pub fn never_cull(mut self) -> Self {
        self.pass.never_cull = true;
        self
    }

    pub fn execute_fn<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut dyn CommandList, &PhysicalResourceBindings, &mut RendererStatistics) -> Result<()>
            + 'cb,
    {
        self.pass.execute = Some(Box::new(callback));
        self
    }

    pub fn build(self) -> PassNode<'cb> {
        self.pass
    }

    fn declare_attachment(
        &mut self,
        resource: &VirtualResource,
        load: AttachmentLoadOp,
        stage: PipelineStage,
    ) -> VirtualResource {
        if load == AttachmentLoadOp::Load {
            self.pass.usages.push(ResourceUsage {
                resource: resource.clone(),
                access: Access::Read,
                stage,
            });
        }
        let produced = resource.next_version();
        self.pass.usages.push(ResourceUsage {
            resource: produced.clone(),
            access: Access::Write,
            stage,
        });
        produced
    }
}

/// One frame's recorded passes and resource versions.
///
/// Rebuilt from scratch every frame; passes execute in the order they were
/// added. Handles obtained from a graph die with it.
#[derive(Debug, Default)]
pub struct FrameGraph<'cb> {
    passes: Vec<PassNode<'cb>>,
    versions: HashMap<String, u32>,
    aliases: HashMap<String, VirtualResource>,
    exports: Vec<VirtualResource>,
}

impl<'cb> FrameGraph<'cb> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pass. Passes execute in the order they are added; dependency
    /// resolution is by declaration order within the frame.
    pub fn add_pass(&mut self, pass: PassNode<'cb>) {
        for usage in pass.writes() {
            let version = self
                .versions
                .entry(usage.resource.name().to_owned())
                .or_insert(0);
            *version = (*version).max(usage.resource.version());
        }
        self.passes.push(pass);
    }

    /// Newest version of a resource as of the passes added so far. Resolves
    /// aliases; a resource no pass has written resolves to version 0 (its
    /// pre-frame contents).
    pub fn latest_version(&self, resource: &VirtualResource) -> Result<VirtualResource> {
        let mut name = resource.name();
        let mut hops = 0;
        while let Some(target) = self.aliases.get(name) {
            name = target.name();
            hops += 1;
            if hops > self.aliases.len() {
                bail!("alias cycle while resolving '{}'", resource.name());
            }
        }
        let version = self.versions.get(name).copied().unwrap_or(0);
        Ok(VirtualResource::with_version(name, version))
    }

    /// Publish a resource under an additional name, so consumers can find
    /// the final image without knowing which pass produced it.
    pub fn alias(&mut self, name: impl Into<String>, resource: VirtualResource) {
        self.aliases.insert(name.into(), resource);
    }

    /// Mark a resource as consumed by presentation. Exported resources and
    /// their transitive producers survive pass culling.
    pub fn export(&mut self, resource: &VirtualResource) {
        self.exports.push(resource.clone());
    }

    pub fn passes(&self) -> &[PassNode<'cb>] {
        &self.passes
    }

    pub fn passes_mut(&mut self) -> &mut [PassNode<'cb>] {
        &mut self.passes
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn exports(&self) -> &[VirtualResource] {
        &self.exports
    }
}

#[cfg(test)]
mod tests {
    use super::{AttachmentLoadOp, FrameGraph, PassBuilder};
    use crate::resource::{PipelineStage, VirtualResource};

    #[test]
    fn writes_bump_the_version() {
        let mut graph = FrameGraph::new();
        let color = VirtualResource::image("scene_output");
        assert_eq!(graph.latest_version(&color).unwrap().version(), 0);

        let pass = PassBuilder::render("opaque")
            .color_attachment(&color, AttachmentLoadOp::Clear, Some([0.0; 4]))
            .unwrap()
            .build();
        graph.add_pass(pass);
        assert_eq!(graph.latest_version(&color).unwrap().version(), 1);

        let latest = graph.latest_version(&color).unwrap();
        let pass = PassBuilder::render("sky")
            .color_attachment(&latest, AttachmentLoadOp::Load, None)
            .unwrap()
            .build();
        graph.add_pass(pass);
        assert_eq!(graph.latest_version(&color).unwrap().version(), 2);
    }

    #[test]
    fn load_declares_a_read_of_the_previous_version() {
        let color = VirtualResource::image("scene_output");
        let pass = PassBuilder::render("sky")
            .color_attachment(&color, AttachmentLoadOp::Load, None)
            .unwrap()
            .build();
        let reads: Vec<_> = pass.reads().map(|usage| usage.resource.clone()).collect();
        let writes: Vec<_> = pass.writes().map(|usage| usage.resource.clone()).collect();
        assert_eq!(reads, vec![color.clone()]);
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].version(), 1);
    }

    #[test]
    fn duplicate_attachments_are_rejected() {
        let color = VirtualResource::image("scene_output");
        let result = PassBuilder::render("broken")
            .color_attachment(&color, AttachmentLoadOp::Clear, Some([0.0; 4]))
            .unwrap()
            .color_attachment(&color, AttachmentLoadOp::Load, None);
        assert!(result.is_err());

        let depth = VirtualResource::image("depth");
        let result = PassBuilder::render("broken")
            .depth_attachment(&depth, AttachmentLoadOp::Clear, Some(1.0))
            .unwrap()
            .depth_attachment(&depth, AttachmentLoadOp::Load, None);
        assert!(result.is_err());
    }

    #[test]
    fn alias_resolves_to_the_target_version() {
        let mut graph = FrameGraph::new();
        let color = VirtualResource::image("tonemap_output");
        let pass = PassBuilder::render("tonemap")
            .color_attachment(&color, AttachmentLoadOp::Clear, Some([0.0; 4]))
            .unwrap()
            .build();
        graph.add_pass(pass);

        let latest = graph.latest_version(&color).unwrap();
        graph.alias("renderer_output", latest.clone());
        let resolved = graph
            .latest_version(&VirtualResource::image("renderer_output"))
            .unwrap();
        assert_eq!(resolved, latest);
    }

    #[test]
    fn write_image_produces_the_next_version() {
        let mut graph = FrameGraph::new();
        let atlas = VirtualResource::image("probe_atlas");
        let pass = PassBuilder::compute("probe_blit")
            .write_image(&atlas, PipelineStage::ComputeShader)
            .build();
        graph.add_pass(pass);
        assert_eq!(graph.latest_version(&atlas).unwrap().version(), 1);
    }
}
