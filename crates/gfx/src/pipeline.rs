use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use anyhow::{bail, Result};

use crate::SharedContext;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

/// The set of compiled shaders available for pipeline construction.
///
/// A pipeline referencing a shader that is missing from the catalog fails to
/// build; that failure is the hard initialization error surface for passes.
#[derive(Debug, Clone, Default)]
pub struct ShaderCatalog {
    shaders: HashSet<String>,
}

impl ShaderCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: impl Into<String>) {
        self.shaders.insert(path.into());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.shaders.contains(path)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PipelineKind {
    Graphics,
    Compute,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompareOp {
    Less,
    LessOrEqual,
    Always,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BlendMode {
    None,
    Alpha,
    Additive,
}

/// Resident description of a built pipeline. Stands in for compiled GPU
/// pipeline state; lives in the [`PipelineCache`] until the owning pass
/// disposes it.
#[derive(Debug, Clone)]
pub struct PipelineDesc {
    pub name: String,
    pub kind: PipelineKind,
    pub shaders: Vec<(String, ShaderStage)>,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: CompareOp,
    pub blend: BlendMode,
    pub samples: u32,
    pub wireframe: bool,
}

/// Builder through which passes describe their resident pipeline state.
#[derive(Debug)]
pub struct PipelineBuilder {
    desc: PipelineDesc,
}

impl PipelineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            desc: PipelineDesc {
                name: name.into(),
                kind: PipelineKind::Graphics,
                shaders: Vec::new(),
                depth_test: false,
                depth_write: false,
                depth_compare: CompareOp::Always,
                blend: BlendMode::None,
                samples: 1,
                wireframe: false,
            },
        }
    }

    pub fn compute(name: impl Into<String>) -> Self {
        let mut builder = Self::new(name);
        builder.desc.kind = PipelineKind::Compute;
        builder
    }

    pub fn attach_shader(mut self, path: impl Into<String>, stage: ShaderStage) -> Self {
        self.desc.shaders.push((path.into(), stage));
        self
    }

    pub fn depth(mut self, test: bool, write: bool, compare: CompareOp) -> Self {
        self.desc.depth_test = test;
        self.desc.depth_write = write;
        self.desc.depth_compare = compare;
        self
    }

    pub fn blend(mut self, blend: BlendMode) -> Self {
        self.desc.blend = blend;
        self
    }

    pub fn samples(mut self, samples: u32) -> Self {
        self.desc.samples = samples;
        self
    }

    pub fn wireframe(mut self, enabled: bool) -> Self {
        self.desc.wireframe = enabled;
        self
    }

    /// Validate against the shader catalog and register with the shared
    /// cache. Fails if any referenced shader is missing; passes propagate
    /// this out of their constructors.
    pub fn build(self, ctx: &SharedContext) -> Result<()> {
        if self.desc.shaders.is_empty() {
            bail!("pipeline '{}' has no shader stages", self.desc.name);
        }
        for (path, _) in &self.desc.shaders {
            if !ctx.shaders.contains(path) {
                bail!(
                    "shader '{}' required by pipeline '{}' is not in the catalog",
                    path,
                    self.desc.name
                );
            }
        }
        ctx.pipelines.register(self.desc);
        Ok(())
    }
}

/// Shared, internally synchronized store of built pipelines.
#[derive(Debug, Clone, Default)]
pub struct PipelineCache {
    inner: Arc<RwLock<HashMap<String, PipelineDesc>>>,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, desc: PipelineDesc) {
        self.inner.write().unwrap().insert(desc.name.clone(), desc);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().unwrap().contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<PipelineDesc> {
        self.inner.read().unwrap().get(name).cloned()
    }

    /// Remove a pipeline. Returns whether it existed; used by passes when
    /// they dispose their resident state.
    pub fn remove(&self, name: &str) -> bool {
        self.inner.write().unwrap().remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{CompareOp, PipelineBuilder, ShaderCatalog, ShaderStage};
    use crate::SharedContext;

    fn catalog(paths: &[&str]) -> ShaderCatalog {
        let mut catalog = ShaderCatalog::new();
        for path in paths {
            catalog.register(*path);
        }
        catalog
    }

    #[test]
    fn build_registers_in_the_shared_cache() {
        let ctx = SharedContext::new(catalog(&["shaders/src/a.vert.hlsl"]));
        PipelineBuilder::new("flat")
            .attach_shader("shaders/src/a.vert.hlsl", ShaderStage::Vertex)
            .depth(true, true, CompareOp::Less)
            .build(&ctx)
            .unwrap();
        assert!(ctx.pipelines.contains("flat"));
        assert!(ctx.pipelines.remove("flat"));
        assert!(ctx.pipelines.is_empty());
    }

    #[test]
    fn missing_shader_fails_loudly() {
        let ctx = SharedContext::new(catalog(&[]));
        let result = PipelineBuilder::new("flat")
            .attach_shader("shaders/src/missing.frag.hlsl", ShaderStage::Fragment)
            .build(&ctx);
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("shaders/src/missing.frag.hlsl"));
        assert!(!ctx.pipelines.contains("flat"));
    }

    #[test]
    fn empty_pipeline_is_rejected() {
        let ctx = SharedContext::new(catalog(&[]));
        assert!(PipelineBuilder::new("nothing").build(&ctx).is_err());
    }
}
