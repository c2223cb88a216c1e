use std::collections::HashMap;
use std::fmt;

/// Name plus version of a transient or persistent resource inside one
/// frame's recording scope.
///
/// Version 0 is the resource's pre-frame contents; every write produces the
/// next version. Handles are only meaningful within the frame graph that
/// produced them and must not be cached across frames — query
/// [`latest_version`](crate::FrameGraph::latest_version) again each frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualResource {
    name: String,
    version: u32,
}

impl VirtualResource {
    /// Handle to the initial (pre-frame) contents of an image resource.
    pub fn image(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub(crate) fn with_version(name: &str, version: u32) -> Self {
        Self {
            name: name.to_owned(),
            version,
        }
    }

    pub(crate) fn next_version(&self) -> Self {
        Self {
            name: self.name.clone(),
            version: self.version + 1,
        }
    }
}

impl fmt::Display for VirtualResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// How a pass touches a declared resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Pipeline stage at which a declared read or write happens.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PipelineStage {
    VertexShader,
    FragmentShader,
    ComputeShader,
    AttachmentOutput,
    Transfer,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImageFormat {
    Rgba8Srgb,
    Rgba16Float,
    Rgba32Float,
    Depth32Float,
}

/// Concrete image bound under a resource name for the current frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BoundImage {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

/// Maps virtual resource names to the physical images backing them. Rebuilt
/// by the orchestrator every frame from the render-target registry.
#[derive(Debug, Default)]
pub struct PhysicalResourceBindings {
    images: HashMap<String, BoundImage>,
}

impl PhysicalResourceBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_image(&mut self, name: impl Into<String>, image: BoundImage) {
        self.images.insert(name.into(), image);
    }

    /// Resolve a virtual resource to the image bound under its name.
    pub fn resolve(&self, resource: &VirtualResource) -> Option<&BoundImage> {
        self.images.get(resource.name())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.images.contains_key(name)
    }
}
