/// Arrangement of the scene passes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VisualPath {
    /// Geometry is shaded directly into the scene color target.
    Forward,
    /// Geometry attributes are laid down first, shading happens in a
    /// fullscreen resolve over the gbuffer.
    Deferred,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

impl QualityTier {
    /// Sample count for the scene geometry pipelines.
    pub fn msaa_samples(self) -> u32 {
        match self {
            QualityTier::Low => 1,
            QualityTier::Medium => 4,
            QualityTier::High => 8,
        }
    }

    /// Edge length of the shared reflection probe atlas, in texels.
    pub fn probe_atlas_size(self) -> u32 {
        match self {
            QualityTier::Low => 512,
            QualityTier::Medium => 1024,
            QualityTier::High => 2048,
        }
    }
}

/// Debug and editor passes appended behind the scene passes.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    pub debug_overlay: bool,
    pub editor_gizmos: bool,
    pub error_materials: bool,
}

/// Selects the pass list a [`ViewRenderer`](crate::ViewRenderer) assembles.
/// Consumed at construction only; changing the configuration means building
/// a new renderer, there is no incremental patching of a live pass list.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub path: VisualPath,
    pub tier: QualityTier,
    pub flags: FeatureFlags,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            path: VisualPath::Forward,
            tier: QualityTier::Medium,
            flags: FeatureFlags::default(),
        }
    }
}
