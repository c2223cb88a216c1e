#[derive(Debug, Copy, Clone)]
pub struct RenderOptions {
    /// Multiplier applied to the sky contribution.
    pub sky_intensity: f32,
    /// Maximum number of probe atlas regions refreshed per frame.
    pub probe_update_budget: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            sky_intensity: 1.0,
            probe_update_budget: 8,
        }
    }
}
