use glam::Vec3;

use crate::RenderOptions;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

/// One light collected for rendering.
#[derive(Debug, Copy, Clone)]
pub struct Light {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub kind: LightKind,
}

/// A reflection probe whose baked texture data is waiting for a slot in the
/// shared probe atlas.
#[derive(Debug, Copy, Clone)]
pub struct ReflectionProbe {
    pub position: Vec3,
    /// Edge length of the probe's baked region, in texels.
    pub baked_size: u32,
}

/// Scene data collected for the renderer. Producing it (visibility, light
/// gathering, probe baking) happens outside the frame core; the renderer
/// only reads it.
#[derive(Debug)]
pub struct World {
    /// Direction vector pointing away from the sun.
    pub sun_direction: Vec3,
    pub lights: Vec<Light>,
    pub probes: Vec<ReflectionProbe>,
    /// Objects whose material failed to compile; drawn with the error
    /// material when that pass is enabled.
    pub failed_materials: u32,
    pub options: RenderOptions,
}

impl World {
    pub fn new() -> Self {
        World {
            sun_direction: Vec3::new(0.2, -1.0, 0.3).normalize(),
            lights: Vec::new(),
            probes: Vec::new(),
            failed_materials: 0,
            options: RenderOptions::default(),
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
