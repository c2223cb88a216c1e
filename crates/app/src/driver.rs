use std::sync::Arc;

use anyhow::Result;
use error::{LogReporter, Reporter};
use gfx::{CullingResults, FrameContext, HeadlessBackend, ShaderCatalog, SharedContext};
use glam::{Mat4, Vec3};
use log::{info, warn};
use renderer::{FeatureFlags, FrameError, PipelineConfig, QualityTier, ViewRenderer, VisualPath};
use statistics::RendererStatistics;
use util::SafeUnwrap;
use world::{Light, LightKind, ReflectionProbe, World};

const OUTPUT_WIDTH: u32 = 1280;
const OUTPUT_HEIGHT: u32 = 720;

/// Every shader the demo's pipeline configurations can reference. A real
/// host would fill the catalog from its compiled shader directory.
const SHADERS: &[&str] = &[
    "shaders/src/mesh.vert.hlsl",
    "shaders/src/fullscreen.vert.hlsl",
    "shaders/src/forward_shading.frag.hlsl",
    "shaders/src/gbuffer.frag.hlsl",
    "shaders/src/deferred_shading.frag.hlsl",
    "shaders/src/sky.frag.hlsl",
    "shaders/src/transparent.frag.hlsl",
    "shaders/src/tonemap.frag.hlsl",
    "shaders/src/overlay.vert.hlsl",
    "shaders/src/overlay.frag.hlsl",
    "shaders/src/gizmo.vert.hlsl",
    "shaders/src/gizmo.frag.hlsl",
    "shaders/src/error_material.frag.hlsl",
    "shaders/src/probe_blit.comp.hlsl",
];

/// Headless application driver. Owns the world, the backend and the view
/// renderer, and runs one record→execute cycle per call to
/// [`process_frame`](Self::process_frame).
pub struct Driver {
    world: World,
    reporter: Arc<dyn Reporter>,
    backend: HeadlessBackend,
    renderer: ViewRenderer,
    stats: RendererStatistics,
    frame_index: u32,
    aborted_frames: u32,
}

impl Driver {
    pub fn init() -> Result<Driver> {
        let mut catalog = ShaderCatalog::new();
        for path in SHADERS {
            catalog.register(*path);
        }
        let ctx = SharedContext::new(catalog);
        let backend = HeadlessBackend::new(&ctx);
        let reporter: Arc<dyn Reporter> = Arc::new(LogReporter);

        let config = PipelineConfig {
            path: VisualPath::Deferred,
            tier: QualityTier::Medium,
            flags: FeatureFlags {
                debug_overlay: true,
                editor_gizmos: false,
                error_materials: true,
            },
        };
        let mut renderer = ViewRenderer::new(ctx, config, reporter.clone())?;
        renderer.set_output_resolution(OUTPUT_WIDTH, OUTPUT_HEIGHT)?;
        info!(
            "assembled {:?} pipeline: {}",
            config.path,
            renderer.pass_names().join(" -> ")
        );

        Ok(Driver {
            world: demo_world(),
            reporter,
            backend,
            renderer,
            stats: RendererStatistics::new(),
            frame_index: 0,
            aborted_frames: 0,
        })
    }

    pub fn reporter(&self) -> &dyn Reporter {
        &*self.reporter
    }

    /// Record and execute one frame. An aborted frame is degraded output,
    /// not a crash: the renderer has already discarded the graph and
    /// reported the failure, so the driver counts it and moves on.
    pub fn process_frame(&mut self) -> Result<()> {
        self.stats.new_frame().safe_unwrap();
        let frame = self.frame_context();
        match self
            .renderer
            .record(&mut self.backend, &frame, &self.world, &mut self.stats)
        {
            Ok(()) => {}
            Err(err @ FrameError::Disposed) => return Err(err.into()),
            Err(FrameError::Aborted {
                pass, ..
            }) => {
                warn!("frame {} dropped (pass '{pass}')", self.frame_index);
                self.aborted_frames += 1;
            }
        }
        self.frame_index += 1;
        Ok(())
    }

    pub fn report(&self) {
        info!(
            "{} frames submitted, {} aborted, {} draws, {} dispatches",
            self.backend.frames_submitted(),
            self.aborted_frames,
            self.backend.total_draws(),
            self.backend.total_dispatches(),
        );
        for name in self.stats.section_names() {
            if let Some(average) = self.stats.average_ms(name) {
                info!("  {name}: {average:.3} ms");
            }
        }
    }

    pub fn shutdown(&mut self) {
        self.renderer.dispose();
    }

    /// Build the per-frame context: the camera orbits the scene center and
    /// the culling counts stand in for a visibility pass.
    fn frame_context(&self) -> FrameContext {
        let angle = self.frame_index as f32 * 0.01;
        let eye = Vec3::new(angle.cos() * 30.0, 12.0, angle.sin() * 30.0);
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
        let projection = Mat4::perspective_rh(
            60f32.to_radians(),
            self.renderer.aspect_ratio(),
            0.1,
            1000.0,
        );
        let culling = CullingResults {
            visible_opaque: 48 + self.frame_index % 17,
            visible_transparent: 6 + self.frame_index % 5,
            culled: 13,
        };
        FrameContext::new(0, OUTPUT_WIDTH, OUTPUT_HEIGHT, view, projection, eye, culling)
    }
}

fn demo_world() -> World {
    let mut world = World::new();
    world.lights.push(Light {
        position: Vec3::new(0.0, 40.0, 0.0),
        color: Vec3::new(1.0, 0.95, 0.8),
        intensity: 12.0,
        kind: LightKind::Directional,
    });
    world.lights.push(Light {
        position: Vec3::new(-8.0, 4.0, 3.0),
        color: Vec3::new(0.3, 0.5, 1.0),
        intensity: 5.0,
        kind: LightKind::Point,
    });
    for (index, size) in [128u32, 64, 64, 32, 32, 32].into_iter().enumerate() {
        world.probes.push(ReflectionProbe {
            position: Vec3::new(index as f32 * 10.0 - 25.0, 3.0, 0.0),
            baked_size: size,
        });
    }
    // One broken asset so the error-material sweep has something to show.
    world.failed_materials = 1;
    world
}
