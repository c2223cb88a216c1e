use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};
use gfx::{BoundImage, ImageFormat, PhysicalResourceBindings};

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Self {
        TargetSize {
            width,
            height,
        }
    }
}

/// Which resolution a target follows when the window or render scale
/// changes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SizeGroup {
    /// Scene passes render at this resolution.
    RenderResolution,
    /// The final image and everything after upscaling uses this resolution.
    OutputResolution,
    /// A fixed size independent of either, e.g. a baked atlas.
    Custom(TargetSize),
}

#[derive(Debug)]
struct RenderTargetEntry {
    size_group: SizeGroup,
    format: ImageFormat,
    image: BoundImage,
}

/// Registry of the persistent render targets the frame graph draws into.
///
/// Targets are registered once at renderer construction and rebound into the
/// frame's [`PhysicalResourceBindings`] every frame. Changing a resolution
/// recreates only the targets in the affected size group.
#[derive(Debug, Default)]
pub struct RenderTargets {
    targets: HashMap<String, RenderTargetEntry>,
    output_resolution: TargetSize,
    render_resolution: TargetSize,
    // Set once the render resolution has been chosen explicitly; until then
    // it follows the output resolution.
    render_override: bool,
}

impl RenderTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_color_target(
        &mut self,
        name: impl Into<String>,
        size: SizeGroup,
        format: ImageFormat,
    ) -> Result<()> {
        if format == ImageFormat::Depth32Float {
            bail!("cannot register a color target with a depth format");
        }
        self.register_target(name, size, format)
    }

    pub fn register_depth_target(
        &mut self,
        name: impl Into<String>,
        size: SizeGroup,
        format: ImageFormat,
    ) -> Result<()> {
        if format != ImageFormat::Depth32Float {
            bail!("depth target requires a depth format");
        }
        self.register_target(name, size, format)
    }

    fn register_target(
        &mut self,
        name: impl Into<String>,
        size: SizeGroup,
        format: ImageFormat,
    ) -> Result<()> {
        let resolution = self.size_group_resolution(size);
        self.targets.insert(
            name.into(),
            RenderTargetEntry {
                size_group: size,
                format,
                image: BoundImage {
                    width: resolution.width,
                    height: resolution.height,
                    format,
                },
            },
        );
        Ok(())
    }

    /// Resize every output-resolution target. The render resolution follows
    /// unless it was set explicitly, in which case it is only clamped back
    /// inside the new output bounds.
    pub fn set_output_resolution(&mut self, width: u32, height: u32) -> Result<()> {
        if self.output_resolution == TargetSize::new(width, height) {
            return Ok(());
        }
        self.output_resolution = TargetSize::new(width, height);
        self.recreate_group(SizeGroup::OutputResolution);

        let render = self.render_resolution;
        if !self.render_override || render.width > width || render.height > height {
            self.render_resolution = TargetSize::new(width, height);
            self.recreate_group(SizeGroup::RenderResolution);
        }
        Ok(())
    }

    pub fn set_render_resolution(&mut self, width: u32, height: u32) -> Result<()> {
        if width > self.output_resolution.width || height > self.output_resolution.height {
            bail!("cannot set render resolution above output resolution");
        }
        self.render_override = true;
        if self.render_resolution == TargetSize::new(width, height) {
            return Ok(());
        }
        self.render_resolution = TargetSize::new(width, height);
        self.recreate_group(SizeGroup::RenderResolution);
        Ok(())
    }

    pub fn target_size(&self, name: &str) -> Result<TargetSize> {
        let target = self
            .targets
            .get(name)
            .ok_or_else(|| anyhow!("target '{name}' not found"))?;
        Ok(self.size_group_resolution(target.size_group))
    }

    pub fn size_group_resolution(&self, size_group: SizeGroup) -> TargetSize {
        match size_group {
            SizeGroup::RenderResolution => self.render_resolution,
            SizeGroup::OutputResolution => self.output_resolution,
            SizeGroup::Custom(size) => size,
        }
    }

    /// Publish every registered target into the frame's bindings.
    pub fn bind_targets(&self, bindings: &mut PhysicalResourceBindings) {
        for (name, target) in &self.targets {
            bindings.bind_image(name.clone(), target.image);
        }
    }

    fn recreate_group(&mut self, group: SizeGroup) {
        let resolution = self.size_group_resolution(group);
        for entry in self.targets.values_mut() {
            if entry.size_group == group {
                entry.image = BoundImage {
                    width: resolution.width,
                    height: resolution.height,
                    format: entry.format,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use gfx::{ImageFormat, PhysicalResourceBindings, VirtualResource};

    use super::{RenderTargets, SizeGroup, TargetSize};

    #[test]
    fn registered_targets_bind_at_group_resolution() {
        let mut targets = RenderTargets::new();
        targets.set_output_resolution(128, 64).unwrap();
        targets
            .register_color_target("scene", SizeGroup::RenderResolution, ImageFormat::Rgba16Float)
            .unwrap();
        targets
            .register_color_target(
                "atlas",
                SizeGroup::Custom(TargetSize::new(512, 512)),
                ImageFormat::Rgba16Float,
            )
            .unwrap();

        let mut bindings = PhysicalResourceBindings::new();
        targets.bind_targets(&mut bindings);
        let scene = bindings.resolve(&VirtualResource::image("scene")).unwrap();
        assert_eq!((scene.width, scene.height), (128, 64));
        let atlas = bindings.resolve(&VirtualResource::image("atlas")).unwrap();
        assert_eq!((atlas.width, atlas.height), (512, 512));
    }

    #[test]
    fn resolution_change_recreates_only_the_affected_group() {
        let mut targets = RenderTargets::new();
        targets.set_output_resolution(64, 64).unwrap();
        targets
            .register_color_target("final", SizeGroup::OutputResolution, ImageFormat::Rgba8Srgb)
            .unwrap();
        targets
            .register_color_target(
                "atlas",
                SizeGroup::Custom(TargetSize::new(256, 256)),
                ImageFormat::Rgba16Float,
            )
            .unwrap();

        targets.set_output_resolution(640, 480).unwrap();
        assert_eq!(targets.target_size("final").unwrap(), TargetSize::new(640, 480));
        assert_eq!(targets.target_size("atlas").unwrap(), TargetSize::new(256, 256));
    }

    #[test]
    fn render_resolution_follows_output_until_set_lower() {
        let mut targets = RenderTargets::new();
        targets.set_output_resolution(640, 480).unwrap();
        assert_eq!(
            targets.size_group_resolution(SizeGroup::RenderResolution),
            TargetSize::new(640, 480)
        );

        targets.set_render_resolution(320, 240).unwrap();
        targets.set_output_resolution(1280, 720).unwrap();
        assert_eq!(
            targets.size_group_resolution(SizeGroup::RenderResolution),
            TargetSize::new(320, 240)
        );
    }

    #[test]
    fn render_resolution_above_output_is_rejected() {
        let mut targets = RenderTargets::new();
        targets.set_output_resolution(64, 64).unwrap();
        assert!(targets.set_render_resolution(128, 128).is_err());
    }

    #[test]
    fn format_mismatches_are_rejected() {
        let mut targets = RenderTargets::new();
        assert!(targets
            .register_color_target("bad", SizeGroup::OutputResolution, ImageFormat::Depth32Float)
            .is_err());
        assert!(targets
            .register_depth_target("bad", SizeGroup::OutputResolution, ImageFormat::Rgba8Srgb)
            .is_err());
    }
}
