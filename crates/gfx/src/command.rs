use anyhow::Result;

use crate::resource::VirtualResource;

/// Command recording interface handed to pass callbacks during execution.
///
/// This is the subset of a GPU command buffer the frame core relies on;
/// concrete backends translate these calls into real API commands, the
/// headless backend counts and validates them.
pub trait CommandList {
    fn bind_graphics_pipeline(&mut self, name: &str) -> Result<()>;

    fn bind_compute_pipeline(&mut self, name: &str) -> Result<()>;

    /// Viewport and scissor covering the full current render area.
    fn full_viewport_scissor(&mut self);

    fn bind_uniform_data(&mut self, set: u32, binding: u32, data: &[u8]) -> Result<()>;

    fn bind_sampled_image(&mut self, set: u32, binding: u32, image: &VirtualResource)
        -> Result<()>;

    fn bind_storage_image(&mut self, set: u32, binding: u32, image: &VirtualResource)
        -> Result<()>;

    fn push_constants(&mut self, data: &[u8]) -> Result<()>;

    fn draw(&mut self, vertex_count: u32, instance_count: u32) -> Result<()>;

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32) -> Result<()>;

    fn dispatch(&mut self, groups_x: u32, groups_y: u32, groups_z: u32) -> Result<()>;
}
