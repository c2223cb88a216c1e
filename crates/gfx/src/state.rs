use glam::{Mat4, Vec3};

/// Visibility results for one view, produced by the caller's culling step
/// before recording starts.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CullingResults {
    pub visible_opaque: u32,
    pub visible_transparent: u32,
    pub culled: u32,
}

/// Per-frame state for one rendered view.
///
/// Built by the caller each frame, handed to the renderer for the duration
/// of one record→execute cycle, then dropped. Never reuse a context across
/// frames; the derived matrices and culling results go stale with the view.
#[derive(Debug, Clone)]
pub struct FrameContext {
    pub view_index: u32,
    pub width: u32,
    pub height: u32,
    pub view: Mat4,
    pub projection: Mat4,
    pub projection_view: Mat4,
    pub inverse_projection_view: Mat4,
    pub cam_position: Vec3,
    pub culling: CullingResults,
}

impl FrameContext {
    pub fn new(
        view_index: u32,
        width: u32,
        height: u32,
        view: Mat4,
        projection: Mat4,
        cam_position: Vec3,
        culling: CullingResults,
    ) -> Self {
        let projection_view = projection * view;
        Self {
            view_index,
            width,
            height,
            view,
            projection,
            projection_view,
            inverse_projection_view: projection_view.inverse(),
            cam_position,
            culling,
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}
