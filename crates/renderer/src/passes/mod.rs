pub mod debug_overlay;
pub mod deferred_lighting;
pub mod depth_prepass;
pub mod editor_gizmos;
pub mod error_materials;
pub mod gbuffer;
pub mod opaque;
pub mod probe_atlas;
pub mod sky;
pub mod transparent;
