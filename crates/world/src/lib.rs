pub use render_options::*;
pub use world::*;

pub mod render_options;
pub mod world;
