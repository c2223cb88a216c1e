pub use config::*;
pub use frame::*;
pub use view_renderer::*;

pub mod config;
pub mod frame;
pub mod passes;
pub mod postprocess;
pub mod util;
pub mod view_renderer;
